//! Roles, per-resource grants, and approval-chain edges.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_core::{AppError, AppResult};
use uuid::Uuid;

/// Unique identifier for a role record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

fn normalize_identifier(kind: &str, value: String) -> AppResult<String> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(AppError::Validation(format!("{kind} must not be empty")));
    }

    if !normalized
        .chars()
        .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_')
    {
        return Err(AppError::Validation(format!(
            "{kind} '{normalized}' may only contain lowercase letters, digits, and underscores"
        )));
    }

    Ok(normalized)
}

/// Unique role name, for example `product_manager`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleName(String);

impl RoleName {
    /// Creates a normalized role name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        normalize_identifier("role name", value.into()).map(Self)
    }

    /// Returns the role name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Name of a protected resource, for example `points_ledger`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceName(String);

impl ResourceName {
    /// Creates a normalized resource name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        normalize_identifier("resource name", value.into()).map(Self)
    }

    /// Returns the resource name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ResourceName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Named authorization group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: RoleName,
}

impl Role {
    /// Creates a role with a fresh identifier.
    #[must_use]
    pub fn new(name: RoleName) -> Self {
        Self {
            id: RoleId::new(),
            name,
        }
    }
}

/// Operation kinds a role may be granted on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudAction {
    /// Creating new records.
    Create,
    /// Reading records.
    Read,
    /// Updating existing records.
    Update,
    /// Deleting records.
    Delete,
}

impl CrudAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[CrudAction] = &[
            CrudAction::Create,
            CrudAction::Read,
            CrudAction::Update,
            CrudAction::Delete,
        ];

        ALL
    }

    /// Returns whether the action changes state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl FromStr for CrudAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!("unknown action '{value}'"))),
        }
    }
}

/// CRUD grant of one role on one resource.
///
/// At most one row exists per `(role, resource)` pair. A missing row means no
/// access at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Role owning this grant.
    pub role_id: RoleId,
    /// Protected resource.
    pub resource: ResourceName,
    /// Create access.
    pub can_create: bool,
    /// Read access.
    pub can_read: bool,
    /// Update access.
    pub can_update: bool,
    /// Delete access.
    pub can_delete: bool,
}

impl RolePermission {
    /// Creates a grant holding exactly the listed actions.
    #[must_use]
    pub fn granting(role_id: RoleId, resource: ResourceName, actions: &[CrudAction]) -> Self {
        Self {
            role_id,
            resource,
            can_create: actions.contains(&CrudAction::Create),
            can_read: actions.contains(&CrudAction::Read),
            can_update: actions.contains(&CrudAction::Update),
            can_delete: actions.contains(&CrudAction::Delete),
        }
    }

    /// Returns whether the grant allows the action.
    #[must_use]
    pub fn allows(&self, action: CrudAction) -> bool {
        match action {
            CrudAction::Create => self.can_create,
            CrudAction::Read => self.can_read,
            CrudAction::Update => self.can_update,
            CrudAction::Delete => self.can_delete,
        }
    }
}

/// Directed edge: holders of `checker_role` may approve what holders of
/// `maker_role` propose.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalChainEdge {
    maker_role: RoleName,
    checker_role: RoleName,
}

impl ApprovalChainEdge {
    /// Creates an edge, rejecting self-loops.
    pub fn new(maker_role: RoleName, checker_role: RoleName) -> AppResult<Self> {
        if maker_role == checker_role {
            return Err(AppError::Validation(format!(
                "role '{maker_role}' cannot be its own checker"
            )));
        }

        Ok(Self {
            maker_role,
            checker_role,
        })
    }

    /// Returns the maker side of the edge.
    #[must_use]
    pub fn maker_role(&self) -> &RoleName {
        &self.maker_role
    }

    /// Returns the checker side of the edge.
    #[must_use]
    pub fn checker_role(&self) -> &RoleName {
        &self.checker_role
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::{ApprovalChainEdge, CrudAction, ResourceName, RoleId, RoleName, RolePermission};

    #[test]
    fn role_name_is_normalized() {
        let name = RoleName::new("  Product_Manager ");
        assert!(name.is_ok());
        assert_eq!(
            name.map(|value| value.to_string()).unwrap_or_default(),
            "product_manager"
        );
    }

    #[test]
    fn role_name_rejects_punctuation() {
        assert!(RoleName::new("owner;drop").is_err());
        assert!(RoleName::new("").is_err());
        assert!(ResourceName::new("points ledger").is_err());
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(CrudAction::from_str("approve").is_err());
        assert_eq!(
            CrudAction::from_str(" Update ").ok(),
            Some(CrudAction::Update)
        );
    }

    #[test]
    fn grant_allows_only_listed_actions() {
        let resource = ResourceName::new("user_storage").unwrap_or_else(|_| unreachable!());
        let permission = RolePermission::granting(RoleId::new(), resource, &[CrudAction::Read]);

        assert!(permission.allows(CrudAction::Read));
        assert!(!permission.allows(CrudAction::Create));
        assert!(!permission.allows(CrudAction::Update));
        assert!(!permission.allows(CrudAction::Delete));
    }

    #[test]
    fn read_is_the_only_non_mutating_action() {
        let mutating: Vec<CrudAction> = CrudAction::all()
            .iter()
            .copied()
            .filter(CrudAction::is_mutating)
            .collect();
        assert_eq!(
            mutating,
            vec![CrudAction::Create, CrudAction::Update, CrudAction::Delete]
        );
    }

    proptest! {
        #[test]
        fn approval_edge_never_loops_back(name in "[a-z][a-z0-9_]{0,15}") {
            let maker = RoleName::new(name.clone()).unwrap_or_else(|_| unreachable!());
            let checker = RoleName::new(name.to_uppercase()).unwrap_or_else(|_| unreachable!());
            prop_assert!(ApprovalChainEdge::new(maker, checker).is_err());
        }

        #[test]
        fn approval_edge_accepts_distinct_roles(
            maker in "[a-z]{1,8}",
            checker in "[a-z]{1,8}",
        ) {
            prop_assume!(maker != checker);
            let edge = ApprovalChainEdge::new(
                RoleName::new(maker.clone()).unwrap_or_else(|_| unreachable!()),
                RoleName::new(checker.clone()).unwrap_or_else(|_| unreachable!()),
            );
            prop_assert!(edge.is_ok());
            let edge = edge.unwrap_or_else(|_| unreachable!());
            prop_assert_eq!(edge.maker_role().as_str(), maker.as_str());
            prop_assert_eq!(edge.checker_role().as_str(), checker.as_str());
        }
    }
}
