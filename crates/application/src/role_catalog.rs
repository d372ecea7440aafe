//! Fixed role, grant, and approval-chain table loaded at seed time.

use std::collections::HashSet;

use tally_core::{AppError, AppResult};
use tally_domain::{ApprovalChainEdge, CrudAction, ResourceName, RoleName};

use CrudAction::{Create, Delete, Read, Update};

type GrantRow = (&'static str, &'static [CrudAction]);

const DEFAULT_ROLES: &[(&str, &[GrantRow])] = &[
    (
        "owner",
        &[
            ("user_storage", &[Create, Read, Update, Delete]),
            ("points_ledger", &[Read, Update]),
            ("logs", &[Read]),
        ],
    ),
    (
        "manager",
        &[
            ("user_storage", &[Create, Read, Update]),
            ("points_ledger", &[Read, Update]),
            ("logs", &[Read]),
        ],
    ),
    (
        "engineer",
        &[
            ("user_storage", &[Read]),
            ("points_ledger", &[Read]),
            ("logs", &[Read]),
        ],
    ),
    (
        "product_manager",
        &[("user_storage", &[Read]), ("points_ledger", &[Read])],
    ),
];

const DEFAULT_APPROVAL_CHAIN: &[(&str, &str)] = &[
    ("product_manager", "owner"),
    ("engineer", "manager"),
    ("engineer", "owner"),
];

/// Grant of a set of actions on one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSeed {
    /// Protected resource.
    pub resource: ResourceName,
    /// Granted actions.
    pub actions: Vec<CrudAction>,
}

/// Role to create together with its grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSeed {
    /// Unique role name.
    pub name: RoleName,
    /// Grants, at most one per resource.
    pub permissions: Vec<PermissionSeed>,
}

/// Validated set of roles and approval-chain edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: Vec<RoleSeed>,
    edges: Vec<ApprovalChainEdge>,
}

impl RoleCatalog {
    /// Creates a catalog after checking its internal consistency.
    pub fn new(roles: Vec<RoleSeed>, edges: Vec<ApprovalChainEdge>) -> AppResult<Self> {
        let mut role_names = HashSet::new();
        for role in &roles {
            if !role_names.insert(role.name.clone()) {
                return Err(AppError::Validation(format!(
                    "role '{}' is declared more than once",
                    role.name
                )));
            }

            let mut resources = HashSet::new();
            for permission in &role.permissions {
                if !resources.insert(permission.resource.clone()) {
                    return Err(AppError::Validation(format!(
                        "role '{}' declares resource '{}' more than once",
                        role.name, permission.resource
                    )));
                }
            }
        }

        let mut seen_edges = HashSet::new();
        for edge in &edges {
            for side in [edge.maker_role(), edge.checker_role()] {
                if !role_names.contains(side) {
                    return Err(AppError::Validation(format!(
                        "approval chain references unknown role '{side}'"
                    )));
                }
            }

            if !seen_edges.insert(edge.clone()) {
                return Err(AppError::Validation(format!(
                    "approval chain edge '{}' -> '{}' is declared more than once",
                    edge.maker_role(),
                    edge.checker_role()
                )));
            }
        }

        Ok(Self { roles, edges })
    }

    /// Returns the declared roles.
    #[must_use]
    pub fn roles(&self) -> &[RoleSeed] {
        &self.roles
    }

    /// Returns the declared approval-chain edges.
    #[must_use]
    pub fn edges(&self) -> &[ApprovalChainEdge] {
        &self.edges
    }

    /// Returns whether the catalog declares the role.
    #[must_use]
    pub fn contains_role(&self, name: &RoleName) -> bool {
        self.roles.iter().any(|role| &role.name == name)
    }
}

/// Returns the platform's standard four-role catalog.
pub fn default_role_catalog() -> AppResult<RoleCatalog> {
    let roles = DEFAULT_ROLES
        .iter()
        .map(|(name, grants)| {
            let permissions = grants
                .iter()
                .map(|(resource, actions)| {
                    Ok(PermissionSeed {
                        resource: ResourceName::new(*resource)?,
                        actions: actions.to_vec(),
                    })
                })
                .collect::<AppResult<Vec<_>>>()?;

            Ok(RoleSeed {
                name: RoleName::new(*name)?,
                permissions,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let edges = DEFAULT_APPROVAL_CHAIN
        .iter()
        .map(|(maker, checker)| ApprovalChainEdge::new(RoleName::new(*maker)?, RoleName::new(*checker)?))
        .collect::<AppResult<Vec<_>>>()?;

    RoleCatalog::new(roles, edges)
}
