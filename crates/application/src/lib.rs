//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod access_service;
mod checker_service;
mod maker_checker_service;
mod notification;
mod role_catalog;
mod seed_service;
mod transaction_ports;
mod user_service;

#[cfg(test)]
mod test_support;

pub use access_ports::{RoleDefinition, RoleRepository, UserRepository};
pub use access_service::AccessService;
pub use checker_service::{CheckerResolution, CheckerService};
pub use maker_checker_service::{CreateTransactionInput, DecideTransactionInput, MakerCheckerService};
pub use notification::{
    ApprovalNotice, EmailNotificationDispatcher, EmailService, NotificationDispatcher,
};
pub use role_catalog::{PermissionSeed, RoleCatalog, RoleSeed, default_role_catalog};
pub use seed_service::{SeedReport, SeedRepository, SeedService};
pub use transaction_ports::{CompareAndSetOutcome, DecisionUpdate, TransactionRepository};
pub use user_service::UserService;
