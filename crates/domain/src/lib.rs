//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod points;
mod role;
mod transaction;
mod user;

pub use points::{PointsAccount, PointsAccountId};
pub use role::{ApprovalChainEdge, CrudAction, ResourceName, Role, RoleId, RoleName, RolePermission};
pub use transaction::{Decision, Transaction, TransactionId, TransactionRecord, TransactionStatus};
pub use user::{EmailAddress, User, UserContact, UserId};
