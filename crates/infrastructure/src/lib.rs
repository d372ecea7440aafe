//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_email_service;
mod database;
mod in_memory_store;
mod postgres_role_repository;
mod postgres_seed_repository;
mod postgres_transaction_repository;
mod postgres_user_repository;
mod smtp_email_service;

pub use console_email_service::ConsoleEmailService;
pub use database::{Database, DatabaseConfig};
pub use in_memory_store::InMemoryStore;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_seed_repository::PostgresSeedRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
pub use postgres_user_repository::PostgresUserRepository;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
