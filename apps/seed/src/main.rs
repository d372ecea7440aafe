//! Tally bulk loader and operator console.

#![forbid(unsafe_code)]

mod csv_records;
mod seed_config;

use std::sync::Arc;
use std::time::Duration;

use tally_application::{
    AccessService, CheckerResolution, CheckerService, EmailNotificationDispatcher, EmailService,
    MakerCheckerService, RoleCatalog, SeedService, default_role_catalog,
};
use tally_core::{AppError, AppResult, RequestContext};
use tally_infrastructure::{
    ConsoleEmailService, Database, PostgresRoleRepository, PostgresSeedRepository,
    PostgresTransactionRepository, PostgresUserRepository, SmtpEmailService,
};
use tracing::{error, info, warn};

use crate::seed_config::{EmailProviderConfig, SeedCommand, SeedConfig, init_tracing};

const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SeedConfig::load()?;
    let database = Database::connect(&config.database).await?;

    let result = run(&config, &database).await;
    database.close().await;

    if let Err(error) = &result {
        error!(code = error.code(), error = %error, "tally-seed failed");
    }

    result
}

async fn run(config: &SeedConfig, database: &Database) -> AppResult<()> {
    database.run_migrations().await?;
    let context = RequestContext::for_caller("tally-seed");

    match &config.command {
        SeedCommand::Migrate => Ok(()),
        SeedCommand::Seed => seed(config, database, &context).await,
        SeedCommand::Propose(input) => {
            let service = maker_checker_service(config, database)?;
            let transaction = service.create_transaction(&context, input.clone()).await?;
            info!(
                transaction_id = %transaction.id(),
                status = transaction.status().as_str(),
                "transaction proposed"
            );

            if tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, service.drain_notifications())
                .await
                .is_err()
            {
                warn!(
                    transaction_id = %transaction.id(),
                    timeout_secs = NOTIFICATION_DRAIN_TIMEOUT.as_secs(),
                    "checker notification still running at exit, abandoning it"
                );
            }
            Ok(())
        }
        SeedCommand::Decide(input) => {
            let transaction = maker_checker_service(config, database)?
                .decide(&context, input.clone())
                .await?;
            info!(
                transaction_id = %transaction.id(),
                status = transaction.status().as_str(),
                approved = transaction.is_approved(),
                "transaction decided"
            );
            Ok(())
        }
    }
}

async fn seed(config: &SeedConfig, database: &Database, context: &RequestContext) -> AppResult<()> {
    let users_path = config.data_dir.join("users.csv");
    let points_path = config.data_dir.join("points.csv");
    let users = csv_records::read_users(csv_records::open(&users_path)?, "users.csv")?;
    let accounts = csv_records::read_points(csv_records::open(&points_path)?, "points.csv")?;
    info!(
        users = users.len(),
        points_accounts = accounts.len(),
        data_dir = %config.data_dir.display(),
        "loaded seed files"
    );

    let catalog = default_role_catalog()?;
    let seed_service = SeedService::new(
        Arc::new(PostgresSeedRepository::new(database.pool())),
        config.batch_size,
    )?;
    seed_service.seed(context, &catalog, &users, &accounts).await?;

    log_approval_routing(context, database, &catalog).await
}

async fn log_approval_routing(
    context: &RequestContext,
    database: &Database,
    catalog: &RoleCatalog,
) -> AppResult<()> {
    let checker_service = checker_service(database);

    for role in catalog.roles() {
        match checker_service.resolve_checkers(context, &role.name).await? {
            CheckerResolution::NoEligibleCheckers => {
                info!(maker_role = %role.name, "no approval chain configured for role");
            }
            CheckerResolution::Eligible(contacts) if contacts.is_empty() => {
                warn!(maker_role = %role.name, "approval chain has no members");
            }
            CheckerResolution::Eligible(contacts) => {
                info!(maker_role = %role.name, checkers = contacts.len(), "approval routing");
            }
        }
    }

    Ok(())
}

fn checker_service(database: &Database) -> CheckerService {
    let access_service = AccessService::new(Arc::new(PostgresRoleRepository::new(database.pool())));
    CheckerService::new(
        access_service,
        Arc::new(PostgresUserRepository::new(database.pool())),
    )
}

fn maker_checker_service(config: &SeedConfig, database: &Database) -> AppResult<MakerCheckerService> {
    let access_service = AccessService::new(Arc::new(PostgresRoleRepository::new(database.pool())));
    let user_repository = Arc::new(PostgresUserRepository::new(database.pool()));
    let checker_service = CheckerService::new(access_service.clone(), user_repository.clone());
    let dispatcher = EmailNotificationDispatcher::new(email_service(&config.email_provider)?);

    Ok(MakerCheckerService::new(
        access_service,
        checker_service,
        user_repository,
        Arc::new(PostgresTransactionRepository::new(database.pool())),
        Arc::new(dispatcher),
    ))
}

fn email_service(provider: &EmailProviderConfig) -> AppResult<Arc<dyn EmailService>> {
    match provider {
        EmailProviderConfig::Console => Ok(Arc::new(ConsoleEmailService::new())),
        EmailProviderConfig::Smtp(smtp) => Ok(Arc::new(SmtpEmailService::new(smtp.clone())?)),
    }
}
