//! Database migration commands.

use clap::{Args, Subcommand};

use homecloud_core::config::AppConfig;
use homecloud_core::error::AppError;
use homecloud_database::DatabasePool;
use homecloud_database::connection::mask_password;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    if config.database.provider != "postgres" {
        return Err(AppError::configuration(format!(
            "Migrations apply to PostgreSQL only (database.provider is '{}')",
            config.database.provider
        )));
    }

    match &args.command {
        MigrateCommand::Run => {
            println!(
                "Running database migrations on {}...",
                mask_password(&config.database.url)
            );
            let pool = DatabasePool::connect_and_migrate(&config.database).await?;
            pool.close().await;
            output::print_success("All migrations applied successfully.");
        }
    }

    Ok(())
}
