//! User management CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use homecloud_core::config::AppConfig;
use homecloud_core::error::AppError;
use homecloud_core::types::pagination::PageRequest;
use homecloud_database::Database;
use homecloud_entity::user::{User, UserRole};
use homecloud_service::account::{AccountService, RegisterInput};
use homecloud_service::LogMailer;

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account with a validated email address
    Create {
        /// Username
        username: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
    /// List users
    List {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Users per page
        #[arg(long, default_value_t = 50)]
        per_page: u64,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    validated: bool,
    role: String,
    created_at: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            email: u.email.clone(),
            validated: u.email_validated,
            role: u.role.to_string(),
            created_at: u.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn prompt_password() -> Result<String, AppError> {
    dialoguer::Password::new()
        .with_prompt("Password")
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let db = Database::open(&config.database).await?;
    let accounts = AccountService::new(db, Arc::new(LogMailer), config);

    match &args.command {
        UserCommand::Create {
            username,
            email,
            password,
            admin,
        } => {
            let password = match password {
                Some(p) => p.clone(),
                None => prompt_password()?,
            };
            let role = if *admin { UserRole::Admin } else { UserRole::User };
            let user = accounts
                .create_account(
                    RegisterInput {
                        username: username.clone(),
                        email: email.clone(),
                        password,
                        language: None,
                    },
                    role,
                    true,
                )
                .await?;
            output::print_success(&format!("User '{}' created", user.username));
            output::print_kv("ID", &user.id.to_string());
            output::print_kv("Role", user.role.as_str());
        }
        UserCommand::List { page, per_page } => {
            let page = accounts
                .list_users(&PageRequest::new(*page, *per_page))
                .await?;
            let rows: Vec<UserRow> = page.items.iter().map(UserRow::from).collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table {
                println!(
                    "Page {}/{} ({} users)",
                    page.page, page.total_pages, page.total_items
                );
            }
        }
    }

    Ok(())
}
