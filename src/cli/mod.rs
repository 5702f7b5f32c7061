// CLI module for administrative operations that run without the HTTP server

pub mod maintenance;

use clap::{Parser, Subcommand};

use crate::config::{AuthSettings, SecretManager};

/// DocSync authentication service
#[derive(Parser, Debug)]
#[command(name = "docsync-auth")]
#[command(about = "DocSync authentication and session service", long_about = None)]
pub struct Cli {
    /// Defaults to `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the HTTP server
    Serve,

    /// Provision or upgrade the relational schema
    Migrate,

    /// Delete audit events older than the retention window
    PruneAudit {
        /// Retention window in days; defaults to AUDIT_RETENTION_DAYS
        #[arg(long)]
        days: Option<u32>,
    },

    /// Physically delete expired refresh tokens
    PurgeTokens,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

/// Execute a maintenance command
///
/// `serve` is handled by the binary and is a no-op here.
pub async fn execute_command(
    command: Commands,
    settings: &AuthSettings,
    secrets: &SecretManager,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve => {}
        Commands::Migrate => {
            maintenance::run_migrations(settings).await?;
        }
        Commands::PruneAudit { days } => {
            let days = days.unwrap_or(settings.audit_retention_days);
            let removed = maintenance::prune_audit(settings, secrets, days).await?;
            println!("Removed {} audit events older than {} days", removed, days);
        }
        Commands::PurgeTokens => {
            let removed = maintenance::purge_tokens(settings, secrets).await?;
            println!("Removed {} expired refresh tokens", removed);
        }
    }

    Ok(())
}
