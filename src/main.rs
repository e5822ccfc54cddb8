//! authrelay - authenticated API client CLI
//!
//! Main entry point for the authrelay binary.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use authrelay::cli::{Cli, Commands};
use authrelay::commands;
use authrelay::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Login { username, password } => {
            tracing::info!("Starting login");
            commands::login(config, username, password).await?;
            Ok(())
        }
        Commands::Status => {
            commands::status(config)?;
            Ok(())
        }
        Commands::Call { method, path, data } => {
            tracing::info!(%method, %path, "Performing authenticated call");
            commands::call(config, method, path, data).await?;
            Ok(())
        }
        Commands::Refresh => {
            tracing::info!("Forcing credential refresh");
            commands::refresh(config).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::logout(config)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("authrelay=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
