use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use facility_client::auth::models::ProfileUpdate;
use facility_client::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "facility_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Login { email, password } => cli::commands::login(config, email, password).await,
        Commands::Logout => cli::commands::logout(config).await,
        Commands::Whoami { refresh, format } => cli::commands::whoami(config, refresh, format).await,
        Commands::Can { code } => cli::commands::can(config, &code).await,
        Commands::Profile {
            first_name,
            last_name,
            username,
            organization,
        } => {
            let update = ProfileUpdate {
                first_name,
                last_name,
                username,
                organization,
            };
            cli::commands::profile(config, update).await
        }
        Commands::Password { action } => cli::commands::password(config, action).await,
        Commands::Locations { action } => cli::commands::locations(config, action).await,
        Commands::Tanks { action } => cli::commands::tanks(config, action).await,
        Commands::Permits { action } => cli::commands::permits(config, action).await,
        Commands::Users { action } => cli::commands::users(config, action).await,
        Commands::Permissions { action } => cli::commands::permissions(config, action).await,
    }
}
