use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ferrotype::app::AppContext;
use ferrotype::cli::{commands, Cli, Commands, DaemonAction};
use ferrotype::config::Config;
use ferrotype::daemon::{self, Daemon, DaemonConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync => {
            let ctx = AppContext::new(&Config::load()?)?;
            commands::sync(&ctx).await?;
        }
        Commands::List => {
            let ctx = AppContext::new(&Config::load()?)?;
            commands::list(&ctx)?;
        }
        Commands::Daemon { action } => match action {
            DaemonAction::Start {
                interval,
                no_initial_sync,
            } => {
                let config = Config::load()?;
                let interval = interval.as_deref().unwrap_or(&config.interval);
                let interval_secs = DaemonConfig::parse_interval(interval)
                    .map_err(anyhow::Error::msg)
                    .context("Invalid sync interval")?;

                let ctx = Arc::new(AppContext::new(&config)?);
                let daemon = Daemon::new(
                    ctx,
                    DaemonConfig {
                        interval_secs,
                        sync_on_start: !no_initial_sync,
                    },
                );
                daemon.run().await?;
            }
            DaemonAction::Stop => {
                daemon::stop_daemon().map_err(anyhow::Error::msg)?;
                println!("Daemon stopped");
            }
            DaemonAction::Status => {
                println!("{}", daemon::daemon_status());
            }
        },
    }

    Ok(())
}
