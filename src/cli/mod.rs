pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ferrotype")]
#[command(about = "Incremental feed-to-disk picture mirror", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one sync pass and exit
    Sync,
    /// List mirrored pictures
    List,
    /// Background daemon for scheduled syncs
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the background daemon
    Start {
        /// Sync interval (e.g. "8h", "30m", "1d"); overrides the config file
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the initial sync on start
        #[arg(long)]
        no_initial_sync: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}
