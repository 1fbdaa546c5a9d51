//! Background daemon for scheduled picture synchronization.
//!
//! Runs the sync job once on start and then on a fixed interval, without
//! requiring system scheduler configuration.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::interval;

use crate::app::{AppContext, FerrotypeError};
use crate::sync::RunOutcome;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Sync interval in seconds (default: 28800 = 8 hours).
    pub interval_secs: u64,
    /// Whether to run a sync immediately on start.
    pub sync_on_start: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: 8 * 3600,
            sync_on_start: true,
        }
    }
}

impl DaemonConfig {
    /// Parse interval string like "8h", "30m", "1d", "90s" or raw seconds.
    pub fn parse_interval(s: &str) -> Result<u64, String> {
        let s = s.trim().to_lowercase();

        if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map(|h| h * 3600)
                .map_err(|_| format!("Invalid hours: {}", hours))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map(|m| m * 60)
                .map_err(|_| format!("Invalid minutes: {}", minutes))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map(|d| d * 86400)
                .map_err(|_| format!("Invalid days: {}", days))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '8h', '30m', '1d'", s))
        }
    }

    /// Format interval for display.
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

pub struct Daemon {
    ctx: Arc<AppContext>,
    config: DaemonConfig,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>, config: DaemonConfig) -> Self {
        Self {
            ctx,
            config,
            running: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get the PID file path.
    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("ferrotype").join("daemon.pid"))
    }

    /// Check if another daemon is already running.
    pub fn is_running() -> bool {
        if let Some(pid_path) = Self::pid_file_path() {
            if pid_path.exists() {
                if let Ok(pid_str) = fs::read_to_string(&pid_path) {
                    if let Ok(pid) = pid_str.trim().parse::<u32>() {
                        return Self::process_exists(pid);
                    }
                }
            }
        }
        false
    }

    #[cfg(unix)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid)])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    pub async fn run(&self) -> crate::app::Result<()> {
        if Self::is_running() {
            return Err(FerrotypeError::Other(
                "Another daemon instance is already running".to_string(),
            ));
        }

        self.write_pid_file().map_err(|e| {
            FerrotypeError::Other(format!("Failed to write PID file: {}", e))
        })?;

        self.install_signal_handlers();

        tracing::info!(
            "Ferrotype daemon started (sync interval: {}, PID: {})",
            DaemonConfig::format_interval(self.config.interval_secs),
            std::process::id()
        );

        if self.config.sync_on_start {
            tracing::info!("Running initial sync...");
            self.run_sync().await;
        }

        let mut timer = interval(Duration::from_secs(self.config.interval_secs));
        timer.tick().await; // Skip the first immediate tick

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = timer.tick() => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    tracing::info!("Running scheduled sync...");
                    self.run_sync().await;
                }
                _ = self.shutdown.notified() => break,
            }
        }

        tracing::info!("Daemon shutting down...");
        self.remove_pid_file();

        Ok(())
    }

    fn install_signal_handlers(&self) {
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();
        let job = self.ctx.job.clone();

        #[cfg(unix)]
        tokio::spawn(async move {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to set up SIGTERM handler");
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                    .expect("Failed to set up SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            running.store(false, Ordering::SeqCst);
            job.cancel();
            shutdown.notify_waiters();
        });

        #[cfg(windows)]
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            running.store(false, Ordering::SeqCst);
            job.cancel();
            shutdown.notify_waiters();
        });
    }

    async fn run_sync(&self) {
        match self.ctx.job.run().await {
            Ok(RunOutcome::Completed(mirrored)) => {
                tracing::info!("Sync complete: {} new pictures", mirrored.len());
            }
            Ok(RunOutcome::Skipped) => {
                tracing::info!("Sync skipped, previous run still in progress");
            }
            Err(e) => {
                tracing::error!("Sync run failed: {e}");
            }
        }
    }
}

/// Stop a running daemon by reading the PID file and sending a signal.
pub fn stop_daemon() -> Result<(), String> {
    let pid_path =
        Daemon::pid_file_path().ok_or_else(|| "Could not determine PID file path".to_string())?;

    if !pid_path.exists() {
        return Err("No daemon is running (PID file not found)".to_string());
    }

    let pid_str =
        fs::read_to_string(&pid_path).map_err(|e| format!("Failed to read PID file: {}", e))?;

    let pid: u32 = pid_str
        .trim()
        .parse()
        .map_err(|_| "Invalid PID in PID file".to_string())?;

    #[cfg(unix)]
    {
        use std::process::Command;
        let status = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()
            .map_err(|e| format!("Failed to send signal: {}", e))?;

        if status.success() {
            let _ = fs::remove_file(&pid_path);
            Ok(())
        } else {
            Err(format!("Failed to stop daemon (PID {})", pid))
        }
    }

    #[cfg(windows)]
    {
        use std::process::Command;
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .status()
            .map_err(|e| format!("Failed to stop process: {}", e))?;

        if status.success() {
            let _ = fs::remove_file(&pid_path);
            Ok(())
        } else {
            Err(format!("Failed to stop daemon (PID {})", pid))
        }
    }
}

/// Check daemon status.
pub fn daemon_status() -> String {
    if let Some(pid_path) = Daemon::pid_file_path() {
        if pid_path.exists() {
            if let Ok(pid_str) = fs::read_to_string(&pid_path) {
                if let Ok(pid) = pid_str.trim().parse::<u32>() {
                    if Daemon::process_exists(pid) {
                        return format!("Daemon is running (PID: {})", pid);
                    } else {
                        return "Daemon is not running (stale PID file)".to_string();
                    }
                }
            }
        }
    }
    "Daemon is not running".to_string()
}
