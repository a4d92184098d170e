//! tenured - private mode renewal service
//!
//! Watches one application and keeps its time-bound private mode
//! permission switched on:
//! - Toggles on application start and before each window expires
//! - Survives restarts through a small JSON state file
//! - Re-verifies after system sleep
//! - Records every session change in a SQLite audit log

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tenure_config::{load_config, Config};
use tenure_core::RenewalEngine;
use tenure_host_api::{HostAdapter, StatusSink};
use tenure_host_linux::{CommandToggle, DesktopNotifier, LinuxHost, ProcessMonitor, SuspendMonitor};
use tenure_store::{AuditEvent, AuditEventType, AuditLog, JsonStateFile, SqliteAuditLog, StateStore};
use tenured::{Control, Service};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// tenured - keeps private mode renewed
#[derive(Parser, Debug)]
#[command(name = "tenured")]
#[command(about = "Private mode renewal service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/tenure/config.toml)
    #[arg(short, long, default_value_os_t = tenure_util::default_config_path())]
    config: PathBuf,

    /// Data directory override (default: from config, or ~/.local/share/tenure)
    #[arg(short, long, env = "TENURE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "tenured starting"
    );

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        process = %config.app.process_name,
        "Configuration loaded"
    );

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| config.service.data_dir.clone());
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let audit: Arc<dyn AuditLog> = Arc::new(
        SqliteAuditLog::open(data_dir.join(tenure_util::AUDIT_DB_FILENAME))
            .context("Failed to open audit log")?,
    );
    let state_file = JsonStateFile::new(data_dir.join(tenure_util::STATE_FILENAME));
    info!(state_file = %state_file.path().display(), "Using session state file");
    let state_store: Arc<dyn StateStore> = Arc::new(state_file);

    audit.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

    let host = Arc::new(build_host(&config));
    let monitors = host.start_monitors();
    let sink: Arc<dyn StatusSink> = Arc::new(DesktopNotifier::new(config.service.notifications));

    let engine = RenewalEngine::new(config.renewal, config.retry, state_store, audit.clone());

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let signals = forward_signals(control_tx)?;

    let host_adapter: Arc<dyn HostAdapter> = host;
    let result = Service::new(engine, host_adapter, sink).run(control_rx).await;

    signals.abort();
    for monitor in monitors {
        monitor.abort();
    }

    if let Err(e) = audit.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
        warn!(error = %e, "Failed to log service stop");
    }

    info!("Shutdown complete");
    result
}

fn build_host(config: &Config) -> LinuxHost {
    let toggle = CommandToggle::new(
        config.toggle.command.clone(),
        config.toggle.args.clone(),
        config.toggle.env.clone(),
        config.toggle.timeout,
    );
    let process_monitor = ProcessMonitor::new(config.app.process_name.clone(), config.app.poll_interval);
    let suspend_monitor = SuspendMonitor::new(config.power.poll_interval);

    LinuxHost::new(toggle, process_monitor, suspend_monitor)
}

/// SIGTERM, SIGINT and SIGHUP stop the service; SIGUSR1 renews now.
fn forward_signals(control_tx: mpsc::UnboundedSender<Control>) -> Result<JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;
    let mut sigusr1 =
        signal(SignalKind::user_defined1()).context("Failed to create SIGUSR1 handler")?;

    Ok(tokio::spawn(async move {
        loop {
            let control = tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    Control::Shutdown
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    Control::Shutdown
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    Control::Shutdown
                }
                _ = sigusr1.recv() => {
                    info!("Received SIGUSR1, renewing now");
                    Control::ManualRenewal
                }
            };

            if control_tx.send(control).is_err() {
                break;
            }
        }
    }))
}
