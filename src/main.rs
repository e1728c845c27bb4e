//! Snapshot-Courier main entry point
//!
//! This is the command-line interface for the daily JSON snapshot daemon.

use anyhow::Context;
use clap::Parser;
use snapshot_courier::config::{load_config, load_env_file, Config};
use snapshot_courier::scheduler::{Pipeline, Scheduler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Snapshot-Courier: a daily JSON snapshot daemon
///
/// Fetches REQUEST_URL once a day at SCHEDULE_TIME, retrying on failure,
/// saves the response as a timestamped JSON file and optionally mails it
/// to SCHEDULE_RECIPIENTS.
#[derive(Parser, Debug)]
#[command(name = "snapshot-courier")]
#[command(version)]
#[command(about = "A daily JSON snapshot daemon", long_about = None)]
struct Cli {
    /// Env file to load before reading the environment (default: ./.env if present)
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate configuration, print it and exit
    #[arg(long, conflicts_with = "once")]
    dry_run: bool,

    /// Run a single cycle immediately and exit
    #[arg(long, conflicts_with = "dry_run")]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load_startup_config(cli.env_file.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    log_config(&config);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let pipeline = Pipeline::from_config(Arc::new(config))
        .context("Failed to initialise pipeline")?;
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    if cli.once {
        return handle_once(pipeline, cancel).await;
    }

    Scheduler::new(pipeline, cancel).run().await;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("snapshot_courier=info,warn"),
            1 => EnvFilter::new("snapshot_courier=debug,info"),
            2 => EnvFilter::new("snapshot_courier=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Startup banner; the credential is never logged
fn log_config(config: &Config) {
    tracing::info!("Configuration loaded:");
    tracing::info!("  URL: {}", config.fetch.target_url);
    tracing::info!("  Schedule: {}", config.schedule.trigger_time);
    tracing::info!("  Recipients: {}", config.mail.recipients.join(", "));
    tracing::info!(
        "  Max retries: {} (every {}s)",
        config.fetch.max_retries,
        config.fetch.retry_delay.as_secs()
    );
    tracing::info!(
        "  Email sending: {}",
        if config.mail.enabled { "enabled" } else { "disabled" }
    );
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Snapshot-Courier Dry Run ===\n");

    println!("Fetch:");
    println!("  URL: {}", config.fetch.target_url);
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Retry delay: {}s", config.fetch.retry_delay.as_secs());
    println!("  Request timeout: {}s", config.fetch.request_timeout.as_secs());

    println!("\nSchedule:");
    println!("  Daily at: {}", config.schedule.trigger_time);

    println!("\nMail:");
    println!("  Enabled: {}", config.mail.enabled);
    println!("  Account: {}", config.mail.user);
    println!("  Password: ********");
    println!("  Relay: {}:{}", config.mail.smtp_host, config.mail.smtp_port);
    println!("  Subject prefix: {}", config.mail.subject_prefix);
    println!("\nRecipients ({}):", config.mail.recipients.len());
    for recipient in &config.mail.recipients {
        println!("  - {}", recipient);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());

    println!("\n✓ Configuration is valid");
}

/// Handles the --once mode: one cycle now, non-zero exit if nothing was saved
async fn handle_once(pipeline: Pipeline, cancel: CancellationToken) -> anyhow::Result<()> {
    let report = pipeline.run_cycle(&cancel).await;
    report.log();

    if report.is_persisted() {
        Ok(())
    } else {
        anyhow::bail!("Cycle did not produce an artifact")
    }
}

/// Loads the optional env file, then the configuration from the environment
fn load_startup_config(env_file: Option<&Path>) -> snapshot_courier::Result<Config> {
    load_env_file(env_file)?;
    Ok(load_config()?)
}

/// Cancels `token` on Ctrl-C or SIGTERM
async fn cancel_on_shutdown(token: CancellationToken) {
    wait_for_shutdown_signal().await;

    tracing::info!("Shutdown requested");
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => signal_received(Err(e), "SIGTERM").await,
        }
    };

    tokio::select! {
        _ = async { signal_received(tokio::signal::ctrl_c().await, "Ctrl-C").await } => {}
        _ = terminate => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    signal_received(tokio::signal::ctrl_c().await, "Ctrl-C").await;
}

/// Resolves once a listener reports its signal
///
/// A listener that could not be installed never resolves, so the daemon keeps
/// running until another signal arrives.
async fn signal_received(result: std::io::Result<()>, name: &str) {
    if let Err(e) = result {
        tracing::warn!("Failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}
