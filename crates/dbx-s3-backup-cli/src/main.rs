//! dbx-s3-backup CLI - scheduled Dropbox to S3 mirroring.

use clap::Parser;
use dbx_s3_backup::{
    BackupError, Config, DropboxClient, Notifier, Orchestrator, S3Store, WebhookNotifier,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dbx-s3-backup")]
#[command(about = "Mirror a Dropbox file tree into an S3 bucket on a schedule")]
#[command(version)]
struct Cli {
    /// Run a single backup immediately and exit
    #[arg(short, long)]
    once: bool,

    /// Load environment variables from this file before reading configuration
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BackupError> {
    let cli = Cli::parse();

    // Load dotenv before anything reads the environment.
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                BackupError::Config(format!("failed to load {}: {}", path.display(), e))
            })?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: mirroring to bucket '{}'",
        config.target.bucket
    );

    let source = Arc::new(DropboxClient::new(&config.source)?);
    let destination = Arc::new(S3Store::connect(&config.target).await);
    let notifier: Option<Arc<dyn Notifier>> = match &config.backup.webhook_url {
        Some(url) => Some(Arc::new(WebhookNotifier::new(url)?)),
        None => None,
    };

    let orchestrator = Orchestrator::new(config, source, destination, notifier);

    if cli.once {
        let metrics = orchestrator.run_once().await?;
        println!("\nBackup completed!");
        println!("  Run ID: {}", metrics.run_id);
        println!("  Duration: {:.2}s", metrics.duration_seconds);
        println!(
            "  Objects: {} total, {} copied, {} skipped, {} failed",
            metrics.objects_total,
            metrics.objects_copied,
            metrics.objects_skipped,
            metrics.objects_failed
        );
        println!("  Bytes copied: {}", metrics.bytes_copied);
        if !metrics.failed_paths.is_empty() {
            println!("  Failed paths: {:?}", metrics.failed_paths);
        }
        return Ok(());
    }

    let cancel_token = setup_signal_handler().await;
    orchestrator.run_scheduled(cancel_token).await
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM (container shutdown).
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
async fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    // SIGINT handler (Ctrl-C)
    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Finishing any in-flight run, then exiting...");
        token_int.cancel();
    });

    // SIGTERM handler
    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Finishing any in-flight run, then exiting...");
        token_term.cancel();
    });

    cancel_token
}

/// Setup signal handler for Windows (only SIGINT/Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl-C handler");
        eprintln!("\nReceived Ctrl-C. Finishing any in-flight run, then exiting...");
        token.cancel();
    });

    cancel_token
}
