use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use imgur_rescue::batch;
use imgur_rescue::config::Config;
use imgur_rescue::extract::extract_id;
use imgur_rescue::log_sink::TracingLog;
use imgur_rescue::pipeline::{Outcome, Pipeline};

/// Command-line arguments for imgur-rescue.
#[derive(Parser, Debug)]
#[command(name = "imgur-rescue")]
#[command(about = "Recover deleted Imgur media from Wayback Machine captures")]
#[command(version)]
struct Args {
    /// Imgur ID or URL to recover
    #[arg(conflicts_with = "batch")]
    input: Option<String>,

    /// Recover every entry of a text file, one ID or URL per line
    #[arg(long, value_name = "FILE")]
    batch: Option<PathBuf>,

    /// Probe video formats first (slower, better quality)
    #[arg(long)]
    best_quality: bool,

    /// Destination directory (defaults to the platform downloads directory)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// After a batch pass, retry the entries that failed once
    #[arg(long, requires = "batch")]
    retry_failed: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if args.best_quality {
        config.best_quality = true;
    }
    if let Some(output) = args.output {
        config.download_dir = output;
    }
    config.validate().context("Invalid configuration")?;

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create download directory: {}",
                config.download_dir.display()
            )
        })?;

    info!(
        dir = %config.download_dir.display(),
        best_quality = config.best_quality,
        "Starting imgur-rescue"
    );

    // One token per run; Ctrl+C requests cancellation exactly once.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested...");
            signal_cancel.cancel();
        }
    });

    let pipeline = Pipeline::new(config, Arc::new(TracingLog))?;

    match (args.input, args.batch) {
        (Some(input), None) => run_single(&pipeline, &input, &cancel).await,
        (None, Some(path)) => run_batch_file(&pipeline, &path, args.retry_failed, &cancel).await,
        _ => anyhow::bail!("Provide an Imgur ID/URL, or --batch FILE"),
    }
}

async fn run_single(pipeline: &Pipeline, input: &str, cancel: &CancellationToken) -> Result<()> {
    let Some(id) = extract_id(input) else {
        anyhow::bail!("Could not extract a valid ID from: {input}");
    };

    match pipeline.run(&id, cancel).await {
        Outcome::Success { path } => {
            info!(path = %path.display(), "Done");
            Ok(())
        }
        Outcome::Failure { message } => anyhow::bail!("Download failed: {message}"),
        Outcome::Cancelled => {
            warn!("Cancelled");
            Ok(())
        }
    }
}

async fn run_batch_file(
    pipeline: &Pipeline,
    path: &Path,
    retry: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if lines.is_empty() {
        info!("Batch file has no entries, nothing to do");
        return Ok(());
    }

    let report = batch::run_batch(pipeline, &lines, cancel).await;
    if report.cancelled {
        warn!("Batch cancelled");
        return Ok(());
    }
    if report.failures.is_empty() {
        return Ok(());
    }

    warn!(count = report.failures.len(), "Some downloads failed");
    if !retry {
        anyhow::bail!(
            "{} download(s) failed (re-run with --retry-failed to retry them)",
            report.failures.len()
        );
    }

    let retry_report = batch::retry_failed(pipeline, &report.failures, cancel).await;
    if !retry_report.cancelled && !retry_report.failures.is_empty() {
        anyhow::bail!(
            "{} download(s) still failing after retry",
            retry_report.failures.len()
        );
    }
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,imgur_rescue=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}
