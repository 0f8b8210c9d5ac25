//! Sequential batch scheduling over many raw input lines.
//!
//! Exactly one identifier is in flight at any time; the scheduler never fans
//! out, to keep the shared archive service unthrottled and log ordering
//! deterministic. A fixed cancellable cooldown separates items.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cancel::sleep_unless_cancelled;
use crate::extract::extract_id;
use crate::log_sink::Severity;
use crate::pipeline::{Outcome, Pipeline};

/// What a batch pass left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Identifiers that extracted cleanly but whose pipeline did not succeed,
    /// in encounter order.
    pub failures: Vec<String>,
    /// Whether the pass stopped on cancellation. The caller must not offer a
    /// retry pass for a cancelled run.
    pub cancelled: bool,
}

/// Run the pipeline once per raw line, in order.
///
/// Lines that yield no identifier are skipped with a notice and never counted
/// as failures. An item failure never stops the pass; only cancellation does.
pub async fn run_batch(
    pipeline: &Pipeline,
    lines: &[String],
    cancel: &CancellationToken,
) -> BatchReport {
    pipeline.sink().log(
        &format!("Starting batch process for {} entries.", lines.len()),
        Severity::Blue,
    );
    let report = run_pass(pipeline, lines, true, cancel).await;
    if !report.cancelled {
        pipeline
            .sink()
            .log("Initial batch process completed.", Severity::Green);
    }
    report
}

/// Re-run the pipeline over identifiers a previous pass failed on.
///
/// Same per-item discipline as `run_batch`, minus extraction (the identifiers
/// are already normalized). Failures out of this pass are reported but never
/// retried again automatically.
pub async fn retry_failed(
    pipeline: &Pipeline,
    ids: &[String],
    cancel: &CancellationToken,
) -> BatchReport {
    pipeline.sink().log(
        &format!("--- Retrying {} failed downloads... ---", ids.len()),
        Severity::Purple,
    );
    let report = run_pass(pipeline, ids, false, cancel).await;
    if !report.cancelled {
        pipeline
            .sink()
            .log("--- Retry process finished. ---", Severity::Purple);
    }
    report
}

async fn run_pass(
    pipeline: &Pipeline,
    entries: &[String],
    extract_first: bool,
    cancel: &CancellationToken,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = entries.len();

    for (index, entry) in entries.iter().enumerate() {
        if cancel.is_cancelled() {
            pipeline
                .sink()
                .log("Batch process cancelled.", Severity::Orange);
            report.cancelled = true;
            break;
        }

        pipeline.sink().log(
            &format!("--- Processing {}/{total}: {entry} ---", index + 1),
            Severity::Black,
        );

        let id = if extract_first {
            match extract_id(entry) {
                Some(id) => id,
                None => {
                    pipeline
                        .sink()
                        .log(&format!("Skipping invalid entry: {entry}"), Severity::Orange);
                    continue;
                }
            }
        } else {
            entry.clone()
        };

        pipeline
            .sink()
            .log(&format!("Processing ID: {id}"), Severity::Blue);
        match pipeline.run(&id, cancel).await {
            Outcome::Success { .. } => {}
            Outcome::Failure { .. } => report.failures.push(id),
            Outcome::Cancelled => {
                report.cancelled = true;
                break;
            }
        }

        // Cooldown between items, never after the last one.
        if index + 1 < total
            && !sleep_unless_cancelled(pipeline.config().item_cooldown, cancel).await
        {
            pipeline
                .sink()
                .log("Batch process cancelled.", Severity::Orange);
            report.cancelled = true;
            break;
        }
    }

    info!(
        failures = report.failures.len(),
        cancelled = report.cancelled,
        "Batch pass finished"
    );
    report
}
