//! Wayback CDX resolution.
//!
//! The CDX index only answers exact filename+extension queries, so finding a
//! capture for an identifier means probing `<media-host>/<id><ext>` for each
//! extension in a fixed order until one hits. Retries exist solely to absorb
//! transient upstream instability, never to compensate for a capture that is
//! legitimately missing.

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancel::sleep_unless_cancelled;
use crate::config::Config;
use crate::log_sink::{LogSink, Severity};

/// Extension search order for a quick scan, cheapest formats first.
pub const QUICK_SCAN_EXTENSIONS: &[&str] =
    &[".jpg", ".png", ".gif", ".gifv", ".mp4", ".webm", ".mpeg"];

/// Extension search order favoring the best-quality formats.
pub const BEST_QUALITY_EXTENSIONS: &[&str] =
    &[".mp4", ".webm", ".gif", ".png", ".jpg", ".mpeg", ".gifv"];

/// Pick the search order for a run.
#[must_use]
pub fn extension_order(best_quality: bool) -> &'static [&'static str] {
    if best_quality {
        BEST_QUALITY_EXTENSIONS
    } else {
        QUICK_SCAN_EXTENSIONS
    }
}

/// A capture found in the CDX index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Playback URL serving the raw archived bytes.
    pub archive_url: String,
    /// Extension that was being probed when the capture was found.
    /// Provisional; the downloader may override it from the response
    /// content type.
    pub fallback_ext: String,
}

/// Outcome of a whole resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ArchiveRecord),
    /// Every extension exhausted without a capture.
    NotFound,
    Cancelled,
}

/// Outcome of probing one extension.
enum ProbeOutcome {
    Hit(ArchiveRecord),
    /// Nothing archived under this extension, or a terminal lookup status;
    /// move to the next extension without retrying.
    Miss,
    /// Transient errors consumed the whole retry budget; move to the next
    /// extension.
    Exhausted,
    Cancelled,
}

/// Find an archived capture for `id`, probing `extensions` in order.
///
/// Short-circuits on the first hit. Cancellation wins over "no match" at every
/// checkpoint.
pub async fn resolve(
    client: &Client,
    config: &Config,
    id: &str,
    extensions: &[&str],
    cancel: &CancellationToken,
    sink: &dyn LogSink,
) -> Resolution {
    for &ext in extensions {
        if cancel.is_cancelled() {
            return Resolution::Cancelled;
        }

        sink.log(&format!("Checking for {ext}..."), Severity::Black);

        match probe_extension(client, config, id, ext, cancel, sink).await {
            ProbeOutcome::Hit(record) => {
                sink.log(&format!("Found archived version with {ext}"), Severity::Green);
                debug!(id, ext, url = %record.archive_url, "CDX capture found");
                return Resolution::Found(record);
            }
            ProbeOutcome::Cancelled => return Resolution::Cancelled,
            ProbeOutcome::Miss | ProbeOutcome::Exhausted => {}
        }
    }

    Resolution::NotFound
}

async fn probe_extension(
    client: &Client,
    config: &Config,
    id: &str,
    ext: &str,
    cancel: &CancellationToken,
    sink: &dyn LogSink,
) -> ProbeOutcome {
    let probe_url = format!("https://{}/{id}{ext}", config.media_host);

    for attempt in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            return ProbeOutcome::Cancelled;
        }

        let request = client
            .get(&config.cdx_endpoint)
            .query(&[("url", probe_url.as_str()), ("output", "json")])
            .send();
        let outcome = tokio::select! {
            () = cancel.cancelled() => return ProbeOutcome::Cancelled,
            result = request => result,
        };

        let transient = match outcome {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::SERVICE_UNAVAILABLE
                    || status == StatusCode::GATEWAY_TIMEOUT
                {
                    format!("server error {}", status.as_u16())
                } else if !status.is_success() {
                    // Terminal for this extension, not worth retrying.
                    sink.log(
                        &format!("Lookup failed for {ext}: status {}", status.as_u16()),
                        Severity::Orange,
                    );
                    warn!(id, ext, %status, "CDX lookup failed");
                    return ProbeOutcome::Miss;
                } else {
                    match response.json::<serde_json::Value>().await {
                        Ok(listing) => {
                            match capture_from_listing(&listing, &config.playback_endpoint, ext) {
                                Some(record) => return ProbeOutcome::Hit(record),
                                None => return ProbeOutcome::Miss,
                            }
                        }
                        // A mangled listing on a success status is upstream
                        // instability; retry it.
                        Err(e) => format!("unreadable listing: {e}"),
                    }
                }
            }
            // Timeouts and connection failures are transient.
            Err(e) => e.to_string(),
        };

        if attempt == config.max_attempts {
            sink.log(
                &format!("Failed for {ext} after {attempt} attempts: {transient}"),
                Severity::Red,
            );
            warn!(id, ext, attempts = attempt, "Giving up on extension");
            return ProbeOutcome::Exhausted;
        }

        sink.log(
            &format!(
                "Error for {ext}: {transient}. Retrying in {}s...",
                config.retry_cooldown.as_secs()
            ),
            Severity::Orange,
        );
        if !sleep_unless_cancelled(config.retry_cooldown, cancel).await {
            return ProbeOutcome::Cancelled;
        }
    }

    ProbeOutcome::Exhausted
}

/// Build a playback record from a CDX `output=json` listing.
///
/// The listing is a JSON array whose first row is the field header; the first
/// data row carries the capture timestamp at index 1 and the original URL at
/// index 2. An empty or header-only listing means nothing is archived under
/// this probe.
fn capture_from_listing(
    listing: &serde_json::Value,
    playback_endpoint: &str,
    ext: &str,
) -> Option<ArchiveRecord> {
    let row = listing.as_array()?.get(1)?.as_array()?;
    let timestamp = row.get(1)?.as_str()?;
    let original_url = row.get(2)?.as_str()?;

    Some(ArchiveRecord {
        archive_url: format!("{playback_endpoint}/web/{timestamp}if_/{original_url}"),
        fallback_ext: ext.to_string(),
    })
}
