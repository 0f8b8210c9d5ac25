//! One end-to-end run: resolve an identifier, then download the capture.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::constants::ARCHIVE_USER_AGENT;
use crate::downloader::{self, DownloadError};
use crate::log_sink::{LogSink, Severity};
use crate::resolver::{self, extension_order, Resolution};

/// Terminal outcome of one pipeline run.
///
/// Always a returned value, never a propagated error; this is what lets the
/// batch scheduler aggregate outcomes without special-casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { path: PathBuf },
    Failure { message: String },
    Cancelled,
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Shared pieces of a run: one HTTP client, the run configuration, and the
/// host's log sink.
pub struct Pipeline {
    client: Client,
    config: Config,
    sink: Arc<dyn LogSink>,
}

impl Pipeline {
    /// Create a pipeline with a client carrying the fixed per-request timeout
    /// and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config, sink: Arc<dyn LogSink>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(ARCHIVE_USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            sink,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn sink(&self) -> &dyn LogSink {
        self.sink.as_ref()
    }

    /// Run the whole pipeline for one already-extracted identifier.
    ///
    /// Every error is converted into an `Outcome` at this boundary;
    /// cancellation stays distinct from failure throughout.
    pub async fn run(&self, id: &str, cancel: &CancellationToken) -> Outcome {
        let mode = if self.config.best_quality {
            "Best Quality"
        } else {
            "Quick Scan"
        };
        self.sink.log(&format!("Using {mode} mode."), Severity::Purple);

        let extensions = extension_order(self.config.best_quality);
        let record = match resolver::resolve(
            &self.client,
            &self.config,
            id,
            extensions,
            cancel,
            self.sink.as_ref(),
        )
        .await
        {
            Resolution::Found(record) => record,
            Resolution::NotFound => {
                let message = "No archived versions found.".to_string();
                self.sink
                    .log(&format!("Failed for ID {id}: {message}"), Severity::Red);
                return Outcome::Failure { message };
            }
            Resolution::Cancelled => {
                self.sink.log("Operation cancelled.", Severity::Orange);
                return Outcome::Cancelled;
            }
        };

        match downloader::download(
            &self.client,
            &self.config,
            &record,
            id,
            cancel,
            self.sink.as_ref(),
        )
        .await
        {
            Ok(path) => {
                self.sink.log(
                    &format!("Success! Saved to: {}", path.display()),
                    Severity::Green,
                );
                info!(id, path = %path.display(), "Recovered file");
                Outcome::Success { path }
            }
            Err(DownloadError::Cancelled) => {
                self.sink
                    .log("Download cancelled by user.", Severity::Orange);
                Outcome::Cancelled
            }
            Err(error) => {
                let message = error.to_string();
                self.sink
                    .log(&format!("Failed for ID {id}: {message}"), Severity::Red);
                Outcome::Failure { message }
            }
        }
    }
}
