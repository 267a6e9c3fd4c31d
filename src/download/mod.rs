//! Download module for fetching individual images
//!
//! This module contains the per-task download engine:
//! - A single bounded attempt (request, stream to disk, classify)
//! - Exponential backoff with jitter
//! - The retry loop, which retries timeouts and nothing else
//! - The [`Downloader`] that ties them to the locator

mod attempt;
mod backoff;
mod retry;

pub use attempt::{execute_attempt, AttemptOutcome, TimeoutCause};
pub use backoff::BackoffPolicy;
pub use retry::run_with_retry;

use crate::url::locate;
use crate::UrlError;
use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Error that ends a single download task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("error with {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid download target: {0}")]
    InvalidTarget(#[from] UrlError),

    #[error("download failed after {attempts} attempts: {reference}")]
    RetriesExhausted { reference: String, attempts: u32 },

    #[error("download cancelled")]
    Cancelled,
}

impl TaskError {
    /// Returns true if the task stopped because its pool was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// One image to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// The raw `src` value, absolute or page-relative
    pub reference: String,

    /// Directory the image is written into
    pub destination_dir: PathBuf,
}

impl DownloadTask {
    pub fn new(reference: impl Into<String>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            reference: reference.into(),
            destination_dir: destination_dir.into(),
        }
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

/// What a successful download produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub attempts: u32,
}

/// Downloads tasks with per-attempt deadlines and timeout retries
///
/// Holds only read-only state, so one instance is shared by every task in
/// a pool.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    base_url: Url,
    policy: BackoffPolicy,
    attempt_timeout: Duration,
}

impl Downloader {
    /// Creates a new downloader
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for every attempt
    /// * `base_url` - Page URL that relative references resolve against
    /// * `policy` - Backoff policy for timeout retries
    /// * `attempt_timeout` - Deadline for each individual attempt
    pub fn new(client: Client, base_url: Url, policy: BackoffPolicy, attempt_timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            policy,
            attempt_timeout,
        }
    }

    /// Downloads one task, retrying timed-out attempts
    ///
    /// Every attempt re-derives its target from the original reference, so
    /// the failure countdown sent to the server drops by one per attempt.
    ///
    /// # Panics
    ///
    /// Panics if the reference carries the simulated-panic marker; see
    /// [`locate`]. The task pool converts this into a panic outcome.
    pub async fn download(
        &self,
        task: &DownloadTask,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport, TaskError> {
        tracing::debug!(reference = %task.reference, "Download start");

        let result = run_with_retry(&self.policy, cancel, &task.reference, |attempt| async move {
            let target = match locate(&self.base_url, &task.reference, attempt) {
                Ok(target) => target,
                Err(e) => return AttemptOutcome::OtherFailure(e.into()),
            };
            tracing::debug!(
                reference = %task.reference,
                attempt,
                url = %target.url,
                countdown = ?target.countdown,
                "Attempting download"
            );
            execute_attempt(
                &self.client,
                &target,
                &task.destination_dir,
                self.attempt_timeout,
                cancel,
            )
            .await
        })
        .await;

        match &result {
            Ok(report) => tracing::debug!(
                reference = %task.reference,
                path = %report.path.display(),
                bytes = report.bytes,
                attempts = report.attempts,
                "Download done"
            ),
            Err(e) if e.is_cancelled() => {
                tracing::debug!(reference = %task.reference, "Download cancelled")
            }
            Err(e) => tracing::warn!(reference = %task.reference, error = %e, "Download failed"),
        }

        result
    }
}
