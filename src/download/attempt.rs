//! A single bounded download attempt
//!
//! One request, one destination file, one classified outcome. The response
//! is streamed into `<name>.part` and renamed into place only once the body
//! has been fully written, so a partial file is never mistaken for success.

use crate::download::TaskError;
use crate::url::ResolvedTarget;
use crate::UrlError;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What made an attempt count as timed out
#[derive(Debug, Error)]
pub enum TimeoutCause {
    #[error("attempt exceeded its {}ms deadline", .0.as_millis())]
    Deadline(Duration),

    #[error("request timed out: {0}")]
    Transport(reqwest::Error),

    #[error("attempt cancelled")]
    Cancelled,
}

/// Classified result of one attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The body was written to `path` in full
    Success { path: PathBuf, bytes: u64 },

    /// The deadline elapsed or the governing signal fired
    TimeoutFailure(TimeoutCause),

    /// Anything else; never retried
    OtherFailure(TaskError),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Performs exactly one fetch of `target` into `destination_dir`
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `target` - Resolved target for this attempt
/// * `destination_dir` - Directory receiving the file
/// * `deadline` - Budget for request plus write, started now
/// * `cancel` - Governing signal; aborts the in-flight request or write
///
/// # Returns
///
/// Exactly one [`AttemptOutcome`]. On anything but success the `.part`
/// file is removed; the response body and file handle are dropped on
/// every path.
pub async fn execute_attempt(
    client: &Client,
    target: &ResolvedTarget,
    destination_dir: &Path,
    deadline: Duration,
    cancel: &CancellationToken,
) -> AttemptOutcome {
    let Some(file_name) = target.file_name() else {
        return AttemptOutcome::OtherFailure(TaskError::InvalidTarget(UrlError::Malformed(
            format!("no file name in {}", target.url),
        )));
    };

    let path = destination_dir.join(file_name);
    let partial = partial_path(&path);

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => AttemptOutcome::TimeoutFailure(TimeoutCause::Cancelled),
        result = tokio::time::timeout(deadline, fetch_to_file(client, &target.url, &partial, &path)) => {
            match result {
                Ok(outcome) => outcome,
                Err(_) => AttemptOutcome::TimeoutFailure(TimeoutCause::Deadline(deadline)),
            }
        }
    };

    if !outcome.is_success() {
        discard_partial(&partial).await;
    }

    outcome
}

async fn fetch_to_file(client: &Client, url: &Url, partial: &Path, path: &Path) -> AttemptOutcome {
    let mut response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_request_error(url, e),
    };

    let status = response.status();
    if status != StatusCode::OK {
        return AttemptOutcome::OtherFailure(TaskError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = match File::create(partial).await {
        Ok(file) => file,
        Err(source) => return write_failure(partial, source),
    };

    let mut bytes = 0u64;
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if let Err(source) = file.write_all(&chunk).await {
                    return write_failure(partial, source);
                }
                bytes += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(e) => return classify_request_error(url, e),
        }
    }

    if let Err(source) = file.flush().await {
        return write_failure(partial, source);
    }
    drop(file);

    if let Err(source) = tokio::fs::rename(partial, path).await {
        return write_failure(path, source);
    }

    AttemptOutcome::Success {
        path: path.to_path_buf(),
        bytes,
    }
}

fn classify_request_error(url: &Url, error: reqwest::Error) -> AttemptOutcome {
    if error.is_timeout() {
        AttemptOutcome::TimeoutFailure(TimeoutCause::Transport(error))
    } else {
        AttemptOutcome::OtherFailure(TaskError::Request {
            url: url.to_string(),
            source: error,
        })
    }
}

fn write_failure(path: &Path, source: std::io::Error) -> AttemptOutcome {
    AttemptOutcome::OtherFailure(TaskError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

async fn discard_partial(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
        }
    }
}
