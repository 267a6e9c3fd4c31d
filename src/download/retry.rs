//! Retry loop: drive attempts until success, a fatal failure, or exhaustion.

use crate::download::attempt::{AttemptOutcome, TimeoutCause};
use crate::download::backoff::BackoffPolicy;
use crate::download::{DownloadReport, TaskError};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Runs `attempt` until it succeeds or the policy says to stop
///
/// Only deadline-class timeouts are retried; any other failure ends the loop
/// immediately. The backoff sleep races the governing signal, and a
/// cancellation-caused timeout is reported as [`TaskError::Cancelled`]
/// rather than retried.
///
/// # Arguments
///
/// * `policy` - Backoff policy; at most `max_retries + 1` attempts are made
/// * `cancel` - Governing cancellation signal
/// * `reference` - The task's reference, for logging and the exhaustion error
/// * `attempt` - Called with the 1-based attempt number
pub async fn run_with_retry<F, Fut>(
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
    reference: &str,
    mut attempt: F,
) -> Result<DownloadReport, TaskError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome>,
{
    let max_attempts = policy.max_attempts();

    for attempt_no in 1..=max_attempts {
        let cause = match attempt(attempt_no).await {
            AttemptOutcome::Success { path, bytes } => {
                if attempt_no > 1 {
                    tracing::info!(reference, attempts = attempt_no, "Download succeeded after retry");
                }
                return Ok(DownloadReport {
                    path,
                    bytes,
                    attempts: attempt_no,
                });
            }
            AttemptOutcome::OtherFailure(e) => return Err(e),
            AttemptOutcome::TimeoutFailure(TimeoutCause::Cancelled) => {
                return Err(TaskError::Cancelled)
            }
            AttemptOutcome::TimeoutFailure(cause) => cause,
        };

        if attempt_no == max_attempts {
            tracing::warn!(reference, attempt = attempt_no, error = %cause, "Final attempt timed out");
            break;
        }

        let delay = policy.jittered_interval(attempt_no, &mut rand::thread_rng());
        tracing::warn!(
            reference,
            attempt = attempt_no,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %cause,
            "Attempt timed out, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TaskError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    Err(TaskError::RetriesExhausted {
        reference: reference.to_string(),
        attempts: max_attempts,
    })
}
