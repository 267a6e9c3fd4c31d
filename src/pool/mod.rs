//! Bounded task pool
//!
//! Runs a batch of independent tasks with at most N in flight, isolates
//! panics so one bad task cannot take the others down, and applies the
//! configured failure policy:
//! - fail-fast: the first failure or panic cancels every other task
//! - collect-all: every task runs to completion regardless
//!
//! Outcomes are reported in submission order, not completion order.

mod outcome;
mod progress;

pub use crate::config::FailurePolicy;
pub use outcome::{PoolReport, PoolStats, StatsSnapshot, TaskOutcome, TaskReport};

use crate::config::PoolSection;
use crate::download::TaskError;
use futures::FutureExt;
use progress::spawn_progress_reporter;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Pool settings
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of task bodies running at once
    pub max_concurrency: usize,

    /// What one fatal task does to the rest
    pub failure_policy: FailurePolicy,

    /// Period of the progress log; `None` disables it
    pub progress_interval: Option<Duration>,
}

impl PoolConfig {
    /// Creates a fail-fast pool config without progress reporting
    ///
    /// The concurrency is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
            failure_policy: FailurePolicy::default(),
            progress_interval: None,
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Sets the progress period; zero disables reporting
    pub fn with_progress_interval(mut self, every: Duration) -> Self {
        self.progress_interval = (!every.is_zero()).then_some(every);
        self
    }
}

impl From<&PoolSection> for PoolConfig {
    fn from(section: &PoolSection) -> Self {
        PoolConfig::new(section.max_concurrency as usize)
            .with_failure_policy(section.failure_policy)
            .with_progress_interval(Duration::from_millis(section.progress_interval_ms))
    }
}

/// Executes tasks under a concurrency ceiling
pub struct TaskPool {
    config: PoolConfig,
    cancel: CancellationToken,
    stats: Arc<PoolStats>,
}

impl TaskPool {
    /// Creates a pool with its own cancellation signal
    pub fn new(config: PoolConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Creates a pool governed by `cancel`
    ///
    /// Pass a child token to let an outer shutdown cancel the pool without
    /// a fail-fast cancellation leaking upward.
    pub fn with_cancellation(config: PoolConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Returns a handle to the pool's cancellation signal
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels every task that has not finished yet
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Live counters; useful for observing a run from outside
    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    /// Runs `work` once per item and waits for every task to finish
    ///
    /// Each task body receives the pool's cancellation token and is expected
    /// to stop promptly once it fires, returning [`TaskError::Cancelled`].
    /// Tasks still waiting for a slot when the token fires never start.
    ///
    /// # Arguments
    ///
    /// * `items` - One entry per task; its `Display` form labels the task
    /// * `work` - Builds the task body for an item
    ///
    /// # Returns
    ///
    /// A [`PoolReport`] with exactly one outcome per item, in submission
    /// order. An empty batch returns immediately.
    pub async fn run<T, F, Fut>(self, items: Vec<T>, work: F) -> PoolReport
    where
        T: fmt::Display,
        F: Fn(T, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        if items.is_empty() {
            return PoolReport::default();
        }

        let total = items.len();
        tracing::debug!(
            tasks = total,
            max_concurrency = self.config.max_concurrency,
            policy = ?self.config.failure_policy,
            "Pool starting"
        );

        let labels: Vec<String> = items.iter().map(ToString::to_string).collect();
        let mut outcomes: Vec<Option<TaskOutcome>> = (0..total).map(|_| None).collect();

        let progress_stop = CancellationToken::new();
        let progress = self.config.progress_interval.map(|every| {
            spawn_progress_reporter(Arc::clone(&self.stats), every, progress_stop.clone())
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut set = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            self.stats.record_submitted();

            let job = match std::panic::catch_unwind(AssertUnwindSafe(|| {
                work(item, self.cancel.clone())
            })) {
                Ok(job) => job,
                Err(payload) => {
                    let outcome = TaskOutcome::from_panic(payload);
                    self.settle(&outcome);
                    outcomes[index] = Some(outcome);
                    continue;
                }
            };

            let semaphore = Arc::clone(&semaphore);
            let stats = Arc::clone(&self.stats);
            let cancel = self.cancel.clone();
            let policy = self.config.failure_policy;

            set.spawn(async move {
                let outcome = run_slot(job, semaphore, &stats, &cancel).await;
                stats.record_outcome(&outcome);
                if policy == FailurePolicy::FailFast && outcome.is_fatal() {
                    cancel.cancel();
                }
                (index, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if outcome.is_fatal() {
                        tracing::debug!(task = %labels[index], outcome = ?outcome, "Task failed");
                    }
                    outcomes[index] = Some(outcome);
                }
                Err(e) => tracing::error!(error = %e, "Pool task terminated abnormally"),
            }
        }

        progress_stop.cancel();
        if let Some(handle) = progress {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Progress reporter failed");
            }
        }

        let tasks: Vec<TaskReport> = labels
            .into_iter()
            .zip(outcomes)
            .map(|(label, outcome)| TaskReport {
                label,
                outcome: outcome
                    .unwrap_or_else(|| TaskOutcome::Panic("task terminated without reporting".into())),
            })
            .collect();

        let stats = self.stats.snapshot();
        tracing::info!(
            tasks = total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            panicked = stats.panicked,
            cancelled = stats.cancelled,
            peak_in_flight = stats.peak_in_flight,
            "Pool finished"
        );

        PoolReport { tasks, stats }
    }

    /// Records an outcome produced outside a spawned slot
    fn settle(&self, outcome: &TaskOutcome) {
        self.stats.record_outcome(outcome);
        if self.config.failure_policy == FailurePolicy::FailFast && outcome.is_fatal() {
            self.cancel.cancel();
        }
    }
}

/// Waits for a slot, then runs one task body with panics caught
async fn run_slot<Fut>(
    job: Fut,
    semaphore: Arc<Semaphore>,
    stats: &PoolStats,
    cancel: &CancellationToken,
) -> TaskOutcome
where
    Fut: Future<Output = Result<(), TaskError>>,
{
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return TaskOutcome::Cancelled,
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return TaskOutcome::Cancelled,
        },
    };

    if cancel.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    let _in_flight = stats.enter();
    match AssertUnwindSafe(job).catch_unwind().await {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(e)) if e.is_cancelled() => TaskOutcome::Cancelled,
        Ok(Err(e)) => TaskOutcome::Failure(e),
        Err(payload) => TaskOutcome::from_panic(payload),
    }
}
