//! Task outcomes and the pool's aggregate report

use crate::download::TaskError;
use crate::RippleError;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Terminal outcome of one pool task
#[derive(Debug)]
pub enum TaskOutcome {
    /// The task body returned `Ok`
    Success,

    /// The task body returned a fatal error
    Failure(TaskError),

    /// The task body panicked; carries the recovered panic message
    Panic(String),

    /// The pool was cancelled before or while the task ran
    Cancelled,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for outcomes that fail the run (failures and panics)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Failure(_) | Self::Panic(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Builds a panic outcome from a recovered panic payload
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panic(message)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("succeeded"),
            Self::Failure(e) => write!(f, "{}", e),
            Self::Panic(message) => write!(f, "panicked: {}", message),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Live pool counters, shared with the progress reporter
#[derive(Debug, Default)]
pub struct PoolStats {
    submitted: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    panicked: AtomicUsize,
    cancelled: AtomicUsize,
    progress_reports: AtomicUsize,
}

impl PoolStats {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a task as holding a concurrency slot until the guard drops
    pub(crate) fn enter(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { stats: self }
    }

    pub(crate) fn record_outcome(&self, outcome: &TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Success => &self.succeeded,
            TaskOutcome::Failure(_) => &self.failed,
            TaskOutcome::Panic(_) => &self.panicked,
            TaskOutcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_progress_report(&self) {
        self.progress_reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            progress_reports: self.progress_reports.load(Ordering::Relaxed),
        }
    }
}

pub(crate) struct InFlightGuard<'a> {
    stats: &'a PoolStats,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Point-in-time copy of [`PoolStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub panicked: usize,
    pub cancelled: usize,
    pub progress_reports: usize,
}

impl StatsSnapshot {
    /// Tasks that have reached a terminal outcome
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed + self.panicked + self.cancelled
    }
}

/// Outcome of one task, labelled for reporting
#[derive(Debug)]
pub struct TaskReport {
    pub label: String,
    pub outcome: TaskOutcome,
}

/// Aggregate result of a pool run, in submission order
#[derive(Debug, Default)]
pub struct PoolReport {
    pub tasks: Vec<TaskReport>,
    pub stats: StatsSnapshot,
}

impl PoolReport {
    /// Returns true if every task succeeded (vacuously true for no tasks)
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| t.outcome.is_success())
    }

    /// The earliest-submitted task that failed or panicked
    pub fn first_error(&self) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.outcome.is_fatal())
    }

    /// Every task that failed or panicked, in submission order
    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|t| t.outcome.is_fatal())
    }

    pub fn cancelled_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_cancelled()).count()
    }

    /// Collapses the report into the run's result
    ///
    /// The error belongs to the earliest-submitted fatal task; a run with no
    /// fatal task but some cancelled ones reports [`RippleError::Cancelled`].
    pub fn into_result(self) -> Result<StatsSnapshot, RippleError> {
        let stats = self.stats;
        let any_cancelled = self.cancelled_count() > 0;

        if let Some(report) = self.tasks.into_iter().find(|t| t.outcome.is_fatal()) {
            return Err(match report.outcome {
                TaskOutcome::Panic(message) => RippleError::TaskPanicked {
                    reference: report.label,
                    message,
                },
                TaskOutcome::Failure(source) => RippleError::Task {
                    reference: report.label,
                    source,
                },
                TaskOutcome::Success | TaskOutcome::Cancelled => unreachable!("not fatal"),
            });
        }

        if any_cancelled {
            return Err(RippleError::Cancelled);
        }

        Ok(stats)
    }
}
