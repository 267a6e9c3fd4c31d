use crate::pool::outcome::PoolStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawns a background task that logs pool progress every `every`
///
/// Purely observational: it only reads the counters. It exits when `stop`
/// fires; the pool fires it after the last task has joined and then awaits
/// the handle.
pub(crate) fn spawn_progress_reporter(
    stats: Arc<PoolStats>,
    every: Duration,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = interval.tick() => {
                    stats.record_progress_report();
                    let s = stats.snapshot();
                    tracing::info!(
                        finished = s.finished(),
                        submitted = s.submitted,
                        in_flight = s.in_flight,
                        failed = s.failed + s.panicked,
                        cancelled = s.cancelled,
                        "Pool progress"
                    );
                }
            }
        }
    })
}
