//! Queue draining.
//!
//! A drain takes the current queue contents and executes them oldest first.
//! The queue lock is held only to take the snapshot and to record each
//! outcome, never across a handler call, so callers can keep enqueueing
//! while a drain is talking to the network.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::OfflineError;
use crate::queue::{Dispatcher, ExecutionError, FailureOutcome, PendingQueue};

/// Counts of what a drain did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub executed: usize,
    pub requeued: usize,
    pub dead_lettered: usize,
    /// Already completed under the same id, not executed again
    pub skipped: usize,
    /// Handed back unattempted because the drain was cancelled
    pub restored: usize,
    pub cancelled: bool,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.requeued == 0 && self.dead_lettered == 0 && !self.cancelled
    }
}

// == Drain ==
/// Executes every action queued at call time.
///
/// Failures are contained: a failed action is requeued at the tail (or
/// dead-lettered) and the drain moves on. On cancellation the action being
/// executed and everything after it go back to the front of the queue in
/// order.
pub async fn drain_queue(
    queue: &Mutex<PendingQueue>,
    dispatcher: &Dispatcher,
    action_timeout: Duration,
    cancel: &CancellationToken,
) -> DrainReport {
    let snapshot = queue.lock().await.begin_drain();
    let mut report = DrainReport::default();
    if snapshot.is_empty() {
        return report;
    }

    info!("Draining {} pending actions", snapshot.len());

    for (index, action) in snapshot.iter().enumerate() {
        let already_done = queue.lock().await.is_completed(&action.id);
        if already_done {
            debug!("Action {} already completed, skipping", action.id);
            if let Err(e) = queue.lock().await.skip_duplicate(&action.id) {
                warn!("Could not persist skip of {}: {}", action.id, e);
            }
            report.skipped += 1;
            continue;
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(action_timeout, dispatcher.dispatch(action)) => Some(result),
        };

        let mut guard = queue.lock().await;
        let recorded = match outcome {
            None => {
                let rest: Vec<String> = snapshot[index..].iter().map(|a| a.id.clone()).collect();
                report.restored = rest.len();
                report.cancelled = true;
                info!("Drain cancelled, {} actions handed back", rest.len());
                guard.restore_front(&rest)
            }
            Some(Ok(Ok(()))) => {
                report.executed += 1;
                guard.complete(&action.id)
            }
            Some(Ok(Err(ExecutionError::Permanent(reason)))) => {
                report.dead_lettered += 1;
                guard.dead_letter(&action.id, &reason)
            }
            Some(Ok(Err(ExecutionError::Transient(reason)))) => {
                record_failure(&mut guard, &action.id, &reason, &mut report)
            }
            Some(Err(_elapsed)) => {
                let reason =
                    OfflineError::Timeout(action_timeout.as_millis() as u64).to_string();
                record_failure(&mut guard, &action.id, &reason, &mut report)
            }
        };
        if let Err(e) = recorded {
            warn!("Could not persist outcome of action {}: {}", action.id, e);
        }
        if report.cancelled {
            break;
        }
    }

    info!(
        "Drain finished: executed={} requeued={} dead_lettered={} skipped={} restored={}",
        report.executed, report.requeued, report.dead_lettered, report.skipped, report.restored
    );
    report
}

fn record_failure(
    queue: &mut PendingQueue,
    id: &str,
    reason: &str,
    report: &mut DrainReport,
) -> crate::error::Result<()> {
    match queue.fail(id, reason)? {
        FailureOutcome::Requeued => report.requeued += 1,
        FailureOutcome::DeadLettered => report.dead_lettered += 1,
    }
    Ok(())
}
