//! Retention sweep: evict delivered orders once they age out.
//!
//! # Policy knobs
//!
//! - `window`: how long a delivered order is kept (default 10 days). An order
//!   is evicted once its age *strictly exceeds* the window.
//! - `sweep_hidden`: whether archived orders are swept too (default no).
//! - `missing_delivered_at`: what to age a delivered order by when it has no
//!   `deliveredAt` (default: its `createdAt`).
//!
//! Sweeping is idempotent: a second pass at the same instant removes nothing.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::OrderError;
use crate::lifecycle::OrderStore;
use crate::model::order::{Collection, Order, OrderId};
use crate::model::snapshot::Snapshot;
use crate::storage::KeyValueStorage;

/// Default retention window for delivered orders.
pub const DEFAULT_WINDOW_DAYS: i64 = 10;

/// How to age a delivered order that lacks `deliveredAt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDeliveryPolicy {
    /// Age it from `createdAt`.
    #[default]
    CreatedAt,
    /// Never evict it.
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub window: Duration,
    pub sweep_hidden: bool,
    pub missing_delivered_at: MissingDeliveryPolicy,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window: Duration::days(DEFAULT_WINDOW_DAYS),
            sweep_hidden: false,
            missing_delivered_at: MissingDeliveryPolicy::default(),
        }
    }
}

impl RetentionPolicy {
    /// Whether `order` has aged out at `now`.
    #[must_use]
    pub fn expired(&self, order: &Order, now: DateTime<Utc>) -> bool {
        if !order.delivered {
            return false;
        }
        let since = match (order.delivered_at, self.missing_delivered_at) {
            (Some(delivered_at), _) => delivered_at,
            (None, MissingDeliveryPolicy::CreatedAt) => order.created_at,
            (None, MissingDeliveryPolicy::Keep) => return false,
        };
        now - since > self.window
    }
}

/// Ids removed by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed: Vec<OrderId>,
}

impl SweepReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Drop expired orders from `snapshot`, returning the ids removed.
pub fn sweep_snapshot(
    snapshot: &mut Snapshot,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> SweepReport {
    let mut report = SweepReport::default();
    let mut targets = vec![Collection::Visible];
    if policy.sweep_hidden {
        targets.push(Collection::Hidden);
    }

    for which in targets {
        snapshot.collection_mut(which).retain(|order| {
            if policy.expired(order, now) {
                debug!(id = %order.id, collection = %which, "order aged out");
                report.removed.push(order.id.clone());
                false
            } else {
                true
            }
        });
    }
    report
}

impl<S: KeyValueStorage, C: Clock> OrderStore<S, C> {
    /// Evict expired orders and persist if anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if persisting fails; memory is then
    /// left unchanged.
    pub fn sweep(&mut self, policy: &RetentionPolicy) -> Result<SweepReport, OrderError> {
        let now = self.clock().now();
        let mut next = self.snapshot().clone();
        let report = sweep_snapshot(&mut next, policy, now);
        if !report.is_empty() {
            self.commit(next)?;
            info!(removed = report.removed.len(), "retention sweep evicted orders");
        }
        Ok(report)
    }
}

/// Re-entrancy guard shared by every sweep entry point.
#[derive(Debug, Default)]
pub struct SweepGuard {
    running: AtomicBool,
}

impl SweepGuard {
    /// Claim the guard, or `None` if a sweep is already running.
    pub fn try_enter(&self) -> Option<SweepPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepPermit { guard: self })
    }
}

/// Held while a sweep runs; releases the guard on drop.
#[derive(Debug)]
pub struct SweepPermit<'a> {
    guard: &'a SweepGuard,
}

impl Drop for SweepPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

/// A background thread running a task immediately and then on every tick.
#[derive(Debug)]
pub struct PeriodicTask {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `task`; it runs until it returns `Break` or [`stop`] is called.
    ///
    /// [`stop`]: PeriodicTask::stop
    pub fn spawn<F>(interval: StdDuration, mut task: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                if task().is_break() {
                    return;
                }
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        });
        Self { stop, handle }
    }

    /// Ask the task to stop and wait for the thread to exit.
    pub fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }

    /// Wait for the task to finish on its own.
    pub fn join(self) {
        let Self { stop, handle } = self;
        let _ = handle.join();
        drop(stop);
    }
}
