//! The command surface shared by every front end.
//!
//! [`OrderDesk`] owns the [`OrderStore`] behind a mutex. Each command takes
//! the lock, runs to completion, and releases it, so no two mutations
//! interleave. A remote fetch is the one slow step: [`OrderDesk::sync_now`]
//! performs it *without* the lock and merges against whatever the store holds
//! when the fetch returns. Edits made while the fetch was in flight are
//! therefore merged against, never silently overwritten.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::OrderError;
use crate::lifecycle::OrderStore;
use crate::model::order::{Collection, NewOrder, Order, OrderId, Toggle};
use crate::model::snapshot::Snapshot;
use crate::retention::{PeriodicTask, RetentionPolicy, SweepGuard, SweepReport};
use crate::storage::KeyValueStorage;
use crate::sync::reconcile::ReconcileReport;
use crate::sync::remote::{RemoteSnapshot, SnapshotSink, SnapshotSource};

/// Outcome of one sync-now run. Remote failures are collected, not raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Whether a remote snapshot was fetched and merged.
    pub pulled: bool,
    /// Merge counts, when a snapshot was pulled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<ReconcileReport>,
    /// Orders the merge brought back that were already past retention.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub swept: Vec<OrderId>,
    /// Remote revision the merge was based on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Whether the merged snapshot was pushed back.
    pub pushed: bool,
    /// Non-fatal remote failures.
    pub errors: Vec<String>,
}

impl SyncReport {
    #[must_use]
    pub fn is_offline(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub struct OrderDesk<S, C> {
    store: Mutex<OrderStore<S, C>>,
    policy: RetentionPolicy,
    sweep_guard: SweepGuard,
    opened_with: SweepReport,
    source: Option<Box<dyn SnapshotSource>>,
    sink: Option<Box<dyn SnapshotSink>>,
}

impl<S: KeyValueStorage, C: Clock> OrderDesk<S, C> {
    /// Wrap `store` and run the start-up retention sweep.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the sweep cannot persist.
    pub fn open(store: OrderStore<S, C>, policy: RetentionPolicy) -> Result<Self, OrderError> {
        let mut desk = Self {
            store: Mutex::new(store),
            policy,
            sweep_guard: SweepGuard::default(),
            opened_with: SweepReport::default(),
            source: None,
            sink: None,
        };
        desk.opened_with = desk.sweep()?.unwrap_or_default();
        Ok(desk)
    }

    /// What the start-up sweep removed.
    #[must_use]
    pub const fn startup_sweep(&self) -> &SweepReport {
        &self.opened_with
    }

    #[must_use]
    pub fn with_source(mut self, source: impl SnapshotSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl SnapshotSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.source.is_some() || self.sink.is_some()
    }

    #[must_use]
    pub fn can_push(&self) -> bool {
        self.sink.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, OrderStore<S, C>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current visible and hidden sets.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot().clone()
    }

    #[must_use]
    pub fn visible(&self) -> Vec<Order> {
        self.lock().visible().to_vec()
    }

    #[must_use]
    pub fn hidden(&self) -> Vec<Order> {
        self.lock().hidden().to_vec()
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<(Collection, Order)> {
        self.lock()
            .get(id)
            .map(|(which, order)| (which, order.clone()))
    }

    /// # Errors
    ///
    /// See [`OrderStore::create`].
    pub fn create(&self, fields: NewOrder) -> Result<Order, OrderError> {
        self.lock().create(fields)
    }

    /// # Errors
    ///
    /// See [`OrderStore::toggle`].
    pub fn toggle(&self, id: &OrderId, toggle: Toggle) -> Result<Order, OrderError> {
        self.lock().toggle(id, toggle)
    }

    /// # Errors
    ///
    /// See [`OrderStore::toggle`].
    pub fn toggle_paid(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.toggle(id, Toggle::Paid)
    }

    /// # Errors
    ///
    /// See [`OrderStore::toggle`].
    pub fn toggle_delivered(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.toggle(id, Toggle::Delivered)
    }

    /// # Errors
    ///
    /// See [`OrderStore::hide`].
    pub fn hide(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.lock().hide(id)
    }

    /// # Errors
    ///
    /// See [`OrderStore::restore`].
    pub fn restore(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.lock().restore(id)
    }

    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the preference cannot be read.
    pub fn theme(&self) -> Result<String, OrderError> {
        self.lock().local().theme()
    }

    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] for a blank theme, or
    /// [`OrderError::Storage`] if the write fails.
    pub fn set_theme(&self, theme: &str) -> Result<(), OrderError> {
        self.lock().local().set_theme(theme)?;
        info!(theme, "theme saved");
        Ok(())
    }

    /// Run a retention sweep unless one is already in progress.
    ///
    /// Returns `Ok(None)` when skipped because another sweep holds the guard.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if persisting fails.
    pub fn sweep(&self) -> Result<Option<SweepReport>, OrderError> {
        let Some(_permit) = self.sweep_guard.try_enter() else {
            info!("retention sweep already running, skipping");
            return Ok(None);
        };
        self.lock().sweep(&self.policy).map(Some)
    }

    /// Fetch the remote snapshot. Does not touch local state.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Transport`] when no source is configured or the
    /// fetch fails, [`OrderError::MalformedSnapshot`] for a bad payload.
    pub fn fetch_remote(&self) -> Result<RemoteSnapshot, OrderError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| OrderError::Transport("no remote source configured".into()))?;
        source.fetch()
    }

    /// Merge a fetched snapshot into the state current at call time, then
    /// drop whatever the merge brought in past the retention window.
    ///
    /// Both steps run under one lock hold, so an order the remote still
    /// carries after it expired here is never visible locally or pushed back.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if persisting fails.
    pub fn apply_remote(
        &self,
        remote: Snapshot,
    ) -> Result<(ReconcileReport, SweepReport), OrderError> {
        let mut store = self.lock();
        let merged = store.reconcile(remote)?;
        let swept = store.sweep(&self.policy)?;
        Ok((merged, swept))
    }

    /// Upload the current snapshot as the successor of revision `base`.
    ///
    /// Returns `Ok(false)` when there is no sink.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Transport`] if the upload fails or the remote
    /// moved past `base`.
    pub fn push_onto(&self, base: Option<&str>) -> Result<bool, OrderError> {
        let Some(sink) = self.sink.as_ref() else {
            return Ok(false);
        };
        let snapshot = self.snapshot();
        sink.push(&snapshot, base)?;
        info!(orders = snapshot.len(), "snapshot pushed");
        Ok(true)
    }

    /// Merge the outcome of a fetch the caller already made.
    ///
    /// `None` means there was nothing to fetch from. A failed fetch is
    /// recorded in [`SyncReport::errors`] and leaves local state as it was.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the merged state cannot be saved.
    pub fn pull(
        &self,
        fetched: Option<Result<RemoteSnapshot, OrderError>>,
    ) -> Result<SyncReport, OrderError> {
        let mut report = SyncReport::default();
        match fetched {
            None => {}
            Some(Ok(remote)) => {
                let (merged, swept) = self.apply_remote(remote.snapshot)?;
                report.pulled = true;
                report.merged = Some(merged);
                report.swept = swept.removed;
                report.revision = remote.revision;
            }
            Some(Err(err)) => {
                warn!(error = %err, "remote fetch failed, continuing offline");
                report.errors.push(format!("pull: {err}"));
            }
        }
        Ok(report)
    }

    /// Push on top of the revision `report` pulled.
    ///
    /// Skipped when a source is configured but the pull failed: the remote
    /// revision is unknown and pushing would overwrite records never seen.
    pub fn push_after(&self, report: &mut SyncReport) {
        if !self.can_push() {
            return;
        }
        if self.source.is_some() && !report.pulled {
            report
                .errors
                .push("push: skipped, remote state unknown".to_string());
            return;
        }
        match self.push_onto(report.revision.as_deref()) {
            Ok(pushed) => report.pushed = pushed,
            Err(err) => {
                warn!(error = %err, "remote push failed, continuing offline");
                report.errors.push(format!("push: {err}"));
            }
        }
    }

    /// Pull, merge, then push.
    ///
    /// Remote failures land in [`SyncReport::errors`] and leave local state
    /// as it was; only a local storage failure is returned as an error.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the merged state cannot be saved.
    pub fn sync_now(&self, push: bool) -> Result<SyncReport, OrderError> {
        let fetched = self.source.as_ref().map(|source| source.fetch());
        let mut report = self.pull(fetched)?;
        if push {
            self.push_after(&mut report);
        }
        Ok(report)
    }
}

impl<S, C> OrderDesk<S, C>
where
    S: KeyValueStorage + 'static,
    C: Clock + 'static,
{
    /// Sweep on a background thread every `interval` until stopped.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, interval: StdDuration) -> PeriodicTask {
        let desk = Arc::clone(self);
        PeriodicTask::spawn(interval, move || {
            if let Err(err) = desk.sweep() {
                warn!(error = %err, "periodic retention sweep failed");
            }
            ControlFlow::Continue(())
        })
    }
}
