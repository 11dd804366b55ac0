//! Merge a fetched remote snapshot into local state.
//!
//! # Merge Semantics
//!
//! Whole-record last-writer-wins keyed by `lastModified`. For each remote
//! record:
//!
//! 1. Unknown id: insert it into the collection its `hidden` flag names.
//! 2. Known id, remote strictly newer: replace the local record in place,
//!    moving it between visible and hidden if the flag differs.
//! 3. Known id, local at least as new: keep local.
//!
//! Local-only records are never deleted. The remote snapshot is treated as a
//! possibly stale subset, not as authority for removals.
//!
//! Because each id converges to the copy with the greatest `lastModified`,
//! reconciling snapshots one after another gives the same result as
//! reconciling their last-writer-wins union, in any order.

use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::OrderError;
use crate::lifecycle::OrderStore;
use crate::model::snapshot::{Absorb, Snapshot};
use crate::storage::KeyValueStorage;

/// Counts of what a reconcile pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Remote records whose id was unknown locally.
    pub inserted: usize,
    /// Local records replaced by a newer remote copy (includes `moved`).
    pub updated: usize,
    /// Updated records that also switched between visible and hidden.
    pub moved: usize,
    /// Remote records dropped because the local copy was at least as new.
    pub discarded: usize,
}

impl ReconcileReport {
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.inserted + self.updated > 0
    }
}

/// Fold every record of `remote` into `local`.
pub fn reconcile(local: &mut Snapshot, remote: Snapshot) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for order in remote.visible.into_iter().chain(remote.hidden) {
        let id = order.id.clone();
        match local.absorb(order) {
            Absorb::Inserted => {
                debug!(%id, "remote order inserted");
                report.inserted += 1;
            }
            Absorb::Updated { moved } => {
                debug!(%id, moved, "remote order is newer");
                report.updated += 1;
                if moved {
                    report.moved += 1;
                }
            }
            Absorb::Discarded => {
                debug!(%id, "local order is at least as new");
                report.discarded += 1;
            }
        }
    }
    report
}

impl<S: KeyValueStorage, C: Clock> OrderStore<S, C> {
    /// Merge `remote` into the current state and persist if anything changed.
    ///
    /// The merge reads the store's state at call time, so edits made while a
    /// fetch was in flight are merged against, not overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if persisting fails; memory is then
    /// left unchanged.
    pub fn reconcile(&mut self, remote: Snapshot) -> Result<ReconcileReport, OrderError> {
        let mut next = self.snapshot().clone();
        let report = reconcile(&mut next, remote);
        if report.changed() {
            self.commit(next)?;
        }
        info!(
            inserted = report.inserted,
            updated = report.updated,
            moved = report.moved,
            discarded = report.discarded,
            "remote snapshot reconciled"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::order::{NewOrder, Order, OrderId};
    use crate::storage::MemoryStorage;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().expect("valid timestamp")
    }

    fn order(id: &str, last_modified: i64) -> Order {
        let mut order = Order::new(
            OrderId::from(id),
            NewOrder {
                customer_name: "Ana".into(),
                phone_number: "555".into(),
                product_type: "Pizza".into(),
                observations: String::new(),
            },
            at(0),
        );
        order.last_modified = at(last_modified);
        order
    }

    fn snapshot(visible: Vec<Order>, hidden: Vec<Order>) -> Snapshot {
        Snapshot { visible, hidden }
    }

    #[test]
    fn older_remote_loses_to_local() {
        let mut local = snapshot(vec![order("x", 100)], vec![]);
        let mut remote_copy = order("x", 50);
        remote_copy.paid = true;

        let report = reconcile(&mut local, snapshot(vec![remote_copy], vec![]));
        assert_eq!(report.discarded, 1);
        assert!(!local.visible[0].paid);
    }

    #[test]
    fn newer_remote_overwrites_in_place() {
        let mut local = snapshot(vec![order("x", 100), order("y", 100)], vec![]);
        let mut remote_copy = order("x", 150);
        remote_copy.paid = true;

        let report = reconcile(&mut local, snapshot(vec![remote_copy], vec![]));
        assert_eq!(report.updated, 1);
        assert_eq!(local.visible[0].id.as_str(), "x");
        assert!(local.visible[0].paid);
    }

    #[test]
    fn newer_remote_hide_moves_record() {
        let mut local = snapshot(vec![order("x", 100)], vec![]);
        let mut remote_copy = order("x", 200);
        remote_copy.hidden = true;

        let report = reconcile(&mut local, snapshot(vec![], vec![remote_copy]));
        assert_eq!(report.moved, 1);
        assert!(local.visible.is_empty());
        assert_eq!(local.hidden[0].id.as_str(), "x");
    }

    #[test]
    fn local_only_records_survive() {
        let mut local = snapshot(vec![order("mine", 1)], vec![order("archived", 1)]);
        local.hidden[0].hidden = true;
        reconcile(&mut local, snapshot(vec![order("theirs", 1)], vec![]));
        assert_eq!(local.len(), 3);
        assert!(local.contains(&OrderId::from("mine")));
        assert!(local.contains(&OrderId::from("archived")));
    }

    #[test]
    fn reconcile_twice_is_idempotent() {
        let remote = snapshot(vec![order("a", 5), order("b", 7)], vec![]);
        let mut local = Snapshot::default();
        reconcile(&mut local, remote.clone());
        let once = local.clone();
        let report = reconcile(&mut local, remote);
        assert!(!report.changed());
        assert_eq!(local, once);
    }

    #[test]
    fn store_reconcile_persists_merge() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(at(1_000));
        let mut store = OrderStore::open(storage.clone(), clock.clone()).expect("open");
        let report = store
            .reconcile(snapshot(vec![order("remote", 10)], vec![]))
            .expect("reconcile");
        assert_eq!(report.inserted, 1);

        let reopened = OrderStore::open(storage, clock).expect("reopen");
        assert!(reopened.get(&OrderId::from("remote")).is_some());
    }
}
