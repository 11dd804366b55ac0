//! Order lifecycle: create, toggle, hide, restore.
//!
//! Every mutation is computed on a working copy of the snapshot, persisted,
//! and only then committed to memory. A failed write leaves the in-memory
//! state exactly as it was, so memory and storage never disagree.

use tracing::info;

use crate::clock::Clock;
use crate::error::OrderError;
use crate::model::order::{Collection, NewOrder, Order, OrderId, Toggle};
use crate::model::snapshot::Snapshot;
use crate::storage::KeyValueStorage;
use crate::store::LocalStore;

/// The order collections plus their persistence and clock.
#[derive(Debug)]
pub struct OrderStore<S, C> {
    local: LocalStore<S>,
    clock: C,
    snapshot: Snapshot,
}

impl<S: KeyValueStorage, C: Clock> OrderStore<S, C> {
    /// Load the persisted snapshot from `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the backend cannot be read.
    pub fn open(storage: S, clock: C) -> Result<Self, OrderError> {
        let local = LocalStore::new(storage);
        let snapshot = local.load()?;
        Ok(Self {
            local,
            clock,
            snapshot,
        })
    }

    pub const fn local(&self) -> &LocalStore<S> {
        &self.local
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn visible(&self) -> &[Order] {
        &self.snapshot.visible
    }

    #[must_use]
    pub fn hidden(&self) -> &[Order] {
        &self.snapshot.hidden
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<(Collection, &Order)> {
        self.snapshot.get(id)
    }

    /// Persist `next` and adopt it as the current state.
    pub(crate) fn commit(&mut self, next: Snapshot) -> Result<(), OrderError> {
        self.local.save(&next)?;
        self.snapshot = next;
        Ok(())
    }

    /// Validate and append a new visible order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] if a required field is blank, or
    /// [`OrderError::Storage`] if persisting fails.
    pub fn create(&mut self, fields: NewOrder) -> Result<Order, OrderError> {
        fields.validate()?;

        let now = self.clock.now();
        let id = self.allocate_id(now.timestamp_millis());
        let order = Order::new(id, fields, now);

        let mut next = self.snapshot.clone();
        next.visible.push(order.clone());
        self.commit(next)?;

        info!(id = %order.id, customer = %order.customer_name, "order created");
        Ok(order)
    }

    /// Flip `paid` or `delivered` on a visible order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if `id` is not visible, or
    /// [`OrderError::Storage`] if persisting fails.
    pub fn toggle(&mut self, id: &OrderId, toggle: Toggle) -> Result<Order, OrderError> {
        let idx = self.position(id, Collection::Visible)?;
        let now = self.clock.now();

        let mut next = self.snapshot.clone();
        let order = &mut next.visible[idx];
        toggle.apply(order, now);
        let updated = order.clone();
        self.commit(next)?;

        info!(id = %id, %toggle, paid = updated.paid, delivered = updated.delivered, "order toggled");
        Ok(updated)
    }

    /// # Errors
    ///
    /// See [`OrderStore::toggle`].
    pub fn toggle_paid(&mut self, id: &OrderId) -> Result<Order, OrderError> {
        self.toggle(id, Toggle::Paid)
    }

    /// # Errors
    ///
    /// See [`OrderStore::toggle`].
    pub fn toggle_delivered(&mut self, id: &OrderId) -> Result<Order, OrderError> {
        self.toggle(id, Toggle::Delivered)
    }

    /// Archive a visible order into the hidden set.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if `id` is not visible, or
    /// [`OrderError::Storage`] if persisting fails.
    pub fn hide(&mut self, id: &OrderId) -> Result<Order, OrderError> {
        let moved = self.relocate(id, Collection::Visible, Collection::Hidden)?;
        info!(id = %id, "order hidden");
        Ok(moved)
    }

    /// Bring a hidden order back into the visible set.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if `id` is not hidden, or
    /// [`OrderError::Storage`] if persisting fails.
    pub fn restore(&mut self, id: &OrderId) -> Result<Order, OrderError> {
        let moved = self.relocate(id, Collection::Hidden, Collection::Visible)?;
        info!(id = %id, "order restored");
        Ok(moved)
    }

    fn relocate(
        &mut self,
        id: &OrderId,
        from: Collection,
        to: Collection,
    ) -> Result<Order, OrderError> {
        let idx = self.position(id, from)?;
        let now = self.clock.now();

        let mut next = self.snapshot.clone();
        let mut order = next.collection_mut(from).remove(idx);
        order.hidden = to == Collection::Hidden;
        order.touch(now);
        next.collection_mut(to).push(order.clone());
        self.commit(next)?;
        Ok(order)
    }

    fn position(&self, id: &OrderId, expected: Collection) -> Result<usize, OrderError> {
        self.snapshot
            .collection(expected)
            .iter()
            .position(|order| &order.id == id)
            .ok_or_else(|| OrderError::NotFound {
                id: id.clone(),
                collection: expected,
            })
    }

    /// Millisecond-stamp id, stepped forward past any id already in use.
    fn allocate_id(&self, millis: i64) -> OrderId {
        let mut candidate = millis;
        loop {
            let id = OrderId::from_millis(candidate);
            if !self.snapshot.contains(&id) {
                return id;
            }
            candidate += 1;
        }
    }
}
