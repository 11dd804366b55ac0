//! The `{visible, hidden}` pair of order collections and its JSON codec.
//!
//! # Wire format
//!
//! Encoding always produces `{"orders": [...], "hiddenOrders": [...]}`.
//! Decoding additionally accepts `{"visible": [...], "hidden": [...]}` and a
//! flat array of records (partitioned by each record's `hidden` flag), which
//! is what older replicas pushed.
//!
//! Decoded snapshots are normalised: `hidden` always agrees with the
//! collection a record sits in, and duplicate ids collapse by
//! last-writer-wins on `lastModified`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::OrderError;
use crate::model::order::{Collection, Order, OrderId};

/// Both order partitions. An id appears at most once across the pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub visible: Vec<Order>,
    pub hidden: Vec<Order>,
}

/// What happened to one incoming record during a last-writer-wins merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorb {
    /// The id was unknown locally; the record was added.
    Inserted,
    /// The incoming copy was newer and replaced the local one.
    Updated { moved: bool },
    /// The local copy was at least as new; the incoming one was dropped.
    Discarded,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut<'a> {
    orders: &'a [Order],
    hidden_orders: &'a [Order],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotIn {
    #[serde(default, alias = "visible")]
    orders: Vec<Order>,
    #[serde(default, alias = "hidden")]
    hidden_orders: Vec<Order>,
}

impl Snapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.hidden.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visible.len() + self.hidden.len()
    }

    #[must_use]
    pub fn collection(&self, which: Collection) -> &[Order] {
        match which {
            Collection::Visible => &self.visible,
            Collection::Hidden => &self.hidden,
        }
    }

    pub(crate) fn collection_mut(&mut self, which: Collection) -> &mut Vec<Order> {
        match which {
            Collection::Visible => &mut self.visible,
            Collection::Hidden => &mut self.hidden,
        }
    }

    /// Find which collection holds `id`, and at what index.
    #[must_use]
    pub fn locate(&self, id: &OrderId) -> Option<(Collection, usize)> {
        [Collection::Visible, Collection::Hidden]
            .into_iter()
            .find_map(|which| {
                self.collection(which)
                    .iter()
                    .position(|order| &order.id == id)
                    .map(|idx| (which, idx))
            })
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<(Collection, &Order)> {
        self.locate(id)
            .map(|(which, idx)| (which, &self.collection(which)[idx]))
    }

    #[must_use]
    pub fn contains(&self, id: &OrderId) -> bool {
        self.locate(id).is_some()
    }

    /// All orders, visible first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.visible.iter().chain(self.hidden.iter())
    }

    /// Merge one record by whole-record last-writer-wins on `lastModified`.
    ///
    /// A newer copy replaces the local one in place, or moves between
    /// collections when its `hidden` flag differs. Ties keep the local copy.
    pub fn absorb(&mut self, incoming: Order) -> Absorb {
        let Some((current, idx)) = self.locate(&incoming.id) else {
            self.collection_mut(incoming.collection()).push(incoming);
            return Absorb::Inserted;
        };

        if incoming.last_modified <= self.collection(current)[idx].last_modified {
            return Absorb::Discarded;
        }

        let target = incoming.collection();
        if target == current {
            self.collection_mut(current)[idx] = incoming;
            Absorb::Updated { moved: false }
        } else {
            self.collection_mut(current).remove(idx);
            self.collection_mut(target).push(incoming);
            Absorb::Updated { moved: true }
        }
    }

    /// Decode a snapshot from any accepted JSON shape.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::MalformedSnapshot`] if the payload is not JSON or
    /// does not match the order schema.
    pub fn from_json(bytes: &[u8]) -> Result<Self, OrderError> {
        let value: JsonValue = serde_json::from_slice(bytes)
            .map_err(|err| OrderError::MalformedSnapshot(err.to_string()))?;

        let (visible, hidden): (Vec<Order>, Vec<Order>) = if value.is_array() {
            let flat: Vec<Order> = serde_json::from_value(value)
                .map_err(|err| OrderError::MalformedSnapshot(err.to_string()))?;
            flat.into_iter().partition(|order| !order.hidden)
        } else {
            let split: SnapshotIn = serde_json::from_value(value)
                .map_err(|err| OrderError::MalformedSnapshot(err.to_string()))?;
            (split.orders, split.hidden_orders)
        };

        let mut snapshot = Self::default();
        for (which, orders) in [(Collection::Visible, visible), (Collection::Hidden, hidden)] {
            for mut order in orders {
                order.normalize(which);
                snapshot.absorb(order);
            }
        }
        Ok(snapshot)
    }

    /// Encode as pretty-printed `{"orders", "hiddenOrders"}` JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::MalformedSnapshot`] if serialization fails.
    pub fn to_json(&self) -> Result<String, OrderError> {
        serde_json::to_string_pretty(&SnapshotOut {
            orders: &self.visible,
            hidden_orders: &self.hidden,
        })
        .map_err(|err| OrderError::MalformedSnapshot(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order::NewOrder;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn order(id: &str, modified: i64) -> Order {
        let mut order = Order::new(
            OrderId::from(id),
            NewOrder {
                customer_name: format!("customer {id}"),
                phone_number: "555".into(),
                product_type: "Pizza".into(),
                observations: String::new(),
            },
            at(0),
        );
        order.last_modified = at(modified);
        order
    }

    #[test]
    fn absorb_inserts_unknown_id_into_flagged_collection() {
        let mut snap = Snapshot::default();
        let mut hidden = order("a", 5);
        hidden.hidden = true;
        assert_eq!(snap.absorb(hidden), Absorb::Inserted);
        assert_eq!(snap.hidden.len(), 1);
        assert!(snap.visible.is_empty());
    }

    #[test]
    fn absorb_keeps_local_on_tie() {
        let mut snap = Snapshot::default();
        snap.absorb(order("a", 5));
        let mut rival = order("a", 5);
        rival.paid = true;
        assert_eq!(snap.absorb(rival), Absorb::Discarded);
        assert!(!snap.visible[0].paid);
    }

    #[test]
    fn absorb_replaces_in_place_when_newer() {
        let mut snap = Snapshot::default();
        snap.absorb(order("a", 1));
        snap.absorb(order("b", 1));
        let mut newer = order("a", 9);
        newer.paid = true;
        assert_eq!(snap.absorb(newer), Absorb::Updated { moved: false });
        assert_eq!(snap.visible[0].id.as_str(), "a");
        assert!(snap.visible[0].paid);
    }

    #[test]
    fn absorb_moves_between_collections() {
        let mut snap = Snapshot::default();
        snap.absorb(order("a", 1));
        let mut archived = order("a", 2);
        archived.hidden = true;
        assert_eq!(snap.absorb(archived), Absorb::Updated { moved: true });
        assert!(snap.visible.is_empty());
        assert_eq!(snap.hidden.len(), 1);
    }

    #[test]
    fn decodes_split_legacy_shape_and_marks_hidden() {
        let raw = r#"{
            "orders": [{"id":"1","customerName":"Ana","phoneNumber":"555",
                        "orderType":"Pizza","creationDate":"2024-01-01T00:00:00Z"}],
            "hiddenOrders": [{"id":"2","customerName":"Bo","phoneNumber":"556",
                        "orderType":"Pasta","creationDate":"2024-01-01T00:00:00Z"}]
        }"#;
        let snap = Snapshot::from_json(raw.as_bytes()).expect("parse");
        assert_eq!(snap.visible.len(), 1);
        assert_eq!(snap.hidden.len(), 1);
        assert!(snap.hidden[0].hidden);
        assert!(!snap.visible[0].hidden);
    }

    #[test]
    fn decodes_visible_hidden_aliases() {
        let raw = r#"{"visible": [], "hidden": []}"#;
        let snap = Snapshot::from_json(raw.as_bytes()).expect("parse");
        assert!(snap.is_empty());
    }

    #[test]
    fn decodes_flat_array_by_flag() {
        let mut archived = order("b", 2);
        archived.hidden = true;
        let raw = serde_json::to_vec(&vec![order("a", 1), archived]).expect("serialize");
        let snap = Snapshot::from_json(&raw).expect("parse");
        assert_eq!(snap.visible[0].id.as_str(), "a");
        assert_eq!(snap.hidden[0].id.as_str(), "b");
    }

    #[test]
    fn decode_collapses_duplicate_ids() {
        let mut newer = order("a", 7);
        newer.paid = true;
        let raw = serde_json::to_vec(&vec![order("a", 1), newer]).expect("serialize");
        let snap = Snapshot::from_json(&raw).expect("parse");
        assert_eq!(snap.len(), 1);
        assert!(snap.visible[0].paid);
    }

    #[test]
    fn decode_drops_stray_delivered_at() {
        let mut stray = order("a", 1);
        stray.delivered_at = Some(at(3));
        let raw = serde_json::to_vec(&vec![stray]).expect("serialize");
        let snap = Snapshot::from_json(&raw).expect("parse");
        assert_eq!(snap.visible[0].delivered_at, None);
    }

    #[test]
    fn rejects_garbage() {
        let err = Snapshot::from_json(b"{not json").expect_err("must fail");
        assert!(matches!(err, OrderError::MalformedSnapshot(_)));

        let err = Snapshot::from_json(br#"{"orders": [{"id": 3}]}"#).expect_err("must fail");
        assert!(matches!(err, OrderError::MalformedSnapshot(_)));
    }

    #[test]
    fn encoding_uses_canonical_keys() {
        let mut snap = Snapshot::default();
        snap.absorb(order("a", 1));
        let json = snap.to_json().expect("encode");
        let value: JsonValue = serde_json::from_str(&json).expect("valid json");
        assert!(value["orders"].is_array());
        assert!(value["hiddenOrders"].is_array());
        assert_eq!(Snapshot::from_json(json.as_bytes()).expect("decode"), snap);
    }
}
