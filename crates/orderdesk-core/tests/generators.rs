use chrono::{DateTime, TimeZone, Utc};
use orderdesk_core::{NewOrder, Order, OrderId, Snapshot};
use proptest::prelude::*;

pub const MAX_ID: u8 = 8;
pub const MAX_REVISION: i64 = 20;

pub fn at_secs(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid timestamp")
}

/// A record fully determined by `(id, revision)`.
///
/// Equal stamps therefore always mean equal records, which is what a
/// last-writer-wins union needs to be well defined.
pub fn revision(id: u8, rev: i64) -> Order {
    let mut order = Order::new(
        OrderId::from(format!("order-{id}")),
        NewOrder {
            customer_name: format!("Customer {id}"),
            phone_number: "555".into(),
            product_type: "Pizza".into(),
            observations: format!("rev {rev}"),
        },
        at_secs(0),
    );
    order.paid = rev % 2 == 0;
    order.delivered = rev % 4 == 0;
    order.delivered_at = order.delivered.then(|| at_secs(rev * 86_400));
    order.hidden = rev % 3 == 0;
    order.last_modified = at_secs(rev);
    order
}

pub fn arb_order() -> impl Strategy<Value = Order> + Clone {
    (0..MAX_ID, 0..MAX_REVISION).prop_map(|(id, rev)| revision(id, rev))
}

pub fn arb_snapshot() -> impl Strategy<Value = Snapshot> + Clone {
    prop::collection::vec(arb_order(), 0..12).prop_map(|orders| {
        let mut snapshot = Snapshot::default();
        for order in orders {
            snapshot.absorb(order);
        }
        snapshot
    })
}

/// Id-sorted copy, so comparisons ignore insertion order.
pub fn canonical(snapshot: &Snapshot) -> Snapshot {
    let mut sorted = snapshot.clone();
    sorted.visible.sort_by(|a, b| a.id.cmp(&b.id));
    sorted.hidden.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
}
