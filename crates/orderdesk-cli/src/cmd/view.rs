//! How a single order is printed.

use crate::output::{Renderable, pretty_kv, pretty_section};
use chrono::{DateTime, Local, Utc};
use orderdesk_core::{Collection, Order};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub collection: Collection,
    #[serde(flatten)]
    pub order: Order,
}

impl OrderView {
    pub const fn new(collection: Collection, order: Order) -> Self {
        Self { collection, order }
    }

    pub fn all(collection: Collection, orders: Vec<Order>) -> Vec<Self> {
        orders
            .into_iter()
            .map(|order| Self::new(collection, order))
            .collect()
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

impl Renderable for OrderView {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let order = &self.order;
        let mut heading = format!("#{}  {}", order.id, order.customer_name);
        if self.collection == Collection::Hidden {
            heading.push_str("  (hidden)");
        }
        pretty_section(w, &heading)?;
        pretty_kv(w, "Phone", &order.phone_number)?;
        pretty_kv(w, "Product", &order.product_type)?;
        if !order.observations.trim().is_empty() {
            pretty_kv(w, "Observations", &order.observations)?;
        }
        pretty_kv(w, "Created", local_time(order.created_at))?;
        pretty_kv(w, "Paid", yes_no(order.paid))?;
        let delivered = match order.delivered_at {
            Some(at) if order.delivered => format!("yes, {}", local_time(at)),
            _ => yes_no(order.delivered).to_string(),
        };
        pretty_kv(w, "Delivered", delivered)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let order = &self.order;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            order.id,
            self.collection,
            order.customer_name,
            order.phone_number,
            order.product_type,
            yes_no(order.paid),
            yes_no(order.delivered),
            order.created_at.to_rfc3339()
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &[
            "ID", "SET", "CUSTOMER", "PHONE", "PRODUCT", "PAID", "DELIVERED", "CREATED",
        ]
    }
}
