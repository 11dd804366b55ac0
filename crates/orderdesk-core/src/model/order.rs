use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::OrderError;

/// Opaque order identifier, unique across the visible and hidden sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id derived from a creation instant, in milliseconds since the epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }
}

impl From<&str> for OrderId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for OrderId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two partitions an order can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Visible,
    Hidden,
}

impl Collection {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer order with its status fields.
///
/// Decoding also accepts the field names written by the browser widget this
/// data model grew out of (`orderType`, `creationDate`, `deliveryDate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub phone_number: String,
    #[serde(alias = "orderType")]
    pub product_type: String,
    #[serde(default)]
    pub observations: String,
    #[serde(alias = "creationDate")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default, alias = "deliveryDate")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hidden: bool,
    /// Unix epoch when absent, so any edited copy supersedes it.
    #[serde(default)]
    pub last_modified: DateTime<Utc>,
}

impl Order {
    /// Build a fresh visible, unpaid, undelivered order.
    #[must_use]
    pub fn new(id: OrderId, fields: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_name: fields.customer_name,
            phone_number: fields.phone_number,
            product_type: fields.product_type,
            observations: fields.observations,
            created_at: now,
            paid: false,
            delivered: false,
            delivered_at: None,
            hidden: false,
            last_modified: now,
        }
    }

    /// The collection this record's `hidden` flag names.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        if self.hidden {
            Collection::Hidden
        } else {
            Collection::Visible
        }
    }

    /// Refresh `lastModified` for a local edit.
    ///
    /// The stamp strictly increases even if the clock stalls or steps back.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.last_modified + Duration::milliseconds(1);
        self.last_modified = now.max(floor);
    }

    /// Align `hidden` with the collection the record was decoded from and
    /// drop a `deliveredAt` left on an undelivered record.
    pub(crate) fn normalize(&mut self, collection: Collection) {
        self.hidden = collection == Collection::Hidden;
        if !self.delivered {
            self.delivered_at = None;
        }
    }
}

/// The status flags a staff member can flip on a visible order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    Paid,
    Delivered,
}

impl Toggle {
    /// Flip the flag on `order`, keeping `deliveredAt` in step with `delivered`.
    pub fn apply(self, order: &mut Order, now: DateTime<Utc>) {
        match self {
            Self::Paid => order.paid = !order.paid,
            Self::Delivered => {
                order.delivered = !order.delivered;
                order.delivered_at = order.delivered.then_some(now);
            }
        }
        order.touch(now);
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paid => f.write_str("paid"),
            Self::Delivered => f.write_str("delivered"),
        }
    }
}

/// Input fields for a new order, as entered on the order form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_name: String,
    pub phone_number: String,
    pub product_type: String,
    #[serde(default)]
    pub observations: String,
}

impl NewOrder {
    /// Reject the form if any required field is blank.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), OrderError> {
        let required = [
            ("customerName", &self.customer_name),
            ("phoneNumber", &self.phone_number),
            ("productType", &self.product_type),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(OrderError::Validation { field });
            }
        }
        Ok(())
    }
}
