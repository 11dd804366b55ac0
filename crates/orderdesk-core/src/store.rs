//! Local persistence of the order snapshot and the display theme.

use tracing::{debug, warn};

use crate::error::OrderError;
use crate::model::snapshot::Snapshot;
use crate::storage::KeyValueStorage;

/// Storage key holding both order collections.
pub const ORDERS_KEY: &str = "orders";
/// Storage key holding the selected display theme.
pub const THEME_KEY: &str = "theme";
/// Theme reported when none was ever saved.
pub const DEFAULT_THEME: &str = "light";

/// Snapshot load/save over a [`KeyValueStorage`].
#[derive(Debug, Clone)]
pub struct LocalStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> LocalStore<S> {
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Last persisted snapshot, or an empty one.
    ///
    /// An unparseable payload counts as "no data" and is logged, not raised.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] only if the backend itself fails.
    pub fn load(&self) -> Result<Snapshot, OrderError> {
        let Some(raw) = self.storage.get(ORDERS_KEY)? else {
            debug!("no persisted orders, starting empty");
            return Ok(Snapshot::default());
        };

        match Snapshot::from_json(raw.as_bytes()) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                warn!(error = %err, "persisted orders are unreadable, starting empty");
                Ok(Snapshot::default())
            }
        }
    }

    /// Overwrite the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the write fails.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), OrderError> {
        let json = snapshot.to_json()?;
        self.storage.set(ORDERS_KEY, &json)?;
        debug!(
            visible = snapshot.visible.len(),
            hidden = snapshot.hidden.len(),
            "orders saved"
        );
        Ok(())
    }

    /// The saved theme name, or [`DEFAULT_THEME`].
    ///
    /// The value is stored as a JSON string; bare text from older data
    /// directories is read as-is.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the backend fails.
    pub fn theme(&self) -> Result<String, OrderError> {
        Ok(self
            .storage
            .get(THEME_KEY)?
            .map(|raw| serde_json::from_str::<String>(&raw).unwrap_or(raw))
            .map(|theme| theme.trim().to_string())
            .filter(|theme| !theme.is_empty())
            .unwrap_or_else(|| DEFAULT_THEME.to_string()))
    }

    /// Persist a theme name. Any non-empty string is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] for a blank name or
    /// [`OrderError::Storage`] if the write fails.
    pub fn set_theme(&self, theme: &str) -> Result<(), OrderError> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(OrderError::Validation { field: "theme" });
        }
        let encoded = serde_json::Value::from(theme).to_string();
        self.storage.set(THEME_KEY, &encoded)
    }
}
