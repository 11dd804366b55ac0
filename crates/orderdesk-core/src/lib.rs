//! orderdesk-core: order records, their lifecycle, the retention sweep, and
//! last-writer-wins reconciliation against a remote snapshot.
//!
//! # Conventions
//!
//! - **Errors**: [`error::OrderError`] (thiserror) inside the store; `anyhow`
//!   with context at configuration and application edges.
//! - **Logging**: `tracing` macros only; subscribers are installed by the
//!   binary.
//! - **Time**: every timestamp comes from a [`clock::Clock`], so tests drive
//!   time with [`clock::ManualClock`].

pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod model;
pub mod retention;
pub mod storage;
pub mod store;
pub mod sync;

pub use desk::{OrderDesk, SyncReport};
pub use error::{ErrorCode, OrderError};
pub use lifecycle::OrderStore;
pub use model::order::{Collection, NewOrder, Order, OrderId, Toggle};
pub use model::snapshot::Snapshot;
