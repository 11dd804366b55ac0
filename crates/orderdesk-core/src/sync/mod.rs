pub mod reconcile;
pub mod remote;
