//! Envelope storage used to persist engine snapshots.

pub mod envelope;
pub mod store;
