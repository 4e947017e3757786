//! Host-side persistence contracts consumed by the desktop session engine.
//!
//! The engine treats storage as an opaque key-value blob store. This crate defines that
//! boundary: a versioned JSON envelope, the object-safe [`EnvelopeStore`] trait with an
//! in-memory implementation, and typed save/load helpers that route old schemas through a
//! caller-supplied migration.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod storage;
pub mod time;

pub use error::StoreError;
pub use storage::envelope::{
    load_versioned, save_versioned, StateEnvelope, DESKTOP_SESSION_NAMESPACE,
    ENVELOPE_FORMAT_VERSION,
};
pub use storage::store::{EnvelopeStore, MemoryEnvelopeStore, StoreFuture};
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now};
