//! Errors raised by envelope stores and the typed load/save helpers.

use thiserror::Error;

/// Failure at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing medium rejected the operation.
    #[error("store backend failed: {0}")]
    Backend(String),
    /// A payload could not be converted to JSON.
    #[error("cannot encode `{namespace}` payload: {reason}")]
    Encode {
        /// Namespace being written.
        namespace: String,
        /// Serializer message.
        reason: String,
    },
    /// A stored payload does not match the requested type.
    #[error("cannot decode `{namespace}` payload: {reason}")]
    Decode {
        /// Namespace being read.
        namespace: String,
        /// Deserializer message.
        reason: String,
    },
    /// The envelope was written by an unknown envelope format.
    #[error("unsupported envelope format {found} for `{namespace}`")]
    UnsupportedFormat {
        /// Namespace being read.
        namespace: String,
        /// Format version found in storage.
        found: u32,
    },
}
