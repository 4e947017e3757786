//! Versioned JSON envelope wrapping every persisted payload.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Layout version of [`StateEnvelope`] itself, independent of payload schemas.
pub const ENVELOPE_FORMAT_VERSION: u32 = 1;
/// Namespace holding the desktop session snapshot.
pub const DESKTOP_SESSION_NAMESPACE: &str = "system.desktop-session";

/// A payload stamped with its namespace, schema version and save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Always [`ENVELOPE_FORMAT_VERSION`] for envelopes written by this crate.
    pub format_version: u32,
    /// Owner of the payload, also the storage key.
    pub namespace: String,
    /// Version of the payload layout, chosen by the owner.
    pub schema_version: u32,
    /// Monotonic save time in unix milliseconds.
    pub saved_at_unix_ms: u64,
    /// Payload as JSON.
    pub payload: Value,
}

impl StateEnvelope {
    /// Wraps an already encoded payload.
    pub fn new(namespace: impl Into<String>, schema_version: u32, payload: Value) -> Self {
        Self {
            format_version: ENVELOPE_FORMAT_VERSION,
            namespace: namespace.into(),
            schema_version,
            saved_at_unix_ms: crate::time::next_monotonic_timestamp_ms(),
            payload,
        }
    }

    /// Encodes `payload` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] when `payload` has no JSON representation.
    pub fn encode<T: Serialize>(
        namespace: &str,
        schema_version: u32,
        payload: &T,
    ) -> Result<Self, StoreError> {
        let payload = serde_json::to_value(payload).map_err(|err| StoreError::Encode {
            namespace: namespace.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::new(namespace, schema_version, payload))
    }

    /// Decodes the payload as `T` without looking at the schema version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] when the payload does not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        T::deserialize(&self.payload).map_err(|err| StoreError::Decode {
            namespace: self.namespace.clone(),
            reason: err.to_string(),
        })
    }

    fn check_format(&self) -> Result<(), StoreError> {
        if self.format_version == ENVELOPE_FORMAT_VERSION {
            Ok(())
        } else {
            Err(StoreError::UnsupportedFormat {
                namespace: self.namespace.clone(),
                found: self.format_version,
            })
        }
    }
}

/// Encodes `payload` and saves it under `namespace`, replacing what was there.
///
/// # Errors
///
/// Propagates encoding and backend failures.
pub async fn save_versioned<T: Serialize>(
    store: &dyn crate::storage::store::EnvelopeStore,
    namespace: &str,
    schema_version: u32,
    payload: &T,
) -> Result<(), StoreError> {
    let envelope = StateEnvelope::encode(namespace, schema_version, payload)?;
    store.save(&envelope).await
}

/// Loads the payload stored under `namespace`.
///
/// A payload at `current_schema` decodes directly. An older one is handed to `migrate`, which
/// may upgrade it or return `None` to discard it. A newer one is discarded with a warning, so
/// a downgraded host starts clean instead of misreading state.
///
/// # Errors
///
/// Propagates backend failures, unknown envelope formats, and decode or migration failures.
pub async fn load_versioned<T, F>(
    store: &dyn crate::storage::store::EnvelopeStore,
    namespace: &str,
    current_schema: u32,
    migrate: F,
) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    F: FnOnce(u32, &StateEnvelope) -> Result<Option<T>, StoreError>,
{
    let Some(envelope) = store.load(namespace).await? else {
        return Ok(None);
    };
    envelope.check_format()?;

    match envelope.schema_version.cmp(&current_schema) {
        std::cmp::Ordering::Equal => envelope.decode().map(Some),
        std::cmp::Ordering::Less => migrate(envelope.schema_version, &envelope),
        std::cmp::Ordering::Greater => {
            log::warn!(
                "discarding `{namespace}` written by schema {} (this build reads {current_schema})",
                envelope.schema_version
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::storage::store::{EnvelopeStore, MemoryEnvelopeStore};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Layout {
        panes: u32,
    }

    fn seed(store: &MemoryEnvelopeStore, schema_version: u32, payload: Value) {
        let envelope = StateEnvelope::new("layout", schema_version, payload);
        block_on(store.save(&envelope)).expect("seed");
    }

    #[test]
    fn envelope_fields_serialize_in_snake_case() {
        let envelope = StateEnvelope {
            saved_at_unix_ms: 77,
            ..StateEnvelope::new("layout", 3, json!({"panes": 2}))
        };
        assert_eq!(
            serde_json::to_value(&envelope).expect("encode"),
            json!({
                "format_version": 1,
                "namespace": "layout",
                "schema_version": 3,
                "saved_at_unix_ms": 77,
                "payload": {"panes": 2},
            })
        );
    }

    #[test]
    fn decode_mismatch_names_the_namespace() {
        let envelope = StateEnvelope::new("layout", 1, json!({"panes": "two"}));
        let err = envelope.decode::<Layout>().expect_err("wrong type");
        assert!(matches!(err, StoreError::Decode { ref namespace, .. } if namespace == "layout"));
    }

    #[test]
    fn current_schema_round_trips() {
        let store = MemoryEnvelopeStore::default();
        block_on(save_versioned(&store, "layout", 2, &Layout { panes: 4 })).expect("save");

        let loaded: Option<Layout> = block_on(load_versioned(&store, "layout", 2, |_, _| {
            panic!("current schema is decoded directly")
        }))
        .expect("load");
        assert_eq!(loaded, Some(Layout { panes: 4 }));
    }

    #[test]
    fn older_schema_goes_through_migration() {
        let store = MemoryEnvelopeStore::default();
        seed(&store, 1, json!({"pane_count": 6}));

        let loaded = block_on(load_versioned(&store, "layout", 2, |version, envelope| {
            assert_eq!(version, 1);
            let panes = envelope.payload["pane_count"].as_u64().unwrap_or_default() as u32;
            Ok(Some(Layout { panes }))
        }))
        .expect("load");
        assert_eq!(loaded, Some(Layout { panes: 6 }));
    }

    #[test]
    fn newer_schema_is_discarded() {
        let store = MemoryEnvelopeStore::default();
        seed(&store, 9, json!({"panes": 1}));

        let loaded: Option<Layout> =
            block_on(load_versioned(&store, "layout", 2, |_, _| Ok(None))).expect("load");
        assert_eq!(loaded, None);
    }

    #[test]
    fn unknown_envelope_format_is_an_error() {
        let store = MemoryEnvelopeStore::default();
        let mut envelope = StateEnvelope::new("layout", 2, json!({"panes": 1}));
        envelope.format_version = 5;
        block_on(store.save(&envelope)).expect("seed");

        let err = block_on(load_versioned::<Layout, _>(&store, "layout", 2, |_, _| Ok(None)))
            .expect_err("format");
        assert_eq!(
            err,
            StoreError::UnsupportedFormat {
                namespace: "layout".to_string(),
                found: 5,
            }
        );
    }
}
