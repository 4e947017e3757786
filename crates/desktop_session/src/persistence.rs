//! Saving and restoring sessions through a host [`EnvelopeStore`].

use session_host::{
    load_versioned, save_versioned, EnvelopeStore, StateEnvelope, StoreError,
    DESKTOP_SESSION_NAMESPACE,
};

use crate::config::SessionConfig;
use crate::error::PersistenceError;
use crate::model::SESSION_SNAPSHOT_SCHEMA_VERSION;
use crate::session::DesktopSession;
use crate::snapshot::SessionSnapshot;

/// Writes the current session snapshot under [`DESKTOP_SESSION_NAMESPACE`].
///
/// # Errors
///
/// Returns [`PersistenceError::Storage`] when encoding fails or the store rejects the write.
pub async fn persist_session_snapshot(
    store: &dyn EnvelopeStore,
    session: &DesktopSession,
) -> Result<(), PersistenceError> {
    let snapshot = session.snapshot();
    save_versioned(
        store,
        DESKTOP_SESSION_NAMESPACE,
        SESSION_SNAPSHOT_SCHEMA_VERSION,
        &snapshot,
    )
    .await?;
    log::debug!(
        "persisted session snapshot: {} windows, {} icons",
        snapshot.windows.len(),
        snapshot.icons.len()
    );
    Ok(())
}

/// Loads the persisted snapshot, if any. The snapshot is decoded but not validated.
///
/// # Errors
///
/// Returns [`PersistenceError::Storage`] when the store fails or the payload does not decode.
pub async fn load_session_snapshot(
    store: &dyn EnvelopeStore,
) -> Result<Option<SessionSnapshot>, PersistenceError> {
    let snapshot = load_versioned(
        store,
        DESKTOP_SESSION_NAMESPACE,
        SESSION_SNAPSHOT_SCHEMA_VERSION,
        migrate_session_snapshot,
    )
    .await?;
    Ok(snapshot)
}

/// Builds a session from the persisted snapshot, or a fresh one when nothing is stored.
///
/// # Errors
///
/// Returns [`PersistenceError::Session`] when the stored snapshot fails validation, in
/// addition to the storage errors of [`load_session_snapshot`].
pub async fn restore_session(
    store: &dyn EnvelopeStore,
    config: SessionConfig,
) -> Result<DesktopSession, PersistenceError> {
    match load_session_snapshot(store).await? {
        Some(snapshot) => Ok(DesktopSession::from_snapshot(config, snapshot)?),
        None => Ok(DesktopSession::new(config)),
    }
}

pub async fn clear_session_snapshot(store: &dyn EnvelopeStore) -> Result<(), PersistenceError> {
    store.delete(DESKTOP_SESSION_NAMESPACE).await?;
    Ok(())
}

fn migrate_session_snapshot(
    schema_version: u32,
    _envelope: &StateEnvelope,
) -> Result<Option<SessionSnapshot>, StoreError> {
    log::warn!("no migration from session schema {schema_version}; starting fresh");
    Ok(None)
}
