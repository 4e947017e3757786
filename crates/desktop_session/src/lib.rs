//! Headless state engine for a retro desktop session: windows, a hierarchical icon tree,
//! clipboard transfers, selection, and validated snapshots for persistence.

pub mod command;
pub mod config;
pub mod error;
pub mod icon_tree;
pub mod ids;
pub mod model;
pub mod persistence;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod transfer;
pub mod window_registry;

pub use command::{CommandOutcome, SessionCommand};
pub use config::{CascadeConfig, IconGridConfig, SessionConfig};
pub use error::{ConfigError, PersistenceError, SessionError, SessionId, SessionResult};
pub use model::*;
pub use persistence::{
    clear_session_snapshot, load_session_snapshot, persist_session_snapshot, restore_session,
};
pub use session::{ChangeListener, DesktopSession};
pub use snapshot::{FolderIndexEntry, SessionSnapshot};
pub use transfer::{copy_label, suffixed_label, Clipboard, PasteReport};
