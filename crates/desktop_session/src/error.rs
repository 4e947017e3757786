//! Typed outcomes for rejected session commands.

use std::fmt;

use serde::{Deserialize, Serialize};
use session_host::StoreError;
use thiserror::Error;

use crate::model::{IconId, WindowId};

/// Either kind of engine identifier, used to report unknown references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionId {
    Window(WindowId),
    Icon(IconId),
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window(id) => id.fmt(f),
            Self::Icon(id) => id.fmt(f),
        }
    }
}

impl From<WindowId> for SessionId {
    fn from(id: WindowId) -> Self {
        Self::Window(id)
    }
}

impl From<IconId> for SessionId {
    fn from(id: IconId) -> Self {
        Self::Icon(id)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Recoverable errors returned by structural session commands.
pub enum SessionError {
    /// The requested parent is not a live folder.
    #[error("{parent} is not a live folder")]
    InvalidParent {
        /// Rejected parent.
        parent: IconId,
    },
    /// The move would make an icon its own ancestor.
    #[error("moving {id} into {target} would create a cycle")]
    CycleDetected {
        /// Icon being moved or copied.
        id: IconId,
        /// Requested destination.
        target: IconId,
    },
    /// A non-cascading delete targeted a folder with children.
    #[error("folder {id} is not empty")]
    FolderNotEmpty {
        /// Folder that still has children.
        id: IconId,
    },
    /// The destination already holds an icon with the same label.
    #[error("destination already contains an icon with this name ({existing_id})")]
    NameConflict {
        /// Icon already occupying the label.
        existing_id: IconId,
    },
    /// A command referenced a window or icon that does not exist.
    #[error("unknown id {0}")]
    UnknownId(SessionId),
    /// A snapshot failed structural validation and was not applied.
    #[error("corrupt snapshot: {reason}")]
    CorruptSnapshot {
        /// First violation found.
        reason: String,
    },
    /// System icons such as "My Computer" cannot be moved, cut, copied or deleted.
    #[error("{id} is a system icon")]
    ProtectedIcon {
        /// Protected icon.
        id: IconId,
    },
    /// Workspace bounds must have a positive width and height.
    #[error("workspace bounds must be positive, got {w}x{h}")]
    EmptyWorkspace {
        /// Rejected width.
        w: i32,
        /// Rejected height.
        h: i32,
    },
}

impl SessionError {
    pub(crate) fn unknown(id: impl Into<SessionId>) -> Self {
        Self::UnknownId(id.into())
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptSnapshot {
            reason: reason.into(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
/// Errors raised while parsing a [`crate::config::SessionConfig`].
pub enum ConfigError {
    #[error("invalid session config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("workspace bounds must be positive, got {w}x{h}")]
    EmptyWorkspace { w: i32, h: i32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors raised at the persistence boundary.
pub enum PersistenceError {
    /// The host store failed or the envelope could not be encoded or decoded.
    #[error("session storage failed: {0}")]
    Storage(#[from] StoreError),
    /// The stored snapshot decoded but was rejected by validation.
    #[error(transparent)]
    Session(#[from] SessionError),
}
