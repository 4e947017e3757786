//! Serializable command surface over [`DesktopSession`].
//!
//! View layers that talk to the engine over a message boundary send [`SessionCommand`]
//! values and receive a [`CommandOutcome`]; in-process callers can use the facade methods
//! directly.

use serde::{Deserialize, Serialize};

use crate::error::SessionResult;
use crate::model::{
    ChangeSet, ConflictResolution, IconId, NewIcon, OpenWindowRequest, Point, Rect, Size,
    TransferMode, WindowId,
};
use crate::session::DesktopSession;
use crate::transfer::PasteReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    OpenWindow {
        request: OpenWindowRequest,
    },
    FocusWindow {
        window_id: WindowId,
    },
    MoveWindow {
        window_id: WindowId,
        position: Point,
    },
    ResizeWindow {
        window_id: WindowId,
        size: Size,
    },
    MaximizeWindow {
        window_id: WindowId,
    },
    RestoreWindow {
        window_id: WindowId,
    },
    CloseWindow {
        window_id: WindowId,
    },
    SetWindowTitle {
        window_id: WindowId,
        title: String,
    },
    SetWorkspaceBounds {
        bounds: Rect,
    },
    AddIcon {
        icon: NewIcon,
    },
    CreateFolder {
        parent: Option<IconId>,
    },
    RenameIcon {
        icon_id: IconId,
        label: String,
    },
    RepositionIcon {
        icon_id: IconId,
        position: Point,
    },
    RemoveIcon {
        icon_id: IconId,
        cascade: bool,
    },
    ReparentIcon {
        icon_id: IconId,
        parent: Option<IconId>,
    },
    SelectIcon {
        icon_id: IconId,
        additive: bool,
    },
    ClearSelection,
    StageClipboard {
        mode: TransferMode,
        items: Vec<IconId>,
    },
    StageSelection {
        mode: TransferMode,
    },
    PasteClipboard {
        target: Option<IconId>,
    },
    MoveWithConflictCheck {
        icon_id: IconId,
        target: Option<IconId>,
    },
    ResolveConflict {
        icon_id: IconId,
        target: Option<IconId>,
        resolution: ConflictResolution,
    },
    BeginRename {
        icon_id: IconId,
    },
    CommitRename {
        label: String,
    },
    CancelRename,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Changed(ChangeSet),
    WindowOpened {
        window_id: WindowId,
        changes: ChangeSet,
    },
    IconCreated {
        icon_id: IconId,
        changes: ChangeSet,
    },
    Pasted(PasteReport),
}

impl CommandOutcome {
    pub fn changes(&self) -> &ChangeSet {
        match self {
            Self::Changed(changes)
            | Self::WindowOpened { changes, .. }
            | Self::IconCreated { changes, .. } => changes,
            Self::Pasted(report) => &report.changes,
        }
    }
}

impl DesktopSession {
    /// Applies one command and reports what it changed.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying facade method; the session is unchanged
    /// in that case.
    pub fn dispatch(&mut self, command: SessionCommand) -> SessionResult<CommandOutcome> {
        let outcome = match command {
            SessionCommand::OpenWindow { request } => {
                let window_id = self.open_window(request);
                CommandOutcome::WindowOpened {
                    window_id,
                    changes: ChangeSet::window(window_id),
                }
            }
            SessionCommand::FocusWindow { window_id } => {
                CommandOutcome::Changed(self.focus_window(window_id))
            }
            SessionCommand::MoveWindow {
                window_id,
                position,
            } => CommandOutcome::Changed(self.move_window(window_id, position)?),
            SessionCommand::ResizeWindow { window_id, size } => {
                CommandOutcome::Changed(self.resize_window(window_id, size)?)
            }
            SessionCommand::MaximizeWindow { window_id } => {
                CommandOutcome::Changed(self.maximize_window(window_id)?)
            }
            SessionCommand::RestoreWindow { window_id } => {
                CommandOutcome::Changed(self.restore_window(window_id)?)
            }
            SessionCommand::CloseWindow { window_id } => {
                CommandOutcome::Changed(self.close_window(window_id)?)
            }
            SessionCommand::SetWindowTitle { window_id, title } => {
                CommandOutcome::Changed(self.set_window_title(window_id, title)?)
            }
            SessionCommand::SetWorkspaceBounds { bounds } => {
                CommandOutcome::Changed(self.set_workspace_bounds(bounds)?)
            }
            SessionCommand::AddIcon { icon } => {
                let parent = icon.parent;
                let icon_id = self.add_icon(icon)?;
                CommandOutcome::IconCreated {
                    icon_id,
                    changes: ChangeSet::location(parent),
                }
            }
            SessionCommand::CreateFolder { parent } => {
                let icon_id = self.create_folder(parent)?;
                CommandOutcome::IconCreated {
                    icon_id,
                    changes: ChangeSet::location(parent),
                }
            }
            SessionCommand::RenameIcon { icon_id, label } => {
                CommandOutcome::Changed(self.rename_icon(icon_id, label)?)
            }
            SessionCommand::RepositionIcon { icon_id, position } => {
                CommandOutcome::Changed(self.reposition_icon(icon_id, position)?)
            }
            SessionCommand::RemoveIcon { icon_id, cascade } => {
                CommandOutcome::Changed(self.remove_icon(icon_id, cascade)?)
            }
            SessionCommand::ReparentIcon { icon_id, parent } => {
                CommandOutcome::Changed(self.reparent_icon(icon_id, parent)?)
            }
            SessionCommand::SelectIcon { icon_id, additive } => {
                CommandOutcome::Changed(self.select_icon(icon_id, additive)?)
            }
            SessionCommand::ClearSelection => CommandOutcome::Changed(self.clear_selection()),
            SessionCommand::StageClipboard { mode, items } => {
                CommandOutcome::Changed(self.stage_clipboard(mode, &items)?)
            }
            SessionCommand::StageSelection { mode } => {
                CommandOutcome::Changed(self.stage_selection(mode)?)
            }
            SessionCommand::PasteClipboard { target } => {
                CommandOutcome::Pasted(self.paste_clipboard(target)?)
            }
            SessionCommand::MoveWithConflictCheck { icon_id, target } => {
                CommandOutcome::Changed(self.move_with_conflict_check(icon_id, target)?)
            }
            SessionCommand::ResolveConflict {
                icon_id,
                target,
                resolution,
            } => CommandOutcome::Changed(self.resolve_conflict(icon_id, target, resolution)?),
            SessionCommand::BeginRename { icon_id } => {
                self.begin_rename(icon_id)?;
                CommandOutcome::Changed(ChangeSet::default())
            }
            SessionCommand::CommitRename { label } => {
                CommandOutcome::Changed(self.commit_rename(&label)?)
            }
            SessionCommand::CancelRename => {
                self.cancel_rename();
                CommandOutcome::Changed(ChangeSet::default())
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::SessionConfig;
    use crate::error::SessionError;
    use crate::model::{IconKind, WindowKind};

    fn bare_session() -> DesktopSession {
        DesktopSession::new(SessionConfig {
            seed_system_root: false,
            ..SessionConfig::default()
        })
    }

    #[test]
    fn commands_decode_from_tagged_json() {
        let command: SessionCommand = serde_json::from_str(
            r#"{"type":"move_window","window_id":3,"position":{"x":10,"y":20}}"#,
        )
        .expect("decode");
        assert_eq!(
            command,
            SessionCommand::MoveWindow {
                window_id: WindowId(3),
                position: Point::new(10, 20),
            }
        );
    }

    #[test]
    fn dispatch_opens_and_creates() {
        let mut session = bare_session();
        let outcome = session
            .dispatch(SessionCommand::OpenWindow {
                request: OpenWindowRequest::new(WindowKind::Notepad),
            })
            .expect("open");
        let CommandOutcome::WindowOpened { window_id, .. } = outcome else {
            panic!("expected window outcome, got {outcome:?}");
        };
        assert_eq!(session.focused_window(), Some(window_id));

        let outcome = session
            .dispatch(SessionCommand::CreateFolder { parent: None })
            .expect("create");
        let CommandOutcome::IconCreated { icon_id, changes } = outcome else {
            panic!("expected icon outcome, got {outcome:?}");
        };
        assert!(changes.desktop);
        assert_eq!(
            session.get_icon(icon_id).map(|icon| icon.kind()),
            Some(IconKind::Folder)
        );
    }

    #[test]
    fn dispatch_propagates_errors() {
        let mut session = bare_session();
        let err = session
            .dispatch(SessionCommand::CloseWindow {
                window_id: WindowId(9),
            })
            .expect_err("unknown window");
        assert_eq!(err, SessionError::UnknownId(WindowId(9).into()));
    }

    #[test]
    fn paste_outcome_carries_report_changes() {
        let mut session = bare_session();
        let doc = session
            .add_icon(NewIcon::document("a.txt", None))
            .expect("doc");
        session
            .dispatch(SessionCommand::StageClipboard {
                mode: TransferMode::Copy,
                items: vec![doc],
            })
            .expect("stage");
        let outcome = session
            .dispatch(SessionCommand::PasteClipboard { target: None })
            .expect("paste");
        assert!(outcome.changes().desktop);
        let CommandOutcome::Pasted(report) = outcome else {
            panic!("expected paste outcome");
        };
        assert_eq!(report.created.len(), 1);
    }
}
