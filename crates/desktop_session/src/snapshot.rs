//! Complete, consistent serialization of session state for the persistence boundary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::icon_tree::IconTree;
use crate::ids::IdAllocator;
use crate::model::{Icon, IconId, WindowRecord, SESSION_SNAPSHOT_SCHEMA_VERSION};
use crate::window_registry::WindowRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderIndexEntry {
    pub folder: IconId,
    pub children: Vec<IconId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub schema_version: u32,
    pub windows: Vec<WindowRecord>,
    /// Icons in listing order.
    pub icons: Vec<Icon>,
    pub folder_index: Vec<FolderIndexEntry>,
}

impl SessionSnapshot {
    pub(crate) fn capture(windows: &WindowRegistry, icons: &IconTree) -> Self {
        Self {
            schema_version: SESSION_SNAPSHOT_SCHEMA_VERSION,
            windows: windows.records().to_vec(),
            icons: icons.icons().into_iter().cloned().collect(),
            folder_index: icons
                .folder_index()
                .into_iter()
                .map(|(folder, children)| FolderIndexEntry { folder, children })
                .collect(),
        }
    }
}

/// State rebuilt from a snapshot that passed validation.
#[derive(Debug)]
pub(crate) struct RestoredState {
    pub windows: WindowRegistry,
    pub icons: IconTree,
    pub ids: IdAllocator,
}

/// Validates `snapshot` and rebuilds engine state from it.
///
/// # Errors
///
/// Returns [`SessionError::CorruptSnapshot`] on a schema mismatch, duplicate ids or
/// z-orders, a parent that is missing or not a folder, a parent cycle, a folder index
/// that disagrees with the icons' parent pointers, or a window associated with anything
/// other than a live folder.
pub(crate) fn restore(snapshot: SessionSnapshot) -> SessionResult<RestoredState> {
    if snapshot.schema_version != SESSION_SNAPSHOT_SCHEMA_VERSION {
        return Err(SessionError::corrupt(format!(
            "unsupported schema version {}",
            snapshot.schema_version
        )));
    }

    let mut icons = IconTree::from_icons(snapshot.icons).map_err(SessionError::corrupt)?;
    icons.validate().map_err(SessionError::corrupt)?;
    apply_folder_index(&mut icons, &snapshot.folder_index)?;

    let window_ids = snapshot.windows.iter().map(|w| w.id).collect::<Vec<_>>();
    for window in &snapshot.windows {
        if let Some(folder) = window.associated_folder {
            if !icons.get(folder).is_some_and(Icon::is_folder) {
                return Err(SessionError::corrupt(format!(
                    "{} is associated with {folder}, which is not a live folder",
                    window.id
                )));
            }
        }
    }
    let windows = WindowRegistry::from_records(snapshot.windows).map_err(SessionError::corrupt)?;

    let mut ids = IdAllocator::default();
    ids.observe(window_ids, icons.icons().into_iter().map(|icon| icon.id));
    Ok(RestoredState {
        windows,
        icons,
        ids,
    })
}

/// Checks the stored index against parent pointers and adopts its child order.
fn apply_folder_index(icons: &mut IconTree, index: &[FolderIndexEntry]) -> SessionResult<()> {
    let derived = icons.folder_index();
    let mut seen = BTreeSet::new();
    for entry in index {
        if !seen.insert(entry.folder) {
            return Err(SessionError::corrupt(format!(
                "folder index lists {} twice",
                entry.folder
            )));
        }
        let Some(actual) = derived.get(&entry.folder) else {
            return Err(SessionError::corrupt(format!(
                "folder index names {} which is not a folder",
                entry.folder
            )));
        };
        let listed = entry.children.iter().copied().collect::<BTreeSet<_>>();
        let expected = actual.iter().copied().collect::<BTreeSet<_>>();
        if listed.len() != entry.children.len() || listed != expected {
            return Err(SessionError::corrupt(format!(
                "folder index for {} disagrees with parent pointers",
                entry.folder
            )));
        }
    }

    let unindexed = derived
        .iter()
        .find(|(folder, children)| !seen.contains(*folder) && !children.is_empty());
    if let Some((folder, _)) = unindexed {
        return Err(SessionError::corrupt(format!(
            "folder {folder} has children but no index entry"
        )));
    }

    for entry in index {
        icons.order_children(&entry.children);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{IconContent, Point, Size, WindowKind};

    fn icon(id: u64, label: &str, parent: Option<u64>, content: IconContent) -> Icon {
        Icon {
            id: IconId(id),
            label: label.to_string(),
            position: Point::default(),
            parent: parent.map(IconId),
            content,
        }
    }

    fn snapshot(icons: Vec<Icon>, folder_index: Vec<FolderIndexEntry>) -> SessionSnapshot {
        SessionSnapshot {
            schema_version: SESSION_SNAPSHOT_SCHEMA_VERSION,
            windows: Vec::new(),
            icons,
            folder_index,
        }
    }

    fn reason(err: SessionError) -> String {
        match err {
            SessionError::CorruptSnapshot { reason } => reason,
            other => panic!("expected corrupt snapshot, got {other:?}"),
        }
    }

    #[test]
    fn folder_index_order_is_adopted() {
        let state = restore(snapshot(
            vec![
                icon(1, "f", None, IconContent::Folder),
                icon(2, "a", Some(1), IconContent::Folder),
                icon(3, "b", Some(1), IconContent::Folder),
            ],
            vec![
                FolderIndexEntry {
                    folder: IconId(1),
                    children: vec![IconId(3), IconId(2)],
                },
                FolderIndexEntry {
                    folder: IconId(2),
                    children: Vec::new(),
                },
            ],
        ))
        .expect("valid");

        let order = state
            .icons
            .children_of(IconId(1))
            .into_iter()
            .map(|icon| icon.id)
            .collect::<Vec<_>>();
        assert_eq!(order, vec![IconId(3), IconId(2)]);
    }

    #[test]
    fn captured_listing_order_survives_restore() {
        let mut tree = IconTree::new();
        tree.insert(IconId(1), crate::model::NewIcon::folder("f"))
            .expect("f");
        tree.insert(IconId(2), crate::model::NewIcon::document("x", None).in_folder(IconId(1)))
            .expect("x");
        tree.insert(IconId(3), crate::model::NewIcon::folder("g"))
            .expect("g");
        let captured = SessionSnapshot::capture(&WindowRegistry::new(), &tree);

        let state = restore(captured.clone()).expect("valid");
        assert_eq!(
            SessionSnapshot::capture(&state.windows, &state.icons),
            captured
        );
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let err = restore(snapshot(
            vec![
                icon(1, "a", Some(2), IconContent::Folder),
                icon(2, "b", Some(1), IconContent::Folder),
            ],
            Vec::new(),
        ))
        .expect_err("cycle");
        assert!(reason(err).contains("ancestor"));
    }

    #[test]
    fn document_parent_is_rejected() {
        let err = restore(snapshot(
            vec![
                icon(1, "doc", None, IconContent::Document { payload: None }),
                icon(2, "x", Some(1), IconContent::Folder),
            ],
            Vec::new(),
        ))
        .expect_err("non-folder parent");
        assert!(reason(err).contains("non-folder"));
    }

    #[test]
    fn index_that_disagrees_with_parents_is_rejected() {
        let err = restore(snapshot(
            vec![
                icon(1, "f", None, IconContent::Folder),
                icon(2, "x", None, IconContent::Folder),
            ],
            vec![FolderIndexEntry {
                folder: IconId(1),
                children: vec![IconId(2)],
            }],
        ))
        .expect_err("stale index");
        assert!(reason(err).contains("disagrees"));
    }

    #[test]
    fn missing_index_for_populated_folder_is_rejected() {
        let err = restore(snapshot(
            vec![
                icon(1, "f", None, IconContent::Folder),
                icon(2, "x", Some(1), IconContent::Folder),
            ],
            Vec::new(),
        ))
        .expect_err("no index");
        assert!(reason(err).contains("no index entry"));
    }

    #[test]
    fn duplicate_icon_ids_are_rejected() {
        let err = restore(snapshot(
            vec![
                icon(1, "a", None, IconContent::Folder),
                icon(1, "b", None, IconContent::Folder),
            ],
            Vec::new(),
        ))
        .expect_err("duplicate");
        assert!(reason(err).contains("duplicate"));
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let mut stale = snapshot(Vec::new(), Vec::new());
        stale.schema_version = 0;
        let err = restore(stale).expect_err("schema");
        assert!(reason(err).contains("schema"));
    }

    fn explorer_window(id: u64, associated_folder: IconId) -> WindowRecord {
        WindowRecord {
            id: crate::model::WindowId(id),
            kind: WindowKind::Explorer,
            position: Point::new(0, 0),
            size: Size::new(480, 360),
            title: "Explorer".to_string(),
            z_order: 1,
            is_maximized: false,
            pre_maximize_state: None,
            associated_filename: None,
            associated_folder: Some(associated_folder),
        }
    }

    #[test]
    fn window_associated_with_a_document_is_rejected() {
        let mut snap = snapshot(
            vec![icon(
                4,
                "a.txt",
                None,
                IconContent::Document { payload: None },
            )],
            Vec::new(),
        );
        snap.windows.push(explorer_window(1, IconId(4)));

        let err = restore(snap).expect_err("document association");
        assert!(reason(err).contains("not a live folder"));
    }

    #[test]
    fn window_associated_with_a_missing_icon_is_rejected() {
        let mut snap = snapshot(Vec::new(), Vec::new());
        snap.windows.push(explorer_window(1, IconId(30)));

        let err = restore(snap).expect_err("missing association");
        assert!(reason(err).contains("icon-30"));
    }

    #[test]
    fn allocator_resumes_after_restored_ids() {
        let mut snap = snapshot(vec![icon(12, "f", None, IconContent::Folder)], Vec::new());
        snap.windows.push(WindowRecord {
            id: crate::model::WindowId(5),
            kind: WindowKind::Calculator,
            position: Point::new(0, 0),
            size: Size::new(260, 320),
            title: "Calculator".to_string(),
            z_order: 2,
            is_maximized: false,
            pre_maximize_state: None,
            associated_filename: None,
            associated_folder: Some(IconId(12)),
        });

        let mut state = restore(snap).expect("valid");
        assert_eq!(state.ids.next_icon_id(), IconId(13));
        assert_eq!(state.ids.next_window_id(), crate::model::WindowId(6));
        assert_eq!(state.windows.focused(), Some(crate::model::WindowId(5)));
    }
}
