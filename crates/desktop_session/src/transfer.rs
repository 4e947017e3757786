//! Clipboard staging, paste, and drag-drop moves over the icon tree.
//!
//! Functions here mutate the tree in place and may leave it half-updated when they fail
//! part way through a multi-item paste. The session facade runs them against a staged copy
//! so callers only ever observe whole transfers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::icon_tree::IconTree;
use crate::ids::IdAllocator;
use crate::model::{
    ChangeSet, ClipboardMode, ConflictResolution, IconId, NewIcon, TransferMode,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clipboard {
    mode: ClipboardMode,
    items: Vec<IconId>,
}

impl Clipboard {
    pub fn mode(&self) -> ClipboardMode {
        self.mode
    }

    pub fn items(&self) -> &[IconId] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.mode == ClipboardMode::Empty || self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.mode = ClipboardMode::Empty;
        self.items.clear();
    }

    /// Drops deleted icons, emptying the clipboard when none are left.
    pub(crate) fn prune(&mut self, tree: &IconTree) {
        self.items.retain(|id| tree.contains(*id));
        if self.items.is_empty() {
            self.mode = ClipboardMode::Empty;
        }
    }
}

/// Result of a paste: the icons it created (copy) or moved (cut).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteReport {
    pub mode: ClipboardMode,
    pub created: Vec<IconId>,
    pub moved: Vec<IconId>,
    pub changes: ChangeSet,
}

/// Replaces the clipboard content wholesale.
///
/// Duplicate ids collapse to their first occurrence. Staging nothing empties the clipboard.
///
/// # Errors
///
/// Every item must exist. System icons cannot be staged at all, and a copy is refused when
/// a system icon sits anywhere in a staged folder's subtree.
pub fn stage(
    tree: &IconTree,
    clipboard: &mut Clipboard,
    mode: TransferMode,
    items: &[IconId],
) -> SessionResult<()> {
    let mut seen = BTreeSet::new();
    let mut staged = Vec::with_capacity(items.len());
    for id in items {
        let icon = tree.get(*id).ok_or_else(|| SessionError::unknown(*id))?;
        if icon.is_system_root() {
            return Err(SessionError::ProtectedIcon { id: *id });
        }
        if mode == TransferMode::Copy {
            if let Some(nested) = protected_descendant(tree, *id) {
                return Err(SessionError::ProtectedIcon { id: nested });
            }
        }
        if seen.insert(*id) {
            staged.push(*id);
        }
    }

    if staged.is_empty() {
        clipboard.clear();
    } else {
        clipboard.mode = mode.into();
        clipboard.items = staged;
    }
    Ok(())
}

/// Pastes the clipboard into `target` (`None` is the desktop root).
///
/// Items deleted since staging are skipped, as are items nested under another staged item
/// (they travel with their ancestor). A cut clears the clipboard once every item is placed;
/// a copy leaves it staged for repeated pastes.
///
/// # Errors
///
/// Returns [`SessionError::InvalidParent`] for a target that is not a live folder and
/// [`SessionError::CycleDetected`] when a folder would land inside itself.
pub fn paste(
    tree: &mut IconTree,
    clipboard: &mut Clipboard,
    ids: &mut IdAllocator,
    target: Option<IconId>,
) -> SessionResult<PasteReport> {
    let mut report = PasteReport {
        mode: clipboard.mode,
        ..PasteReport::default()
    };
    if clipboard.is_empty() {
        return Ok(report);
    }
    if let Some(folder) = target {
        if !tree.get(folder).is_some_and(|icon| icon.is_folder()) {
            return Err(SessionError::InvalidParent { parent: folder });
        }
    }

    let items = top_level_items(tree, clipboard.items());
    match clipboard.mode {
        ClipboardMode::Empty => {}
        ClipboardMode::Cut => {
            for id in items {
                let Some(icon) = tree.get(id) else {
                    log::trace!("skipping stale clipboard item {id}");
                    continue;
                };
                if icon.parent == target {
                    continue;
                }
                let label = suffixed_label(&tree.labels_in(target, Some(id)), &icon.label);
                let renamed = label != icon.label;
                if let Some(previous) = tree.reparent(id, target)? {
                    report.changes.touch_location(previous);
                    report.changes.touch_location(target);
                    report.moved.push(id);
                }
                if renamed {
                    tree.rename(id, label)?;
                }
            }
            clipboard.clear();
        }
        ClipboardMode::Copy => {
            for id in items {
                let Some(icon) = tree.get(id) else {
                    log::trace!("skipping stale clipboard item {id}");
                    continue;
                };
                let label = copy_label(&tree.labels_in(target, None), &icon.label);
                let copied = copy_subtree(tree, ids, id, target, label)?;
                report.created.push(copied);
                report.changes.touch_location(target);
            }
        }
    }
    Ok(report)
}

/// Moves `item` into `target` for a direct drop, refusing to overwrite a same-named icon.
///
/// # Errors
///
/// Returns [`SessionError::NameConflict`] naming the icon already holding the label, in
/// addition to the structural errors of [`IconTree::reparent`].
pub fn move_with_conflict_check(
    tree: &mut IconTree,
    item: IconId,
    target: Option<IconId>,
) -> SessionResult<ChangeSet> {
    if !tree.check_reparent(item, target)? {
        return Ok(ChangeSet::default());
    }
    let label = tree
        .get(item)
        .map(|icon| icon.label.clone())
        .ok_or_else(|| SessionError::unknown(item))?;
    if let Some(existing) = tree.find_by_label(target, &label, Some(item)) {
        return Err(SessionError::NameConflict {
            existing_id: existing.id,
        });
    }
    reparent(tree, item, target)
}

/// Applies the caller's answer to a previous [`SessionError::NameConflict`].
///
/// If the conflict has gone away in the meantime this is a plain move.
///
/// # Errors
///
/// `Replace` fails with [`SessionError::CycleDetected`] when the existing icon contains the
/// dropped one, and with [`SessionError::ProtectedIcon`] when it is a system icon.
pub fn resolve_conflict(
    tree: &mut IconTree,
    item: IconId,
    target: Option<IconId>,
    resolution: ConflictResolution,
) -> SessionResult<ChangeSet> {
    if !tree.check_reparent(item, target)? {
        return Ok(ChangeSet::default());
    }
    let label = tree
        .get(item)
        .map(|icon| icon.label.clone())
        .ok_or_else(|| SessionError::unknown(item))?;
    let Some(existing) = tree.find_by_label(target, &label, Some(item)).map(|i| i.id) else {
        return reparent(tree, item, target);
    };

    match resolution {
        ConflictResolution::Replace => {
            if tree.is_ancestor(existing, item) {
                return Err(SessionError::CycleDetected {
                    id: item,
                    target: existing,
                });
            }
            tree.remove(existing, true)?;
            reparent(tree, item, target)
        }
        ConflictResolution::CreateCopy => {
            let label = copy_label(&tree.labels_in(target, Some(item)), &label);
            let changes = reparent(tree, item, target)?;
            tree.rename(item, label)?;
            Ok(changes)
        }
    }
}

/// Label for a copy placed among `taken`: the original if free, else `Copy of <label>`,
/// else `Copy of <label> (n)` for the smallest free `n` from 2.
pub fn copy_label(taken: &BTreeSet<String>, original: &str) -> String {
    if !taken.contains(original) {
        return original.to_string();
    }
    let base = format!("Copy of {original}");
    if !taken.contains(&base) {
        return base;
    }
    numbered_label(taken, &base)
}

/// Label for an item moved among `taken`: the original if free, else `<label> (n)` for the
/// smallest free `n` from 2.
pub fn suffixed_label(taken: &BTreeSet<String>, original: &str) -> String {
    if !taken.contains(original) {
        return original.to_string();
    }
    numbered_label(taken, original)
}

fn numbered_label(taken: &BTreeSet<String>, base: &str) -> String {
    let mut n: usize = 2;
    loop {
        let candidate = format!("{base} ({n})");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n = n.saturating_add(1);
    }
}

fn reparent(tree: &mut IconTree, item: IconId, target: Option<IconId>) -> SessionResult<ChangeSet> {
    let mut changes = ChangeSet::default();
    if let Some(previous) = tree.reparent(item, target)? {
        changes.touch_location(previous);
        changes.touch_location(target);
    }
    Ok(changes)
}

/// Drops staged ids whose ancestor is also staged, keeping order.
fn top_level_items(tree: &IconTree, items: &[IconId]) -> Vec<IconId> {
    items
        .iter()
        .copied()
        .filter(|id| {
            !items
                .iter()
                .any(|other| other != id && tree.is_ancestor(*other, *id))
        })
        .collect()
}

fn protected_descendant(tree: &IconTree, id: IconId) -> Option<IconId> {
    tree.descendants(id)
        .into_iter()
        .find(|child| tree.get(*child).is_some_and(|icon| icon.is_system_root()))
}

/// Duplicates `source` and its subtree under `target` with fresh ids.
///
/// System icons are never duplicated; meeting one fails with [`SessionError::ProtectedIcon`].
fn copy_subtree(
    tree: &mut IconTree,
    ids: &mut IdAllocator,
    source: IconId,
    target: Option<IconId>,
    label: String,
) -> SessionResult<IconId> {
    if let Some(folder) = target {
        if folder == source || tree.is_ancestor(source, folder) {
            return Err(SessionError::CycleDetected {
                id: source,
                target: folder,
            });
        }
    }
    let icon = tree
        .get(source)
        .cloned()
        .ok_or_else(|| SessionError::unknown(source))?;
    let children = tree
        .children_in(Some(source))
        .into_iter()
        .map(|child| child.id)
        .collect::<Vec<_>>();

    if icon.is_system_root() {
        return Err(SessionError::ProtectedIcon { id: source });
    }
    let copy_id = ids.next_icon_id();
    tree.insert(
        copy_id,
        NewIcon {
            label,
            position: icon.position,
            parent: target,
            content: icon.content,
        },
    )?;

    for child in children {
        let label = tree
            .get(child)
            .map(|icon| icon.label.clone())
            .ok_or_else(|| SessionError::unknown(child))?;
        copy_subtree(tree, ids, child, Some(copy_id), label)?;
    }
    Ok(copy_id)
}
