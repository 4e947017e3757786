//! Hierarchical icon store for the desktop and its folders.
//!
//! Each icon's `parent` pointer is the only record of where it lives. Folder listings are
//! derived from those pointers, ordered by the placement sequence stamped on an icon each
//! time it enters a parent, so a listing can never disagree with the pointers.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{SessionError, SessionResult};
use crate::model::{Icon, IconId, NewIcon, Point};

#[derive(Debug, Clone, PartialEq)]
struct IconEntry {
    icon: Icon,
    placement: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IconTree {
    entries: BTreeMap<IconId, IconEntry>,
    next_placement: u64,
}

impl IconTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: IconId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: IconId) -> Option<&Icon> {
        self.entries.get(&id).map(|entry| &entry.icon)
    }

    /// All icons in placement order.
    pub fn icons(&self) -> Vec<&Icon> {
        let mut entries = self.entries.values().collect::<Vec<_>>();
        entries.sort_by_key(|entry| entry.placement);
        entries.into_iter().map(|entry| &entry.icon).collect()
    }

    /// Inserts a new icon under `new.parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidParent`] when the parent is set but is not a live folder.
    pub fn insert(&mut self, id: IconId, new: NewIcon) -> SessionResult<&Icon> {
        self.ensure_parent(new.parent)?;
        debug_assert!(!self.contains(id), "allocator handed out a live id");
        let placement = self.next_placement();
        let entry = self.entries.entry(id).or_insert(IconEntry {
            icon: Icon {
                id,
                label: new.label,
                position: new.position,
                parent: new.parent,
                content: new.content,
            },
            placement,
        });
        Ok(&entry.icon)
    }

    /// Validates a move of `id` under `new_parent` without applying it.
    ///
    /// Returns `Ok(false)` when the icon already lives there.
    pub fn check_reparent(&self, id: IconId, new_parent: Option<IconId>) -> SessionResult<bool> {
        let icon = self.get(id).ok_or_else(|| SessionError::unknown(id))?;
        if let Some(target) = new_parent {
            if target == id || self.is_ancestor(id, target) {
                return Err(SessionError::CycleDetected { id, target });
            }
        }
        if icon.is_system_root() {
            return Err(SessionError::ProtectedIcon { id });
        }
        self.ensure_parent(new_parent)?;
        Ok(icon.parent != new_parent)
    }

    /// Moves `id` to the end of `new_parent`'s listing.
    ///
    /// Returns the previous parent when the icon moved, `None` for a same-parent no-op.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::CycleDetected`] when `new_parent` is `id` or one of its
    /// descendants, [`SessionError::InvalidParent`] when it is not a live folder,
    /// [`SessionError::ProtectedIcon`] for system icons, and [`SessionError::UnknownId`]
    /// when `id` does not exist. The tree is untouched on error.
    pub fn reparent(
        &mut self,
        id: IconId,
        new_parent: Option<IconId>,
    ) -> SessionResult<Option<Option<IconId>>> {
        if !self.check_reparent(id, new_parent)? {
            return Ok(None);
        }
        let placement = self.next_placement();
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| SessionError::unknown(id))?;
        let previous = entry.icon.parent;
        entry.icon.parent = new_parent;
        entry.placement = placement;
        Ok(Some(previous))
    }

    /// Sets the label without any uniqueness check.
    pub fn rename(&mut self, id: IconId, label: impl Into<String>) -> SessionResult<&Icon> {
        let icon = self.icon_mut(id)?;
        icon.label = label.into();
        Ok(icon)
    }

    pub fn reposition(&mut self, id: IconId, position: Point) -> SessionResult<&Icon> {
        let icon = self.icon_mut(id)?;
        icon.position = position;
        Ok(icon)
    }

    /// Removes `id`, and its whole subtree when `cascade` is set.
    ///
    /// Returns the removed icons, `id` first.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::FolderNotEmpty`] for a non-empty folder without `cascade`,
    /// and with [`SessionError::ProtectedIcon`] if `id` or any descendant is a system icon.
    /// Nothing is removed on error.
    pub fn remove(&mut self, id: IconId, cascade: bool) -> SessionResult<Vec<Icon>> {
        let icon = self.get(id).ok_or_else(|| SessionError::unknown(id))?;
        if icon.is_system_root() {
            return Err(SessionError::ProtectedIcon { id });
        }
        let descendants = self.descendants(id);
        if !descendants.is_empty() && !cascade {
            return Err(SessionError::FolderNotEmpty { id });
        }
        if let Some(protected) = descendants
            .iter()
            .find(|child| self.get(**child).is_some_and(Icon::is_system_root))
        {
            return Err(SessionError::ProtectedIcon { id: *protected });
        }

        let mut removed = Vec::with_capacity(descendants.len() + 1);
        for target in std::iter::once(id).chain(descendants) {
            if let Some(entry) = self.entries.remove(&target) {
                removed.push(entry.icon);
            }
        }
        Ok(removed)
    }

    /// Children of `folder_id` in listing order. Empty for unknown ids and non-folders.
    pub fn children_of(&self, folder_id: IconId) -> Vec<&Icon> {
        match self.get(folder_id) {
            Some(folder) if folder.is_folder() => self.children_in(Some(folder_id)),
            _ => Vec::new(),
        }
    }

    /// Icons placed directly on the desktop root.
    pub fn desktop_icons(&self) -> Vec<&Icon> {
        self.children_in(None)
    }

    /// Children of a location (`None` is the desktop root) in listing order.
    pub fn children_in(&self, parent: Option<IconId>) -> Vec<&Icon> {
        let mut children = self
            .entries
            .values()
            .filter(|entry| entry.icon.parent == parent)
            .collect::<Vec<_>>();
        children.sort_by_key(|entry| entry.placement);
        children.into_iter().map(|entry| &entry.icon).collect()
    }

    /// Read-only contents index: every folder mapped to its ordered children.
    pub fn folder_index(&self) -> BTreeMap<IconId, Vec<IconId>> {
        self.entries
            .values()
            .filter(|entry| entry.icon.is_folder())
            .map(|entry| {
                let children = self
                    .children_in(Some(entry.icon.id))
                    .into_iter()
                    .map(|child| child.id)
                    .collect();
                (entry.icon.id, children)
            })
            .collect()
    }

    /// Whether `ancestor` appears on the parent chain of `node`.
    pub fn is_ancestor(&self, ancestor: IconId, node: IconId) -> bool {
        let mut current = self.get(node).and_then(|icon| icon.parent);
        // The chain can be no longer than the number of icons in a forest.
        for _ in 0..=self.entries.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.get(id).and_then(|icon| icon.parent),
                None => return false,
            }
        }
        false
    }

    /// All descendants of `id` in breadth-first listing order, excluding `id`.
    pub fn descendants(&self, id: IconId) -> Vec<IconId> {
        let mut out = Vec::new();
        let mut cursor = 0;
        out.extend(self.children_in(Some(id)).into_iter().map(|icon| icon.id));
        while cursor < out.len() {
            let next = out[cursor];
            out.extend(self.children_in(Some(next)).into_iter().map(|icon| icon.id));
            cursor += 1;
        }
        out
    }

    /// First icon in `parent` whose label equals `label`, ignoring `excluding`.
    pub fn find_by_label(
        &self,
        parent: Option<IconId>,
        label: &str,
        excluding: Option<IconId>,
    ) -> Option<&Icon> {
        self.children_in(parent)
            .into_iter()
            .find(|icon| icon.label == label && Some(icon.id) != excluding)
    }

    /// Labels in use under `parent`, ignoring `excluding`.
    pub fn labels_in(&self, parent: Option<IconId>, excluding: Option<IconId>) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|entry| entry.icon.parent == parent && Some(entry.icon.id) != excluding)
            .map(|entry| entry.icon.label.clone())
            .collect()
    }

    /// Checks the forest invariant over the whole tree.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        for entry in self.entries.values() {
            let icon = &entry.icon;
            if let Some(parent) = icon.parent {
                match self.get(parent) {
                    None => return Err(format!("{} points at missing parent {parent}", icon.id)),
                    Some(folder) if !folder.is_folder() => {
                        return Err(format!("{} is parented to non-folder {parent}", icon.id))
                    }
                    Some(_) => {}
                }
                if parent == icon.id || self.is_ancestor(icon.id, icon.id) {
                    return Err(format!("{} is its own ancestor", icon.id));
                }
            }
        }
        Ok(())
    }

    /// Rebuilds a tree from stored icons, keeping their order as the listing order.
    ///
    /// The result is not validated; call [`IconTree::validate`].
    pub(crate) fn from_icons(icons: impl IntoIterator<Item = Icon>) -> Result<Self, String> {
        let mut tree = Self::new();
        for icon in icons {
            let placement = tree.next_placement();
            let id = icon.id;
            if tree
                .entries
                .insert(id, IconEntry { icon, placement })
                .is_some()
            {
                return Err(format!("duplicate icon id {id}"));
            }
        }
        Ok(tree)
    }

    /// Permutes the placement stamps of `children` so they list in the given order.
    ///
    /// The set of stamps is unchanged, so the global order of other icons is kept.
    pub(crate) fn order_children(&mut self, children: &[IconId]) {
        let live = children
            .iter()
            .copied()
            .filter(|id| self.entries.contains_key(id))
            .collect::<Vec<_>>();
        let mut slots = live
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| entry.placement))
            .collect::<Vec<_>>();
        slots.sort_unstable();
        for (id, placement) in live.into_iter().zip(slots) {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.placement = placement;
            }
        }
    }

    fn ensure_parent(&self, parent: Option<IconId>) -> SessionResult<()> {
        match parent {
            None => Ok(()),
            Some(id) if self.get(id).is_some_and(Icon::is_folder) => Ok(()),
            Some(id) => Err(SessionError::InvalidParent { parent: id }),
        }
    }

    fn icon_mut(&mut self, id: IconId) -> SessionResult<&mut Icon> {
        self.entries
            .get_mut(&id)
            .map(|entry| &mut entry.icon)
            .ok_or_else(|| SessionError::unknown(id))
    }

    fn next_placement(&mut self) -> u64 {
        let placement = self.next_placement;
        self.next_placement = self.next_placement.saturating_add(1);
        placement
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::IconKind;

    struct Fixture {
        tree: IconTree,
        next: u64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tree: IconTree::new(),
                next: 1,
            }
        }

        fn add(&mut self, new: NewIcon) -> IconId {
            let id = IconId(self.next);
            self.next += 1;
            self.tree.insert(id, new).expect("insert").id
        }
    }

    fn ids(icons: Vec<&Icon>) -> Vec<IconId> {
        icons.into_iter().map(|icon| icon.id).collect()
    }

    #[test]
    fn insert_rejects_missing_and_non_folder_parents() {
        let mut fx = Fixture::new();
        let doc = fx.add(NewIcon::document("a.txt", None));

        let err = fx
            .tree
            .insert(IconId(99), NewIcon::document("b.txt", None).in_folder(doc))
            .expect_err("document parent");
        assert_eq!(err, SessionError::InvalidParent { parent: doc });

        let err = fx
            .tree
            .insert(IconId(98), NewIcon::folder("x").in_folder(IconId(404)))
            .expect_err("missing parent");
        assert_eq!(err, SessionError::InvalidParent { parent: IconId(404) });
        assert_eq!(fx.tree.len(), 1);
    }

    #[test]
    fn reparent_into_self_or_descendant_is_a_cycle() {
        let mut fx = Fixture::new();
        let outer = fx.add(NewIcon::folder("outer"));
        let inner = fx.add(NewIcon::folder("inner").in_folder(outer));
        let before = fx.tree.clone();

        assert_eq!(
            fx.tree.reparent(outer, Some(outer)),
            Err(SessionError::CycleDetected {
                id: outer,
                target: outer
            })
        );
        assert_eq!(
            fx.tree.reparent(outer, Some(inner)),
            Err(SessionError::CycleDetected {
                id: outer,
                target: inner
            })
        );
        assert_eq!(fx.tree, before);
    }

    #[test]
    fn reparent_to_current_parent_is_a_noop() {
        let mut fx = Fixture::new();
        let folder = fx.add(NewIcon::folder("f"));
        let first = fx.add(NewIcon::document("1", None).in_folder(folder));
        let second = fx.add(NewIcon::document("2", None).in_folder(folder));

        assert_eq!(fx.tree.reparent(first, Some(folder)), Ok(None));
        assert_eq!(ids(fx.tree.children_of(folder)), vec![first, second]);
    }

    #[test]
    fn reparent_appends_to_new_listing_and_reports_old_parent() {
        let mut fx = Fixture::new();
        let a = fx.add(NewIcon::folder("a"));
        let b = fx.add(NewIcon::folder("b"));
        let existing = fx.add(NewIcon::document("x", None).in_folder(b));
        let moving = fx.add(NewIcon::document("y", None).in_folder(a));

        assert_eq!(fx.tree.reparent(moving, Some(b)), Ok(Some(Some(a))));
        assert!(fx.tree.children_of(a).is_empty());
        assert_eq!(ids(fx.tree.children_of(b)), vec![existing, moving]);
        assert_eq!(fx.tree.reparent(moving, None), Ok(Some(Some(b))));
        assert_eq!(ids(fx.tree.desktop_icons()), vec![a, b, moving]);
    }

    #[test]
    fn system_root_cannot_move_or_be_removed() {
        let mut fx = Fixture::new();
        let root = fx.add(NewIcon::system_root("My Computer"));
        let folder = fx.add(NewIcon::folder("f"));

        assert_eq!(
            fx.tree.reparent(root, Some(folder)),
            Err(SessionError::ProtectedIcon { id: root })
        );
        assert_eq!(
            fx.tree.remove(root, true),
            Err(SessionError::ProtectedIcon { id: root })
        );
        assert_eq!(fx.tree.get(root).map(Icon::kind), Some(IconKind::SystemRoot));
    }

    #[test]
    fn remove_non_empty_folder_requires_cascade() {
        let mut fx = Fixture::new();
        let folder = fx.add(NewIcon::folder("f"));
        let nested = fx.add(NewIcon::folder("g").in_folder(folder));
        let leaf = fx.add(NewIcon::document("d", None).in_folder(nested));

        assert_eq!(
            fx.tree.remove(folder, false),
            Err(SessionError::FolderNotEmpty { id: folder })
        );
        assert_eq!(fx.tree.len(), 3);

        let removed = fx.tree.remove(folder, true).expect("cascade");
        assert_eq!(
            removed.iter().map(|icon| icon.id).collect::<Vec<_>>(),
            vec![folder, nested, leaf]
        );
        assert!(fx.tree.is_empty());
    }

    #[test]
    fn children_of_is_empty_for_documents_and_unknown_ids() {
        let mut fx = Fixture::new();
        let doc = fx.add(NewIcon::document("d", None));
        assert!(fx.tree.children_of(doc).is_empty());
        assert!(fx.tree.children_of(IconId(500)).is_empty());
    }

    #[test]
    fn folder_index_matches_parent_pointers() {
        let mut fx = Fixture::new();
        let a = fx.add(NewIcon::folder("a"));
        let b = fx.add(NewIcon::folder("b").in_folder(a));
        let c = fx.add(NewIcon::document("c", None).in_folder(b));
        let d = fx.add(NewIcon::document("d", None).in_folder(a));
        fx.tree.reparent(c, Some(a)).expect("move c");

        let index = fx.tree.folder_index();
        assert_eq!(index.get(&a), Some(&vec![b, d, c]));
        assert_eq!(index.get(&b), Some(&Vec::new()));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn rename_does_not_enforce_uniqueness() {
        let mut fx = Fixture::new();
        let first = fx.add(NewIcon::document("a", None));
        let second = fx.add(NewIcon::document("b", None));
        fx.tree.rename(second, "a").expect("rename");
        assert_eq!(fx.tree.find_by_label(None, "a", Some(first)).map(|i| i.id), Some(second));
        assert_eq!(
            fx.tree.rename(IconId(77), "z").map(|icon| icon.id),
            Err(SessionError::UnknownId(IconId(77).into()))
        );
    }

    #[test]
    fn validate_reports_cycles_in_rebuilt_trees() {
        let a = Icon {
            id: IconId(1),
            label: "a".to_string(),
            position: Point::default(),
            parent: Some(IconId(2)),
            content: crate::model::IconContent::Folder,
        };
        let b = Icon {
            id: IconId(2),
            label: "b".to_string(),
            parent: Some(IconId(1)),
            ..a.clone()
        };
        let tree = IconTree::from_icons([a, b]).expect("no duplicates");
        let reason = tree.validate().expect_err("cycle");
        assert!(reason.contains("own ancestor"), "{reason}");
    }
}
