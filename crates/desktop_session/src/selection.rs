//! Advisory icon selection used by multi-item drag, cut and copy.

use crate::error::{SessionError, SessionResult};
use crate::icon_tree::IconTree;
use crate::model::IconId;

/// Ordered set of selected icons, all sharing one parent scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    items: Vec<IconId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection with `id`, or toggles `id` when `additive` is set.
    ///
    /// An additive pick in a different folder than the current selection starts a new
    /// selection there.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownId`] when `id` is not in `tree`.
    pub fn select(&mut self, tree: &IconTree, id: IconId, additive: bool) -> SessionResult<()> {
        let icon = tree.get(id).ok_or_else(|| SessionError::unknown(id))?;
        self.prune(tree);

        let same_scope = self
            .scope(tree)
            .is_some_and(|scope| scope == icon.parent);
        if !additive || !same_scope {
            self.items = vec![id];
            return Ok(());
        }

        if let Some(index) = self.items.iter().position(|selected| *selected == id) {
            self.items.remove(index);
        } else {
            self.items.push(id);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Live selected icons in selection order. Stale ids are skipped.
    pub fn selected(&self, tree: &IconTree) -> Vec<IconId> {
        self.items
            .iter()
            .copied()
            .filter(|id| tree.contains(*id))
            .collect()
    }

    pub fn is_selected(&self, tree: &IconTree, id: IconId) -> bool {
        tree.contains(id) && self.items.contains(&id)
    }

    /// Parent location shared by the live selection, if anything is selected.
    pub fn scope(&self, tree: &IconTree) -> Option<Option<IconId>> {
        self.items
            .iter()
            .find_map(|id| tree.get(*id))
            .map(|icon| icon.parent)
    }

    /// Drops ids that no longer exist in `tree`.
    pub fn prune(&mut self, tree: &IconTree) {
        self.items.retain(|id| tree.contains(*id));
    }
}
