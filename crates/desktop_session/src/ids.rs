//! Identifier allocation for windows and icons.

use crate::model::{IconId, WindowId};

/// Hands out window and icon ids from independent, strictly increasing counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next_window: u64,
    next_icon: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next_window: 1,
            next_icon: 1,
        }
    }
}

impl IdAllocator {
    pub fn next_window_id(&mut self) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window = self.next_window.saturating_add(1);
        id
    }

    pub fn next_icon_id(&mut self) -> IconId {
        let id = IconId(self.next_icon);
        self.next_icon = self.next_icon.saturating_add(1);
        id
    }

    /// Advances both counters past ids that already exist, e.g. after loading a snapshot.
    pub fn observe(
        &mut self,
        windows: impl IntoIterator<Item = WindowId>,
        icons: impl IntoIterator<Item = IconId>,
    ) {
        if let Some(max) = windows.into_iter().map(|id| id.0).max() {
            self.next_window = self.next_window.max(max.saturating_add(1));
        }
        if let Some(max) = icons.into_iter().map(|id| id.0).max() {
            self.next_icon = self.next_icon.max(max.saturating_add(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent_and_increasing() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.next_window_id(), WindowId(1));
        assert_eq!(ids.next_icon_id(), IconId(1));
        assert_eq!(ids.next_icon_id(), IconId(2));
        assert_eq!(ids.next_window_id(), WindowId(2));
    }

    #[test]
    fn observe_skips_past_existing_ids_and_never_rewinds() {
        let mut ids = IdAllocator::default();
        ids.observe([WindowId(7), WindowId(3)], [IconId(40)]);
        assert_eq!(ids.next_window_id(), WindowId(8));
        assert_eq!(ids.next_icon_id(), IconId(41));

        ids.observe([WindowId(2)], Vec::<IconId>::new());
        assert_eq!(ids.next_window_id(), WindowId(9));
    }
}
