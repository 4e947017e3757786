//! Window records, stacking order, focus, and the maximize/restore state machine.

use std::collections::BTreeSet;

use crate::error::{SessionError, SessionResult};
use crate::model::{IconId, Point, Rect, Size, WindowId, WindowKind, WindowRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRegistry {
    /// Live windows in the order they were opened.
    windows: Vec<WindowRecord>,
    next_z: u64,
    focused: Option<WindowId>,
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self {
            windows: Vec::new(),
            next_z: 1,
            focused: None,
        }
    }
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn get(&self, window_id: WindowId) -> Option<&WindowRecord> {
        self.windows.iter().find(|w| w.id == window_id)
    }

    /// Live windows from back to front.
    pub fn stacked(&self) -> Vec<&WindowRecord> {
        let mut windows = self.windows.iter().collect::<Vec<_>>();
        windows.sort_by_key(|w| w.z_order);
        windows
    }

    /// Window that received the last open or focus, cleared when it closes.
    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    /// Window with the highest z-order, whether or not it is tracked as focused.
    pub fn topmost(&self) -> Option<WindowId> {
        self.windows.iter().max_by_key(|w| w.z_order).map(|w| w.id)
    }

    pub fn find_by_kind(&self, kind: WindowKind) -> Option<&WindowRecord> {
        self.windows.iter().find(|w| w.kind == kind)
    }

    /// Inserts `record` on top of the stack and focuses it.
    ///
    /// Any z-order carried by `record` is replaced.
    pub fn open(&mut self, mut record: WindowRecord) -> &WindowRecord {
        record.z_order = self.take_z();
        self.focused = Some(record.id);
        self.windows.push(record);
        let index = self.windows.len() - 1;
        &self.windows[index]
    }

    /// Raises and focuses `window_id` with a fresh z-order, even when it is already on top.
    ///
    /// Returns `false` only for unknown ids, which are ignored.
    pub fn focus(&mut self, window_id: WindowId) -> bool {
        let z_order = self.next_z;
        let Some(window) = self.windows.iter_mut().find(|w| w.id == window_id) else {
            return false;
        };
        window.z_order = z_order;
        self.next_z = self.next_z.saturating_add(1);
        self.focused = Some(window_id);
        true
    }

    /// Moves a normal window. A maximized window keeps its geometry.
    ///
    /// Moving a normal window discards any saved pre-maximize geometry.
    pub fn move_to(&mut self, window_id: WindowId, position: Point) -> SessionResult<bool> {
        let window = self.window_mut(window_id)?;
        if window.is_maximized {
            return Ok(false);
        }
        window.position = position;
        window.pre_maximize_state = None;
        Ok(true)
    }

    /// Resizes a normal window, clamped to `min`. A maximized window keeps its geometry.
    pub fn resize(&mut self, window_id: WindowId, size: Size, min: Size) -> SessionResult<bool> {
        let window = self.window_mut(window_id)?;
        if window.is_maximized {
            return Ok(false);
        }
        window.size = size.clamped_min(min);
        window.pre_maximize_state = None;
        Ok(true)
    }

    /// Normal to Maximized: saves the current geometry if none is saved, then fills `bounds`.
    pub fn maximize(&mut self, window_id: WindowId, bounds: Rect) -> SessionResult<bool> {
        let window = self.window_mut(window_id)?;
        if window.is_maximized {
            return Ok(false);
        }
        if window.pre_maximize_state.is_none() {
            window.pre_maximize_state = Some(window.rect());
        }
        window.position = bounds.position();
        window.size = bounds.size();
        window.is_maximized = true;
        Ok(true)
    }

    /// Maximized to Normal: applies the saved geometry, which stays recorded.
    pub fn restore(&mut self, window_id: WindowId) -> SessionResult<bool> {
        let window = self.window_mut(window_id)?;
        if !window.is_maximized {
            return Ok(false);
        }
        if let Some(saved) = window.pre_maximize_state {
            window.position = saved.position();
            window.size = saved.size();
        }
        window.is_maximized = false;
        Ok(true)
    }

    /// Removes a window. Focus is cleared if it was focused and is not reassigned.
    pub fn close(&mut self, window_id: WindowId) -> SessionResult<WindowRecord> {
        let index = self
            .windows
            .iter()
            .position(|w| w.id == window_id)
            .ok_or_else(|| SessionError::unknown(window_id))?;
        if self.focused == Some(window_id) {
            self.focused = None;
        }
        Ok(self.windows.remove(index))
    }

    pub fn set_title(&mut self, window_id: WindowId, title: impl Into<String>) -> SessionResult<()> {
        self.window_mut(window_id)?.title = title.into();
        Ok(())
    }

    /// Clears the folder association of every window showing `folder`.
    pub fn detach_folder(&mut self, folder: IconId) -> Vec<WindowId> {
        self.windows
            .iter_mut()
            .filter(|w| w.associated_folder == Some(folder))
            .map(|w| {
                w.associated_folder = None;
                w.id
            })
            .collect()
    }

    /// Re-fits every maximized window to new workspace bounds.
    pub fn refit_maximized(&mut self, bounds: Rect) -> Vec<WindowId> {
        self.windows
            .iter_mut()
            .filter(|w| w.is_maximized && w.rect() != bounds)
            .map(|w| {
                w.position = bounds.position();
                w.size = bounds.size();
                w.id
            })
            .collect()
    }

    /// Rebuilds a registry from stored records. The topmost window becomes focused.
    ///
    /// # Errors
    ///
    /// Returns a description of the first duplicate id or z-order found.
    pub(crate) fn from_records(records: Vec<WindowRecord>) -> Result<Self, String> {
        let mut ids = BTreeSet::new();
        let mut z_orders = BTreeSet::new();
        for record in &records {
            if !ids.insert(record.id) {
                return Err(format!("duplicate window id {}", record.id));
            }
            if !z_orders.insert(record.z_order) {
                return Err(format!("duplicate z-order {} on {}", record.z_order, record.id));
            }
        }
        let mut registry = Self {
            next_z: z_orders.last().map_or(1, |max| max.saturating_add(1)),
            windows: records,
            focused: None,
        };
        registry.focused = registry.topmost();
        Ok(registry)
    }

    pub(crate) fn records(&self) -> &[WindowRecord] {
        &self.windows
    }

    fn window_mut(&mut self, window_id: WindowId) -> SessionResult<&mut WindowRecord> {
        self.windows
            .iter_mut()
            .find(|w| w.id == window_id)
            .ok_or_else(|| SessionError::unknown(window_id))
    }

    fn take_z(&mut self) -> u64 {
        let z = self.next_z;
        self.next_z = self.next_z.saturating_add(1);
        z
    }
}
