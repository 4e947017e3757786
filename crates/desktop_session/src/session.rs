//! The session facade: single owner of all engine state and entry point for every command.

use std::fmt;

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::icon_tree::IconTree;
use crate::ids::IdAllocator;
use crate::model::{
    ChangeSet, ConflictResolution, Icon, IconId, NewIcon, OpenWindowRequest, Point, Rect, Size,
    TransferMode, WindowId, WindowKind, WindowRecord,
};
use crate::selection::SelectionTracker;
use crate::snapshot::{self, SessionSnapshot};
use crate::transfer::{self, Clipboard, PasteReport};
use crate::window_registry::WindowRegistry;

/// Observer called with the change set of every command that changed something.
pub type ChangeListener = Box<dyn FnMut(&ChangeSet)>;

/// Headless desktop state: windows, icons, clipboard, selection, and rename mode.
///
/// Commands run to completion one at a time. Structural icon commands either apply fully
/// or leave the session untouched, and successful commands notify subscribed listeners.
pub struct DesktopSession {
    config: SessionConfig,
    ids: IdAllocator,
    icons: IconTree,
    windows: WindowRegistry,
    clipboard: Clipboard,
    selection: SelectionTracker,
    editing: Option<IconId>,
    listeners: Vec<ChangeListener>,
}

impl fmt::Debug for DesktopSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopSession")
            .field("config", &self.config)
            .field("icons", &self.icons)
            .field("windows", &self.windows)
            .field("clipboard", &self.clipboard)
            .field("selection", &self.selection)
            .field("editing", &self.editing)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for DesktopSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl DesktopSession {
    /// Creates an empty session, seeded with the system icon when configured.
    pub fn new(config: SessionConfig) -> Self {
        let mut session = Self::empty(config);
        if session.config.seed_system_root {
            let id = session.ids.next_icon_id();
            let seed = NewIcon::system_root(session.config.system_root_label.clone())
                .at(session.config.icon_grid.origin);
            if let Err(err) = session.icons.insert(id, seed) {
                log::warn!("failed to seed system icon: {err}");
            }
        }
        session
    }

    /// Creates a session from a persisted snapshot after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CorruptSnapshot`] when the snapshot violates an invariant.
    pub fn from_snapshot(config: SessionConfig, snapshot: SessionSnapshot) -> SessionResult<Self> {
        let mut session = Self::empty(config);
        session.load_snapshot(snapshot)?;
        Ok(session)
    }

    fn empty(config: SessionConfig) -> Self {
        Self {
            config,
            ids: IdAllocator::default(),
            icons: IconTree::new(),
            windows: WindowRegistry::new(),
            clipboard: Clipboard::default(),
            selection: SelectionTracker::new(),
            editing: None,
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeSet) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // Windows

    /// Opens a window on top of the stack and focuses it.
    ///
    /// Omitted geometry and title fall back to the cascade position and per-kind defaults.
    pub fn open_window(&mut self, request: OpenWindowRequest) -> WindowId {
        let window_id = self.ids.next_window_id();
        let associated_folder = request.associated_folder.filter(|folder| {
            let live = self.icons.get(*folder).is_some_and(Icon::is_folder);
            if !live {
                log::warn!("{window_id}: ignoring association with non-folder {folder}");
            }
            live
        });
        let title = request.title.unwrap_or_else(|| {
            request
                .kind
                .default_title(request.associated_filename.as_deref())
        });
        let record = WindowRecord {
            id: window_id,
            kind: request.kind,
            position: request
                .position
                .unwrap_or_else(|| self.config.cascade.position_for(self.windows.len())),
            size: request
                .size
                .unwrap_or_else(|| request.kind.default_size())
                .clamped_min(self.config.min_window_size),
            title,
            z_order: 0,
            is_maximized: false,
            pre_maximize_state: None,
            associated_filename: request.associated_filename,
            associated_folder,
        };
        self.windows.open(record);
        self.commit("open_window", ChangeSet::window(window_id));
        window_id
    }

    /// Raises and focuses a window, taking a fresh z-order every time. Stale ids are ignored.
    pub fn focus_window(&mut self, window_id: WindowId) -> ChangeSet {
        if !self.windows.focus(window_id) {
            log::trace!("focus_window: ignoring stale {window_id}");
            return ChangeSet::default();
        }
        self.commit("focus_window", ChangeSet::window(window_id))
    }

    pub fn move_window(&mut self, window_id: WindowId, position: Point) -> SessionResult<ChangeSet> {
        let moved = self.windows.move_to(window_id, position)?;
        Ok(self.commit_window("move_window", window_id, moved))
    }

    pub fn resize_window(&mut self, window_id: WindowId, size: Size) -> SessionResult<ChangeSet> {
        let resized = self
            .windows
            .resize(window_id, size, self.config.min_window_size)?;
        Ok(self.commit_window("resize_window", window_id, resized))
    }

    pub fn maximize_window(&mut self, window_id: WindowId) -> SessionResult<ChangeSet> {
        let maximized = self.windows.maximize(window_id, self.config.workspace)?;
        Ok(self.commit_window("maximize_window", window_id, maximized))
    }

    pub fn restore_window(&mut self, window_id: WindowId) -> SessionResult<ChangeSet> {
        let restored = self.windows.restore(window_id)?;
        Ok(self.commit_window("restore_window", window_id, restored))
    }

    pub fn close_window(&mut self, window_id: WindowId) -> SessionResult<ChangeSet> {
        self.windows.close(window_id)?;
        Ok(self.commit("close_window", ChangeSet::window(window_id)))
    }

    pub fn set_window_title(
        &mut self,
        window_id: WindowId,
        title: impl Into<String>,
    ) -> SessionResult<ChangeSet> {
        self.windows.set_title(window_id, title)?;
        Ok(self.commit("set_window_title", ChangeSet::window(window_id)))
    }

    /// Changes the workspace bounds and re-fits maximized windows to them.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyWorkspace`] when `bounds` has no area. The current
    /// bounds are kept.
    pub fn set_workspace_bounds(&mut self, bounds: Rect) -> SessionResult<ChangeSet> {
        if bounds.is_empty() {
            return Err(SessionError::EmptyWorkspace {
                w: bounds.w,
                h: bounds.h,
            });
        }
        self.config.workspace = bounds;
        let mut changes = ChangeSet::default();
        for window_id in self.windows.refit_maximized(bounds) {
            changes.touch_window(window_id);
        }
        Ok(self.commit("set_workspace_bounds", changes))
    }

    // Icons

    /// Adds an icon and returns its fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidParent`] when the parent is not a live folder.
    pub fn add_icon(&mut self, icon: NewIcon) -> SessionResult<IconId> {
        let id = self.ids.next_icon_id();
        let parent = self.icons.insert(id, icon)?.parent;
        self.commit("add_icon", ChangeSet::location(parent));
        Ok(id)
    }

    /// Creates a uniquely named folder at the first free grid cell, selects it, and puts it
    /// into rename mode.
    pub fn create_folder(&mut self, parent: Option<IconId>) -> SessionResult<IconId> {
        let label = transfer::suffixed_label(
            &self.icons.labels_in(parent, None),
            &self.config.new_folder_label,
        );
        let taken = self
            .icons
            .children_in(parent)
            .into_iter()
            .map(|icon| icon.position)
            .collect::<Vec<_>>();
        let position = self
            .config
            .icon_grid
            .first_free_cell(self.config.workspace.w, &taken);

        let id = self.ids.next_icon_id();
        self.icons
            .insert(id, NewIcon::folder(label).at(position).with_parent(parent))?;
        self.selection.select(&self.icons, id, false)?;
        self.editing = Some(id);
        self.commit("create_folder", ChangeSet::location(parent));
        Ok(id)
    }

    /// Sets an icon's label as given. Uniqueness is not enforced here.
    pub fn rename_icon(&mut self, icon_id: IconId, label: impl Into<String>) -> SessionResult<ChangeSet> {
        let parent = self.icons.rename(icon_id, label)?.parent;
        Ok(self.commit("rename_icon", ChangeSet::location(parent)))
    }

    pub fn reposition_icon(&mut self, icon_id: IconId, position: Point) -> SessionResult<ChangeSet> {
        let parent = self.icons.reposition(icon_id, position)?.parent;
        Ok(self.commit("reposition_icon", ChangeSet::location(parent)))
    }

    /// Deletes an icon, and its subtree when `cascade` is set.
    ///
    /// Windows showing a deleted folder lose their folder association.
    pub fn remove_icon(&mut self, icon_id: IconId, cascade: bool) -> SessionResult<ChangeSet> {
        let removed = self.icons.remove(icon_id, cascade)?;
        let mut changes = ChangeSet::default();
        if let Some(first) = removed.first() {
            changes.touch_location(first.parent);
        }
        for icon in &removed {
            for window_id in self.windows.detach_folder(icon.id) {
                changes.touch_window(window_id);
            }
        }
        self.after_icon_removal();
        Ok(self.commit("remove_icon", changes))
    }

    /// Moves an icon under a new parent without any label checks.
    pub fn reparent_icon(
        &mut self,
        icon_id: IconId,
        parent: Option<IconId>,
    ) -> SessionResult<ChangeSet> {
        let mut changes = ChangeSet::default();
        if let Some(previous) = self.icons.reparent(icon_id, parent)? {
            changes.touch_location(previous);
            changes.touch_location(parent);
        }
        Ok(self.commit("reparent_icon", changes))
    }

    // Selection

    pub fn select_icon(&mut self, icon_id: IconId, additive: bool) -> SessionResult<ChangeSet> {
        let previous = self.selection.scope(&self.icons);
        self.selection.select(&self.icons, icon_id, additive)?;
        let mut changes = ChangeSet::default();
        if let Some(scope) = previous {
            changes.touch_location(scope);
        }
        if let Some(scope) = self.selection.scope(&self.icons) {
            changes.touch_location(scope);
        }
        Ok(self.commit("select_icon", changes))
    }

    pub fn clear_selection(&mut self) -> ChangeSet {
        let scope = self.selection.scope(&self.icons);
        self.selection.clear();
        self.commit("clear_selection", scope.map(ChangeSet::location).unwrap_or_default())
    }

    // Clipboard and transfers

    /// Replaces the clipboard content.
    ///
    /// Locations holding newly cut or previously cut icons are reported so views can
    /// update their cut styling.
    pub fn stage_clipboard(
        &mut self,
        mode: TransferMode,
        items: &[IconId],
    ) -> SessionResult<ChangeSet> {
        let mut changes = self.cut_locations();
        transfer::stage(&self.icons, &mut self.clipboard, mode, items)?;
        changes.merge(self.cut_locations());
        Ok(self.commit("stage_clipboard", changes))
    }

    /// Stages the current selection.
    pub fn stage_selection(&mut self, mode: TransferMode) -> SessionResult<ChangeSet> {
        let items = self.current_selection();
        self.stage_clipboard(mode, &items)
    }

    /// Pastes the clipboard into `target` (`None` is the desktop root).
    pub fn paste_clipboard(&mut self, target: Option<IconId>) -> SessionResult<PasteReport> {
        let mut report = self.transact(|icons, clipboard, ids| {
            transfer::paste(icons, clipboard, ids, target)
        })?;
        report.changes = self.commit("paste_clipboard", report.changes);
        Ok(report)
    }

    /// Moves an icon for a direct drop, surfacing [`SessionError::NameConflict`] instead of
    /// overwriting a same-named icon at the destination.
    pub fn move_with_conflict_check(
        &mut self,
        icon_id: IconId,
        target: Option<IconId>,
    ) -> SessionResult<ChangeSet> {
        let changes = self.transact(|icons, _, _| {
            transfer::move_with_conflict_check(icons, icon_id, target)
        })?;
        Ok(self.commit("move_with_conflict_check", changes))
    }

    /// Applies the caller's choice after a [`SessionError::NameConflict`].
    pub fn resolve_conflict(
        &mut self,
        icon_id: IconId,
        target: Option<IconId>,
        resolution: ConflictResolution,
    ) -> SessionResult<ChangeSet> {
        let mut changes = self.transact(|icons, _, _| {
            transfer::resolve_conflict(icons, icon_id, target, resolution)
        })?;
        let removed_windows = self.detach_missing_folders();
        for window_id in removed_windows {
            changes.touch_window(window_id);
        }
        self.after_icon_removal();
        Ok(self.commit("resolve_conflict", changes))
    }

    // In-place rename

    pub fn begin_rename(&mut self, icon_id: IconId) -> SessionResult<()> {
        if !self.icons.contains(icon_id) {
            return Err(SessionError::unknown(icon_id));
        }
        self.editing = Some(icon_id);
        Ok(())
    }

    /// Ends rename mode, applying the trimmed label unless it is empty.
    pub fn commit_rename(&mut self, label: &str) -> SessionResult<ChangeSet> {
        let Some(icon_id) = self.editing.take() else {
            return Ok(ChangeSet::default());
        };
        let label = label.trim();
        if label.is_empty() {
            return Ok(ChangeSet::default());
        }
        self.rename_icon(icon_id, label)
    }

    pub fn cancel_rename(&mut self) {
        self.editing = None;
    }

    pub fn editing_icon(&self) -> Option<IconId> {
        self.editing.filter(|id| self.icons.contains(*id))
    }

    // Queries

    /// Live windows from back to front.
    pub fn list_windows(&self) -> Vec<&WindowRecord> {
        self.windows.stacked()
    }

    pub fn get_window(&self, window_id: WindowId) -> Option<&WindowRecord> {
        self.windows.get(window_id)
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.windows.focused()
    }

    pub fn topmost_window(&self) -> Option<WindowId> {
        self.windows.topmost()
    }

    pub fn find_window_by_kind(&self, kind: WindowKind) -> Option<&WindowRecord> {
        self.windows.find_by_kind(kind)
    }

    pub fn list_children(&self, folder_id: IconId) -> Vec<&Icon> {
        self.icons.children_of(folder_id)
    }

    pub fn desktop_icons(&self) -> Vec<&Icon> {
        self.icons.desktop_icons()
    }

    pub fn get_icon(&self, icon_id: IconId) -> Option<&Icon> {
        self.icons.get(icon_id)
    }

    pub fn icon_tree(&self) -> &IconTree {
        &self.icons
    }

    pub fn current_selection(&self) -> Vec<IconId> {
        self.selection.selected(&self.icons)
    }

    pub fn clipboard_state(&self) -> &Clipboard {
        &self.clipboard
    }

    // Persistence

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.windows, &self.icons)
    }

    /// Replaces windows and icons with a validated snapshot.
    ///
    /// Clipboard, selection and rename mode are reset. A rejected snapshot leaves the
    /// session unchanged.
    pub fn load_snapshot(&mut self, snapshot: SessionSnapshot) -> SessionResult<ChangeSet> {
        let restored = snapshot::restore(snapshot).inspect_err(|err| {
            log::warn!("rejecting session snapshot: {err}");
        })?;

        let mut changes = ChangeSet::default();
        changes.desktop = true;
        changes.affected_folders.extend(
            self.icons
                .folder_index()
                .into_keys()
                .chain(restored.icons.folder_index().into_keys()),
        );
        changes.affected_windows.extend(
            self.windows
                .records()
                .iter()
                .chain(restored.windows.records())
                .map(|w| w.id),
        );

        let mut ids = restored.ids;
        ids.observe(
            self.windows.records().iter().map(|w| w.id),
            self.icons.icons().into_iter().map(|icon| icon.id),
        );
        self.ids = ids;
        self.icons = restored.icons;
        self.windows = restored.windows;
        let refit = self.windows.refit_maximized(self.config.workspace);
        if !refit.is_empty() {
            log::debug!("load_snapshot: refit {} maximized windows to workspace", refit.len());
        }
        self.clipboard.clear();
        self.selection.clear();
        self.editing = None;
        Ok(self.commit("load_snapshot", changes))
    }

    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut IconTree, &mut Clipboard, &mut IdAllocator) -> SessionResult<T>,
    ) -> SessionResult<T> {
        let mut icons = self.icons.clone();
        let mut clipboard = self.clipboard.clone();
        let value = op(&mut icons, &mut clipboard, &mut self.ids)?;
        self.icons = icons;
        self.clipboard = clipboard;
        Ok(value)
    }

    fn cut_locations(&self) -> ChangeSet {
        let mut changes = ChangeSet::default();
        if self.clipboard.mode() == crate::model::ClipboardMode::Cut {
            for icon in self.clipboard.items().iter().filter_map(|id| self.icons.get(*id)) {
                changes.touch_location(icon.parent);
            }
        }
        changes
    }

    fn detach_missing_folders(&mut self) -> Vec<WindowId> {
        let stale = self
            .windows
            .records()
            .iter()
            .filter_map(|w| w.associated_folder)
            .filter(|folder| !self.icons.contains(*folder))
            .collect::<Vec<_>>();
        stale
            .into_iter()
            .flat_map(|folder| self.windows.detach_folder(folder))
            .collect()
    }

    fn after_icon_removal(&mut self) {
        self.selection.prune(&self.icons);
        self.clipboard.prune(&self.icons);
        if self.editing.is_some_and(|id| !self.icons.contains(id)) {
            self.editing = None;
        }
    }

    fn commit_window(&mut self, command: &str, window_id: WindowId, changed: bool) -> ChangeSet {
        if !changed {
            log::trace!("{command}: no change for {window_id}");
            return ChangeSet::default();
        }
        self.commit(command, ChangeSet::window(window_id))
    }

    fn commit(&mut self, command: &str, changes: ChangeSet) -> ChangeSet {
        if changes.is_empty() {
            return changes;
        }
        log::debug!(
            "{command}: folders={:?} desktop={} windows={:?}",
            changes.affected_folders,
            changes.desktop,
            changes.affected_windows
        );
        for listener in &mut self.listeners {
            listener(&changes);
        }
        changes
    }
}
