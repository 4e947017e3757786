use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SESSION_SNAPSHOT_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_WINDOW_WIDTH: i32 = 400;
pub const DEFAULT_WINDOW_HEIGHT: i32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IconId(pub u64);

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "icon-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }

    pub fn clamped_min(self, min: Size) -> Self {
        Self {
            w: self.w.max(min.w),
            h: self.h.max(min.h),
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self {
            w: DEFAULT_WINDOW_WIDTH,
            h: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

/// Axis-aligned rectangle used for workspace bounds and saved window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_parts(position: Point, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            w: size.w,
            h: size.h,
        }
    }

    pub fn position(self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(self) -> Size {
        Size::new(self.w, self.h)
    }

    /// True when the rectangle has no area.
    pub fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowKind {
    Default,
    Notepad,
    Calculator,
    Explorer,
    Paint,
    FileManager,
    TextFile,
    MyComputer,
}

impl WindowKind {
    pub fn default_size(self) -> Size {
        match self {
            Self::Notepad | Self::TextFile => Size::new(480, 360),
            Self::Calculator => Size::new(260, 320),
            Self::Explorer | Self::MyComputer => Size::new(440, 320),
            Self::Paint => Size::new(600, 450),
            Self::FileManager => Size::new(520, 400),
            Self::Default => Size::default(),
        }
    }

    /// Title shown when the open request does not supply one.
    pub fn default_title(self, filename: Option<&str>) -> String {
        match (self, filename) {
            (Self::Notepad, Some(name)) => format!("{name} - Notepad"),
            (Self::Notepad, None) => "Untitled - Notepad".to_string(),
            (Self::Calculator, _) => "Calculator".to_string(),
            (Self::Explorer, _) => "Windows Explorer".to_string(),
            (Self::MyComputer, _) => "My Computer".to_string(),
            (Self::Paint, _) => "Untitled - Paint".to_string(),
            (Self::FileManager, _) => "File Manager".to_string(),
            (Self::TextFile, name) => name.unwrap_or("Untitled").to_string(),
            (Self::Default, name) => name.unwrap_or("Window").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: WindowId,
    pub kind: WindowKind,
    pub position: Point,
    pub size: Size,
    pub title: String,
    pub z_order: u64,
    pub is_maximized: bool,
    /// Geometry captured on the last Normal to Maximized transition.
    pub pre_maximize_state: Option<Rect>,
    pub associated_filename: Option<String>,
    pub associated_folder: Option<IconId>,
}

impl WindowRecord {
    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindowRequest {
    pub kind: WindowKind,
    pub title: Option<String>,
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub associated_filename: Option<String>,
    pub associated_folder: Option<IconId>,
}

impl OpenWindowRequest {
    pub fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            title: None,
            position: None,
            size: None,
            associated_filename: None,
            associated_folder: None,
        }
    }
}

/// Flat kind tag for an icon, projected from [`IconContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconKind {
    Folder,
    Document,
    Shortcut,
    SystemRoot,
}

/// What an icon stands for. Only documents carry a payload blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IconContent {
    Folder,
    Document { payload: Option<Value> },
    Shortcut { target: WindowKind },
    SystemRoot,
}

impl IconContent {
    pub fn kind(&self) -> IconKind {
        match self {
            Self::Folder => IconKind::Folder,
            Self::Document { .. } => IconKind::Document,
            Self::Shortcut { .. } => IconKind::Shortcut,
            Self::SystemRoot => IconKind::SystemRoot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub id: IconId,
    pub label: String,
    pub position: Point,
    /// `None` places the icon on the desktop root.
    pub parent: Option<IconId>,
    pub content: IconContent,
}

impl Icon {
    pub fn kind(&self) -> IconKind {
        self.content.kind()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.content, IconContent::Folder)
    }

    pub fn is_system_root(&self) -> bool {
        matches!(self.content, IconContent::SystemRoot)
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.content {
            IconContent::Document { payload } => payload.as_ref(),
            _ => None,
        }
    }
}

/// Value-type request for `add_icon`; the session assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIcon {
    pub label: String,
    pub position: Point,
    pub parent: Option<IconId>,
    pub content: IconContent,
}

impl NewIcon {
    pub fn new(label: impl Into<String>, content: IconContent) -> Self {
        Self {
            label: label.into(),
            position: Point::default(),
            parent: None,
            content,
        }
    }

    pub fn folder(label: impl Into<String>) -> Self {
        Self::new(label, IconContent::Folder)
    }

    pub fn document(label: impl Into<String>, payload: Option<Value>) -> Self {
        Self::new(label, IconContent::Document { payload })
    }

    pub fn shortcut(label: impl Into<String>, target: WindowKind) -> Self {
        Self::new(label, IconContent::Shortcut { target })
    }

    pub fn system_root(label: impl Into<String>) -> Self {
        Self::new(label, IconContent::SystemRoot)
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn in_folder(mut self, parent: IconId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_parent(mut self, parent: Option<IconId>) -> Self {
        self.parent = parent;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    Copy,
    Cut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipboardMode {
    #[default]
    Empty,
    Copy,
    Cut,
}

impl From<TransferMode> for ClipboardMode {
    fn from(mode: TransferMode) -> Self {
        match mode {
            TransferMode::Copy => Self::Copy,
            TransferMode::Cut => Self::Cut,
        }
    }
}

/// Caller's answer to a `NameConflict` raised by a direct drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// Delete the existing icon (and its subtree), then move the dropped icon in.
    Replace,
    /// Move the dropped icon in next to the existing one under a `Copy of` label.
    CreateCopy,
}

/// Diff descriptor returned by every mutating command.
///
/// `desktop` marks the root scope, which has no icon id of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub affected_folders: BTreeSet<IconId>,
    pub desktop: bool,
    pub affected_windows: BTreeSet<WindowId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.affected_folders.is_empty() && !self.desktop && self.affected_windows.is_empty()
    }

    pub fn window(window_id: WindowId) -> Self {
        let mut changes = Self::default();
        changes.touch_window(window_id);
        changes
    }

    pub fn location(parent: Option<IconId>) -> Self {
        let mut changes = Self::default();
        changes.touch_location(parent);
        changes
    }

    pub fn touch_location(&mut self, parent: Option<IconId>) {
        match parent {
            Some(folder) => {
                self.affected_folders.insert(folder);
            }
            None => self.desktop = true,
        }
    }

    pub fn touch_window(&mut self, window_id: WindowId) {
        self.affected_windows.insert(window_id);
    }

    pub fn merge(&mut self, other: ChangeSet) {
        self.affected_folders.extend(other.affected_folders);
        self.desktop |= other.desktop;
        self.affected_windows.extend(other.affected_windows);
    }
}
