//! Session configuration: workspace bounds, default geometry, and icon grid layout.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Point, Rect, Size};

/// Offsets applied to successive windows opened without explicit geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    pub origin: Point,
    pub step: i32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            origin: Point::new(100, 50),
            step: 20,
        }
    }
}

impl CascadeConfig {
    /// Position for the `index`-th live window.
    pub fn position_for(self, index: usize) -> Point {
        let offset = self.step.saturating_mul(index as i32);
        self.origin.offset(offset, offset)
    }
}

/// Desktop icon grid used when the engine has to pick a free spot itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconGridConfig {
    pub origin: Point,
    pub cell: i32,
    /// Two positions closer than this on both axes occupy the same cell.
    pub tolerance: i32,
    pub max_rows: u32,
}

impl Default for IconGridConfig {
    fn default() -> Self {
        Self {
            origin: Point::new(24, 24),
            cell: 94,
            tolerance: 10,
            max_rows: 10,
        }
    }
}

impl IconGridConfig {
    /// First cell, scanning row by row, not occupied by any of `taken`.
    pub fn first_free_cell(self, workspace_width: i32, taken: &[Point]) -> Point {
        let columns = (workspace_width / self.cell.max(1)).max(1);
        let tolerance = self.tolerance.unsigned_abs();
        let rows = i32::try_from(self.max_rows).unwrap_or(i32::MAX);
        for row in 0..rows {
            for col in 0..columns {
                let candidate = self.origin.offset(
                    col.saturating_mul(self.cell),
                    row.saturating_mul(self.cell),
                );
                let occupied = taken.iter().any(|pos| {
                    pos.x.abs_diff(candidate.x) < tolerance
                        && pos.y.abs_diff(candidate.y) < tolerance
                });
                if !occupied {
                    return candidate;
                }
            }
        }
        self.origin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bounds a maximized window fills.
    pub workspace: Rect,
    pub cascade: CascadeConfig,
    pub min_window_size: Size,
    pub icon_grid: IconGridConfig,
    pub new_folder_label: String,
    /// Seed a fresh session with the "My Computer" system icon.
    pub seed_system_root: bool,
    pub system_root_label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workspace: Rect::new(0, 0, 1024, 740),
            cascade: CascadeConfig::default(),
            min_window_size: Size::new(120, 80),
            icon_grid: IconGridConfig::default(),
            new_folder_label: "New Folder".to_string(),
            seed_system_root: true,
            system_root_label: "My Computer".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parses a TOML document; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or the workspace is empty.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        if config.workspace.is_empty() {
            return Err(ConfigError::EmptyWorkspace {
                w: config.workspace.w,
                h: config.workspace.h,
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SessionConfig::from_toml_str("").expect("parse");
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let config = SessionConfig::from_toml_str(
            r#"
            seed_system_root = false

            [workspace]
            x = 0
            y = 0
            w = 800
            h = 572

            [icon_grid]
            cell = 80
            "#,
        )
        .expect("parse");

        assert_eq!(config.workspace, Rect::new(0, 0, 800, 572));
        assert!(!config.seed_system_root);
        assert_eq!(config.icon_grid.cell, 80);
        assert_eq!(config.icon_grid.origin, Point::new(24, 24));
        assert_eq!(config.new_folder_label, "New Folder");
    }

    #[test]
    fn zero_sized_workspace_is_rejected() {
        let err = SessionConfig::from_toml_str("[workspace]\nx = 0\ny = 0\nw = 0\nh = 600\n")
            .expect_err("empty workspace");
        assert!(matches!(err, ConfigError::EmptyWorkspace { w: 0, h: 600 }));
    }

    #[test]
    fn malformed_document_reports_parse_error() {
        let err = SessionConfig::from_toml_str("workspace = 3").expect_err("bad type");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn free_cell_scan_skips_occupied_cells_row_by_row() {
        let grid = IconGridConfig::default();
        let taken = [Point::new(24, 24), Point::new(120, 26)];
        assert_eq!(grid.first_free_cell(1024, &taken), Point::new(212, 24));
    }

    #[test]
    fn free_cell_scan_wraps_to_next_row_when_width_is_exhausted() {
        let grid = IconGridConfig::default();
        let taken = [Point::new(24, 24)];
        assert_eq!(grid.first_free_cell(100, &taken), Point::new(24, 118));
    }

    #[test]
    fn free_cell_scan_tolerates_icons_at_extreme_coordinates() {
        let grid = IconGridConfig::default();
        let taken = [
            Point::new(i32::MIN, 0),
            Point::new(0, i32::MIN),
            Point::new(i32::MAX, i32::MAX),
            Point::new(24, 24),
        ];
        assert_eq!(grid.first_free_cell(1024, &taken), Point::new(118, 24));
    }

    #[test]
    fn oversized_grid_saturates_instead_of_wrapping() {
        let grid = IconGridConfig {
            origin: Point::new(0, i32::MAX - 10),
            cell: i32::MAX,
            ..IconGridConfig::default()
        };
        let taken = [grid.origin];
        assert_eq!(grid.first_free_cell(1024, &taken), Point::new(0, i32::MAX));
    }

    #[test]
    fn cascade_offsets_by_window_count() {
        let cascade = CascadeConfig::default();
        assert_eq!(cascade.position_for(0), Point::new(100, 50));
        assert_eq!(cascade.position_for(2), Point::new(140, 90));
    }
}
