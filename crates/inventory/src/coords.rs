//! Pointer-to-cell mapping used by interaction front ends.
//!
//! Local pointer coordinates are measured from the container's centre, with
//! `y` growing towards the top row.

use gridstash_core::{GridPoint, GridSize};
use serde::{Deserialize, Serialize};

/// Pixel size of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellLayout {
    /// Cell width in pixels.
    pub cell_width_px: f32,
    /// Cell height in pixels.
    pub cell_height_px: f32,
}

impl Default for CellLayout {
    fn default() -> Self {
        Self {
            cell_width_px: 64.0,
            cell_height_px: 64.0,
        }
    }
}

impl CellLayout {
    /// Create a layout with square cells.
    pub fn square(cell_px: f32) -> Self {
        Self {
            cell_width_px: cell_px,
            cell_height_px: cell_px,
        }
    }

    /// Container extents in pixels.
    pub fn container_px(&self, grid: GridSize) -> (f32, f32) {
        (
            grid.width as f32 * self.cell_width_px,
            grid.height as f32 * self.cell_height_px,
        )
    }

    /// Map a centre-relative pointer position to a cell.
    ///
    /// The result may lie outside the grid; see [`Self::cell_in_grid`].
    pub fn cell_at(&self, grid: GridSize, local_x: f32, local_y: f32) -> GridPoint {
        let (width_px, height_px) = self.container_px(grid);
        GridPoint::new(
            ((local_x + width_px / 2.0) / self.cell_width_px).floor() as i32,
            ((local_y + height_px / 2.0) / self.cell_height_px).floor() as i32,
        )
    }

    /// Map a pointer position to a cell, or `None` when it is outside the grid.
    pub fn cell_in_grid(&self, grid: GridSize, local_x: f32, local_y: f32) -> Option<GridPoint> {
        let cell = self.cell_at(grid, local_x, local_y);
        let inside = cell.x >= 0 && cell.y >= 0 && cell.x < grid.width && cell.y < grid.height;
        inside.then_some(cell)
    }
}

/// Whether a press at `press` has moved far enough to start a drag.
pub fn exceeds_drag_threshold(press: (f32, f32), current: (f32, f32), threshold_px: f32) -> bool {
    let dx = current.0 - press.0;
    let dy = current.1 - press.1;
    dx * dx + dy * dy > threshold_px * threshold_px
}
