#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod item;
pub mod registry;
pub mod shape;

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use item::Item;
pub use registry::{ItemFactory, ItemTemplate, TemplateError};
pub use shape::ShapeMask;

/// Integer cell coordinate on a container grid.
///
/// `x` is the column (left to right), `y` is the row index. Row `height - 1`
/// is the top row of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPoint {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl GridPoint {
    /// Grid origin.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new grid point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset this point by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Width/height extents in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    /// Extent along x.
    pub width: i32,
    /// Extent along y.
    pub height: i32,
}

impl GridSize {
    /// Create a new size.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// The same extents with width and height exchanged.
    pub fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Number of cells covered by the full rectangle.
    pub fn area(self) -> i32 {
        self.width.max(0) * self.height.max(0)
    }

    /// Whether a `size`-sized box fits inside these extents at all.
    pub fn fits(self, size: GridSize) -> bool {
        size.width <= self.width && size.height <= self.height
    }
}

/// Opaque unique identifier used to look an item up across containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuntimeId(pub u64);

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Placement semantics of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One logical slot; coordinates are ignored and the item is centred.
    Single,
    /// Full 2D spatial packing.
    #[default]
    Grid,
    /// Full 2D spatial packing, drawn in layers.
    Layered,
}

impl RenderMode {
    /// True when coordinates take part in placement.
    pub fn is_spatial(self) -> bool {
        !matches!(self, RenderMode::Single)
    }
}
