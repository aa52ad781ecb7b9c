//! Item footprints.
//!
//! A [`ShapeMask`] records which cells of an item's bounding box the item
//! actually occupies. Masks are stored in authoring orientation; rotation is
//! applied by [`crate::Item`] when it queries the mask.

use serde::{Deserialize, Serialize};

use crate::GridSize;

/// Occupied-cell mask relative to an item's bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeMask {
    size: GridSize,
    /// Row-major occupancy, `dy * width + dx`. `None` means a full rectangle.
    cells: Option<Vec<bool>>,
}

impl ShapeMask {
    /// A mask covering every cell of a `size` box.
    pub fn full(size: GridSize) -> Self {
        Self { size, cells: None }
    }

    /// Build a mask from text rows, top row first.
    ///
    /// `#` (or `X`/`x`) marks an occupied cell; anything else is empty. Short
    /// rows are padded with empty cells. Returns `None` when no cell is
    /// occupied.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Option<Self> {
        let height = rows.len() as i32;
        let width = rows
            .iter()
            .map(|row| row.as_ref().chars().count())
            .max()
            .unwrap_or(0) as i32;
        if width == 0 || height == 0 {
            return None;
        }

        let mut cells = vec![false; (width * height) as usize];
        for (row_index, row) in rows.iter().enumerate() {
            // Text is written top row first; dy = 0 is the anchor (bottom) row.
            let dy = height - 1 - row_index as i32;
            for (dx, ch) in row.as_ref().chars().enumerate() {
                if matches!(ch, '#' | 'X' | 'x') {
                    cells[(dy * width + dx as i32) as usize] = true;
                }
            }
        }

        if !cells.iter().any(|&c| c) {
            return None;
        }
        if cells.iter().all(|&c| c) {
            return Some(Self::full(GridSize::new(width, height)));
        }
        Some(Self {
            size: GridSize::new(width, height),
            cells: Some(cells),
        })
    }

    /// Authoring-orientation extents.
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// True for a plain rectangle.
    pub fn is_full(&self) -> bool {
        self.cells.is_none()
    }

    /// Whether authoring-orientation cell `(dx, dy)` is occupied.
    pub fn get(&self, dx: i32, dy: i32) -> bool {
        if dx < 0 || dy < 0 || dx >= self.size.width || dy >= self.size.height {
            return false;
        }
        match &self.cells {
            None => true,
            Some(cells) => cells[(dy * self.size.width + dx) as usize],
        }
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        match &self.cells {
            None => self.size.area() as usize,
            Some(cells) => cells.iter().filter(|&&c| c).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_read_top_first() {
        // L shape: long bar on the left, foot at the bottom right.
        let mask = ShapeMask::from_rows(&["#.", "#.", "##"]).unwrap();
        assert_eq!(mask.size(), GridSize::new(2, 3));
        assert!(mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(mask.get(0, 2));
        assert!(!mask.get(1, 2));
        assert_eq!(mask.occupied_count(), 4);
    }

    #[test]
    fn dense_rows_collapse_to_full() {
        let mask = ShapeMask::from_rows(&["##", "##"]).unwrap();
        assert!(mask.is_full());
    }

    #[test]
    fn empty_rows_are_rejected() {
        assert!(ShapeMask::from_rows(&["..", ".."]).is_none());
        assert!(ShapeMask::from_rows::<&str>(&[]).is_none());
    }

    #[test]
    fn out_of_box_cells_are_empty() {
        let mask = ShapeMask::full(GridSize::new(2, 2));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(0, -1));
    }
}
