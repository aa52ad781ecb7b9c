//! Item system - geometry and stacking identity of a single inventory entry

use serde::{Deserialize, Serialize};

use crate::{GridPoint, GridSize, RuntimeId, ShapeMask};

/// A single inventory entry.
///
/// `width`/`height` always describe the current orientation. Toggling
/// rotation through [`Item::rotate`] exchanges them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique lookup identifier
    pub runtime_id: RuntimeId,
    /// Stacking identity key
    pub item_name: String,
    /// Anchor cell of the bounding box
    pub position: GridPoint,
    /// Current extent along x
    pub width: i32,
    /// Current extent along y
    pub height: i32,
    /// Whether the footprint is transposed relative to its authoring orientation
    pub rotated: bool,
    /// Occupied cells in authoring orientation
    pub shape: ShapeMask,
    /// Whether identical items merge into this one
    pub stackable: bool,
    /// Units in this stack
    pub quantity: u32,
    /// Stack capacity
    pub max_quantity: u32,
    /// Whether the item may be ejected into the world
    pub can_drop: bool,
}

impl Item {
    /// Create a non-stackable rectangular item of one unit.
    pub fn new(runtime_id: RuntimeId, item_name: impl Into<String>, size: GridSize) -> Self {
        Self {
            runtime_id,
            item_name: item_name.into(),
            position: GridPoint::ZERO,
            width: size.width,
            height: size.height,
            rotated: false,
            shape: ShapeMask::full(size),
            stackable: false,
            quantity: 1,
            max_quantity: 1,
            can_drop: true,
        }
    }

    /// Make this item stackable with the given quantity and capacity.
    pub fn with_stack(mut self, quantity: u32, max_quantity: u32) -> Self {
        self.stackable = true;
        self.max_quantity = max_quantity.max(1);
        self.quantity = quantity.min(self.max_quantity);
        self
    }

    /// Replace the footprint. The mask size becomes the item's authoring size.
    pub fn with_shape(mut self, shape: ShapeMask) -> Self {
        let size = shape.size();
        self.width = size.width;
        self.height = size.height;
        self.rotated = false;
        self.shape = shape;
        self
    }

    /// Set the droppable capability.
    pub fn with_can_drop(mut self, can_drop: bool) -> Self {
        self.can_drop = can_drop;
        self
    }

    /// Set the anchor position.
    pub fn at(mut self, position: GridPoint) -> Self {
        self.position = position;
        self
    }

    /// Current bounding-box extents.
    pub fn size(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }

    /// Toggle orientation, exchanging width and height.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.width, &mut self.height);
        self.rotated = !self.rotated;
    }

    /// Whether bounding-box cell `(dx, dy)` is part of this item in its current orientation.
    pub fn covers_local(&self, dx: i32, dy: i32) -> bool {
        if dx < 0 || dy < 0 || dx >= self.width || dy >= self.height {
            return false;
        }
        if self.rotated {
            self.shape.get(dy, dx)
        } else {
            self.shape.get(dx, dy)
        }
    }

    /// Whether grid cell `point` is occupied by this item at its current position.
    pub fn covers(&self, point: GridPoint) -> bool {
        self.covers_local(point.x - self.position.x, point.y - self.position.y)
    }

    /// Every grid cell this item occupies if anchored at `anchor`.
    pub fn cells_at(&self, anchor: GridPoint) -> impl Iterator<Item = GridPoint> + '_ {
        (0..self.height).flat_map(move |dy| {
            (0..self.width)
                .filter(move |&dx| self.covers_local(dx, dy))
                .map(move |dx| anchor.offset(dx, dy))
        })
    }

    /// Every grid cell this item occupies at its current position.
    pub fn occupied_cells(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.cells_at(self.position)
    }

    /// Whether this item, anchored at `anchor`, shares a cell with `other` at its position.
    pub fn overlaps_at(&self, anchor: GridPoint, other: &Item) -> bool {
        // Cheap bounding-box rejection before the per-cell test.
        let disjoint = anchor.x >= other.position.x + other.width
            || other.position.x >= anchor.x + self.width
            || anchor.y >= other.position.y + other.height
            || other.position.y >= anchor.y + self.height;
        if disjoint {
            return false;
        }
        self.cells_at(anchor).any(|cell| other.covers(cell))
    }

    /// Check if this item stacks with another item.
    pub fn can_merge(&self, other: &Item) -> bool {
        self.stackable && other.stackable && self.item_name == other.item_name
    }

    /// Check if this stack is at max capacity.
    pub fn is_full(&self) -> bool {
        self.quantity >= self.max_quantity
    }

    /// Get remaining space in this stack.
    pub fn remaining_space(&self) -> u32 {
        self.max_quantity.saturating_sub(self.quantity)
    }

    /// Move as many units from `source` into `self` as fit, returning the amount moved.
    pub fn absorb(&mut self, source: &mut Item) -> u32 {
        if !self.can_merge(source) {
            return 0;
        }
        let moved = self.remaining_space().min(source.quantity);
        self.quantity += moved;
        source.quantity -= moved;
        moved
    }

    /// Split `amount` units off into a new item carrying `runtime_id`.
    ///
    /// Returns `None` unless `0 < amount < quantity`; the source is left
    /// untouched in that case.
    pub fn split_off(&mut self, amount: u32, runtime_id: RuntimeId) -> Option<Item> {
        if !self.stackable || amount == 0 || amount >= self.quantity {
            return None;
        }
        self.quantity -= amount;
        let mut split = self.clone();
        split.runtime_id = runtime_id;
        split.quantity = amount;
        Some(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ammo(id: u64, quantity: u32) -> Item {
        Item::new(RuntimeId(id), "Ammo", GridSize::new(1, 1)).with_stack(quantity, 30)
    }

    #[test]
    fn rotate_swaps_extents_and_toggles_flag() {
        let mut item = Item::new(RuntimeId(1), "Rifle", GridSize::new(1, 3));
        item.rotate();
        assert_eq!(item.size(), GridSize::new(3, 1));
        assert!(item.rotated);
        item.rotate();
        assert_eq!(item.size(), GridSize::new(1, 3));
        assert!(!item.rotated);
    }

    #[test]
    fn rotated_mask_is_read_transposed() {
        let shape = ShapeMask::from_rows(&["#.", "##"]).unwrap();
        let mut item = Item::new(RuntimeId(1), "Bracket", GridSize::new(2, 2)).with_shape(shape);
        assert!(!item.covers_local(1, 1));
        assert!(item.covers_local(0, 1));
        item.rotate();
        assert!(item.covers_local(1, 0));
        assert!(!item.covers_local(1, 1));
    }

    #[test]
    fn overlap_uses_mask_not_bounding_box() {
        let shape = ShapeMask::from_rows(&["#.", "##"]).unwrap();
        let bracket = Item::new(RuntimeId(1), "Bracket", GridSize::new(2, 2)).with_shape(shape);
        let pebble = Item::new(RuntimeId(2), "Pebble", GridSize::new(1, 1)).at(GridPoint::new(1, 1));
        assert!(!bracket.overlaps_at(GridPoint::ZERO, &pebble));
        assert!(bracket.overlaps_at(GridPoint::new(1, 0), &pebble));
    }

    #[test]
    fn absorb_moves_up_to_capacity() {
        let mut target = ammo(1, 25);
        let mut source = ammo(2, 10);
        assert_eq!(target.absorb(&mut source), 5);
        assert_eq!(target.quantity, 30);
        assert_eq!(source.quantity, 5);
        assert!(target.is_full());
    }

    #[test]
    fn absorb_refuses_different_identity() {
        let mut target = ammo(1, 5);
        let mut source = Item::new(RuntimeId(2), "Shells", GridSize::new(1, 1)).with_stack(5, 30);
        assert_eq!(target.absorb(&mut source), 0);
        assert_eq!(source.quantity, 5);
    }

    #[test]
    fn split_off_requires_remainder() {
        let mut stack = ammo(1, 10);
        assert!(stack.split_off(10, RuntimeId(2)).is_none());
        assert!(stack.split_off(0, RuntimeId(2)).is_none());
        let split = stack.split_off(4, RuntimeId(2)).unwrap();
        assert_eq!(split.quantity, 4);
        assert_eq!(split.runtime_id, RuntimeId(2));
        assert_eq!(stack.quantity, 6);
    }
}
