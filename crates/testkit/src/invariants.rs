//! Grid invariant checks shared by property tests and worldtests.

use anyhow::{bail, Result};
use gridstash_core::{GridPoint, GridSize, Item};
use std::collections::HashMap;

/// Fail if any two items share an occupied cell.
pub fn assert_no_overlap(items: &[Item]) -> Result<()> {
    let mut owners: HashMap<GridPoint, &Item> = HashMap::new();
    for item in items {
        for cell in item.occupied_cells() {
            if let Some(other) = owners.insert(cell, item) {
                bail!(
                    "cell {} occupied by both {} '{}' and {} '{}'",
                    cell,
                    other.runtime_id,
                    other.item_name,
                    item.runtime_id,
                    item.item_name
                );
            }
        }
    }
    Ok(())
}

/// Fail if any item's bounding box leaves `[0, width) x [0, height)`.
pub fn assert_in_bounds(items: &[Item], size: GridSize) -> Result<()> {
    for item in items {
        let p = item.position;
        if p.x < 0 || p.y < 0 || p.x + item.width > size.width || p.y + item.height > size.height {
            bail!(
                "{} '{}' at {} with size {}x{} leaves a {}x{} grid",
                item.runtime_id,
                item.item_name,
                p,
                item.width,
                item.height,
                size.width,
                size.height
            );
        }
    }
    Ok(())
}

/// Fail if any stored quantity is zero or above capacity.
pub fn assert_quantities_valid(items: &[Item]) -> Result<()> {
    for item in items {
        if item.quantity == 0 || item.quantity > item.max_quantity {
            bail!(
                "{} '{}' holds {}/{}",
                item.runtime_id,
                item.item_name,
                item.quantity,
                item.max_quantity
            );
        }
    }
    Ok(())
}

/// Run every grid invariant.
pub fn assert_grid_invariants(items: &[Item], size: GridSize) -> Result<()> {
    assert_no_overlap(items)?;
    assert_in_bounds(items, size)?;
    assert_quantities_valid(items)
}

/// Sum of quantities per item name.
pub fn quantity_by_name<'a, I>(items: I) -> HashMap<String, u32>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut totals = HashMap::new();
    for item in items {
        *totals.entry(item.item_name.clone()).or_insert(0) += item.quantity;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstash_core::RuntimeId;

    fn block(id: u64, x: i32, y: i32, w: i32, h: i32) -> Item {
        Item::new(RuntimeId(id), "Block", GridSize::new(w, h)).at(GridPoint::new(x, y))
    }

    #[test]
    fn detects_overlap() {
        let items = vec![block(1, 0, 0, 2, 2), block(2, 1, 1, 2, 2)];
        assert!(assert_no_overlap(&items).is_err());
        let items = vec![block(1, 0, 0, 2, 2), block(2, 2, 2, 2, 2)];
        assert!(assert_no_overlap(&items).is_ok());
    }

    #[test]
    fn detects_out_of_bounds() {
        let size = GridSize::new(4, 4);
        assert!(assert_in_bounds(&[block(1, 3, 0, 2, 1)], size).is_err());
        assert!(assert_in_bounds(&[block(1, 2, 3, 2, 1)], size).is_ok());
    }

    #[test]
    fn totals_group_by_name() {
        let a = Item::new(RuntimeId(1), "Ammo", GridSize::new(1, 1)).with_stack(5, 30);
        let b = Item::new(RuntimeId(2), "Ammo", GridSize::new(1, 1)).with_stack(7, 30);
        let totals = quantity_by_name([&a, &b]);
        assert_eq!(totals.get("Ammo"), Some(&12));
    }
}
