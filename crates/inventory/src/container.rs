//! Grid container: placement queries and mutations over a backing store.
//!
//! Cell `(x, y)` is column `x`, row `y`; an item anchored at `p` covers the
//! bounding box `[p.x, p.x + width) x [p.y, p.y + height)` filtered by its
//! shape mask. Row `height - 1` is the top row.

use gridstash_core::{GridPoint, GridSize, Item, ItemFactory, RenderMode, RuntimeId};
use tracing::{debug, warn};

use crate::error::{DropError, PlacementError, Rejected, RemoveError, SplitError, SwapError};
use crate::events::{ContainerEvent, EventQueue};
use crate::store::BackingStore;

/// Result of a successful [`Container::try_add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The whole quantity merged into existing stacks; the item was consumed.
    Stacked {
        /// Units merged.
        transferred: u32,
    },
    /// The item (or its remainder after stacking) was placed.
    Placed {
        /// Placed item.
        id: RuntimeId,
        /// Final anchor.
        point: GridPoint,
        /// Units merged into existing stacks beforehand.
        stacked: u32,
    },
}

/// What happened to items that no longer fit after [`Container::resize`].
#[derive(Debug, Default)]
pub struct ResizeReport {
    /// Items dropped into the world.
    pub dropped: Vec<Item>,
    /// Items the store would not drop but did let go of.
    pub evicted: Vec<Item>,
    /// Items that could be neither dropped nor removed.
    pub stuck: Vec<RuntimeId>,
}

/// Fixed-size cell grid holding the items of one backing store.
#[derive(Debug)]
pub struct Container {
    name: String,
    size: GridSize,
    store: Box<dyn BackingStore>,
    items: Vec<Item>,
    additions_blocked: bool,
    events: EventQueue,
}

impl Container {
    /// Create a container over `store` and load its cache.
    pub fn new(name: impl Into<String>, size: GridSize, store: impl BackingStore + 'static) -> Self {
        let mut container = Self {
            name: name.into(),
            size,
            store: Box::new(store),
            items: Vec::new(),
            additions_blocked: false,
            events: EventQueue::new(),
        };
        container.rebuild();
        container
    }

    /// Display name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid dimensions in cells.
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Placement semantics reported by the backing store.
    pub fn render_mode(&self) -> RenderMode {
        self.store.render_mode()
    }

    /// Cached items in store order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Cached item by runtime ID.
    pub fn get(&self, id: RuntimeId) -> Option<&Item> {
        self.items.iter().find(|item| item.runtime_id == id)
    }

    /// Whether `id` is in this container.
    pub fn contains(&self, id: RuntimeId) -> bool {
        self.get(id).is_some()
    }

    /// Whether the store reports no free capacity.
    pub fn is_full(&self) -> bool {
        self.store.is_full()
    }

    /// The backing store.
    pub fn store(&self) -> &dyn BackingStore {
        self.store.as_ref()
    }

    /// Whether additions are currently refused.
    pub fn additions_blocked(&self) -> bool {
        self.additions_blocked
    }

    /// Block or unblock all additions.
    pub fn set_additions_blocked(&mut self, blocked: bool) {
        self.additions_blocked = blocked;
    }

    /// Pending notifications.
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Take every pending notification in emission order.
    pub fn drain_events(&mut self) -> Vec<ContainerEvent> {
        self.events.drain()
    }

    /// Total units of `item_name` across all stacks.
    pub fn total_quantity(&self, item_name: &str) -> u32 {
        self.items
            .iter()
            .filter(|item| item.item_name == item_name)
            .map(|item| item.quantity)
            .sum()
    }

    /// Refresh the item cache from the backing store.
    pub fn rebuild(&mut self) {
        self.items = (0..self.store.item_count())
            .filter_map(|index| self.store.item(index).cloned())
            .collect();
        self.events.push(ContainerEvent::Rebuilt {
            count: self.items.len(),
        });
    }

    /// Whether the cache matches the store item for item.
    pub fn is_cache_consistent(&self) -> bool {
        self.items.len() == self.store.item_count()
            && self
                .items
                .iter()
                .enumerate()
                .all(|(index, cached)| self.store.item(index) == Some(cached))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Item whose footprint covers `point`.
    ///
    /// A `Single` container answers with its item for any point.
    pub fn get_at_point(&self, point: GridPoint) -> Option<&Item> {
        if !self.render_mode().is_spatial() {
            return self.items.first();
        }
        self.items.iter().find(|item| item.covers(point))
    }

    /// Anchor that centres `item` in the grid.
    pub fn center_point(&self, item: &Item) -> GridPoint {
        GridPoint::new(
            ((self.size.width - item.width) / 2).max(0),
            ((self.size.height - item.height) / 2).max(0),
        )
    }

    /// Whether `item` anchored at `anchor` lies fully inside the grid.
    pub fn in_bounds_at(&self, item: &Item, anchor: GridPoint) -> bool {
        anchor.x >= 0
            && anchor.y >= 0
            && anchor.x + item.width <= self.size.width
            && anchor.y + item.height <= self.size.height
    }

    /// Explain why `item` cannot be placed at `point`, if it cannot.
    pub fn check_add_at(&self, item: &Item, point: GridPoint) -> Result<(), PlacementError> {
        self.check_gate(item, false)?;
        self.check_footprint(item, point, &[item.runtime_id])
    }

    /// Whether `item` can be placed at `point`. Never mutates.
    pub fn can_add_at(&self, item: &Item, point: GridPoint) -> bool {
        self.check_add_at(item, point).is_ok()
    }

    /// Like [`Self::check_add_at`], treating `replaced` as already gone.
    pub fn check_add_at_replacing(
        &self,
        item: &Item,
        point: GridPoint,
        replaced: RuntimeId,
    ) -> Result<(), PlacementError> {
        self.check_gate(item, true)?;
        self.check_footprint(item, point, &[item.runtime_id, replaced])
    }

    /// Explain why units of `item` may not merge into this container's stacks.
    ///
    /// Same gate as a placement, minus the capacity check: a merge adds no item.
    pub fn check_merge(&self, item: &Item) -> Result<(), PlacementError> {
        self.check_gate(item, true)
    }

    fn check_gate(&self, item: &Item, replacing: bool) -> Result<(), PlacementError> {
        if self.additions_blocked {
            return Err(PlacementError::AdditionsBlocked);
        }
        if self.contains(item.runtime_id) {
            return Err(PlacementError::AlreadyContained(item.runtime_id));
        }
        if !self.store.can_add(item) {
            return Err(PlacementError::StoreRefused);
        }
        if !replacing && self.store.is_full() {
            return Err(PlacementError::Full);
        }
        Ok(())
    }

    /// Bounds and overlap test for `item` at `anchor`, ignoring the `lifted` items.
    ///
    /// Skips every gate (blocking, capacity, store permission). `Single`
    /// containers accept any footprint.
    pub fn check_footprint(
        &self,
        item: &Item,
        anchor: GridPoint,
        lifted: &[RuntimeId],
    ) -> Result<(), PlacementError> {
        if !self.render_mode().is_spatial() {
            return Ok(());
        }
        // Integer cells make the bounds test exact; no boundary padding needed.
        if !self.in_bounds_at(item, anchor) {
            return Err(PlacementError::OutOfBounds(anchor));
        }
        match self
            .items
            .iter()
            .filter(|other| !lifted.contains(&other.runtime_id))
            .find(|other| item.overlaps_at(anchor, other))
        {
            Some(other) => Err(PlacementError::Overlap(other.runtime_id)),
            None => Ok(()),
        }
    }

    /// First anchor that accepts `item`.
    ///
    /// Rows are scanned from the top (`height - 1`) down to `0`, columns left
    /// to right within a row.
    pub fn first_point_that_fits(&self, item: &Item) -> Option<GridPoint> {
        if !self.render_mode().is_spatial() {
            let center = self.center_point(item);
            return self.can_add_at(item, center).then_some(center);
        }
        if !self.size.fits(item.size()) {
            return None;
        }
        (0..self.size.height).rev().find_map(|y| {
            (0..self.size.width)
                .map(|x| GridPoint::new(x, y))
                .find(|&point| self.can_add_at(item, point))
        })
    }

    /// Whether [`Self::try_add`] would accept `item`.
    pub fn can_add(&self, item: &Item) -> bool {
        if self.additions_blocked || self.store.is_full() || self.contains(item.runtime_id) {
            return false;
        }
        if !self.store.can_add(item) {
            return false;
        }
        let stack_room: u32 = self
            .items
            .iter()
            .filter(|existing| existing.can_merge(item))
            .map(Item::remaining_space)
            .sum();
        stack_room >= item.quantity || self.first_point_that_fits(item).is_some()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn reject(&mut self, item: Item, reason: PlacementError) -> Rejected {
        let id = item.runtime_id;
        if reason == PlacementError::AdditionsBlocked {
            self.events.push(ContainerEvent::AddBlocked { id });
        } else {
            self.events.push(ContainerEvent::ItemAddFailed {
                id,
                reason: reason.clone(),
            });
        }
        debug!(container = %self.name, %id, %reason, "addition refused");
        Rejected::new(item, reason)
    }

    /// Place `item` at `point`, returning its final anchor.
    ///
    /// `Single` containers centre the item instead. If the store fails to
    /// persist, the item comes back with its original position.
    pub fn try_add_at(&mut self, mut item: Item, point: GridPoint) -> Result<GridPoint, Rejected> {
        if let Err(reason) = self.check_add_at(&item, point) {
            return Err(self.reject(item, reason));
        }

        let previous = item.position;
        let target = if self.render_mode().is_spatial() {
            point
        } else {
            self.center_point(&item)
        };
        item.position = target;
        let id = item.runtime_id;

        if let Err(mut item) = self.store.add_item(item) {
            item.position = previous;
            warn!(container = %self.name, %id, "store failed to persist addition, position rolled back");
            return Err(self.reject(item, PlacementError::PersistFailed));
        }

        self.rebuild();
        self.events.push(ContainerEvent::ItemAdded { id, point: target });
        debug!(container = %self.name, %id, point = %target, "item added");
        Ok(target)
    }

    /// Add `item` wherever it goes: merge into stacks first, then place the
    /// remainder at the first fitting point.
    ///
    /// Units merged before a placement failure stay merged; the rejected
    /// item carries only the remainder.
    pub fn try_add(&mut self, mut item: Item) -> Result<AddOutcome, Rejected> {
        if self.additions_blocked {
            return Err(self.reject(item, PlacementError::AdditionsBlocked));
        }
        if self.contains(item.runtime_id) {
            let id = item.runtime_id;
            return Err(self.reject(item, PlacementError::AlreadyContained(id)));
        }
        if !self.store.can_add(&item) {
            return Err(self.reject(item, PlacementError::StoreRefused));
        }
        if self.store.is_full() {
            return Err(self.reject(item, PlacementError::Full));
        }

        let stacked = self.try_stack(&mut item);
        if item.quantity == 0 {
            return Ok(AddOutcome::Stacked {
                transferred: stacked,
            });
        }

        let id = item.runtime_id;
        match self.first_point_that_fits(&item) {
            Some(point) => self
                .try_add_at(item, point)
                .map(|point| AddOutcome::Placed { id, point, stacked }),
            None => {
                let reason = if self.store.can_add(&item) {
                    PlacementError::NoSpace
                } else {
                    PlacementError::StoreRefused
                };
                Err(self.reject(item, reason))
            }
        }
    }

    /// Merge units of `item` into existing stacks in encounter order.
    ///
    /// Returns the number of units moved; `item.quantity` is reduced to match.
    /// Nothing moves while [`Self::check_merge`] refuses the item.
    pub fn try_stack(&mut self, item: &mut Item) -> u32 {
        let candidates: Vec<RuntimeId> = self
            .items
            .iter()
            .filter(|existing| {
                existing.runtime_id != item.runtime_id && existing.can_merge(item) && !existing.is_full()
            })
            .map(|existing| existing.runtime_id)
            .collect();
        self.absorb_into(&candidates, item)
    }

    /// Merge as many units of `source` as fit into the stack `target`.
    ///
    /// Gated like [`Self::try_stack`].
    pub fn transfer_into(&mut self, target: RuntimeId, source: &mut Item) -> u32 {
        self.absorb_into(&[target], source)
    }

    fn absorb_into(&mut self, targets: &[RuntimeId], source: &mut Item) -> u32 {
        if let Err(reason) = self.check_merge(source) {
            debug!(container = %self.name, id = %source.runtime_id, %reason, "merge refused");
            return 0;
        }
        let mut total = 0;
        let mut changed = Vec::new();
        for &id in targets {
            if source.quantity == 0 {
                break;
            }
            let Some(existing) = self.store.item_mut(id) else {
                continue;
            };
            let moved = existing.absorb(source);
            if moved > 0 {
                total += moved;
                changed.push(id);
            }
        }

        if !changed.is_empty() {
            self.rebuild();
            for &id in &changed {
                self.events.push(ContainerEvent::ItemChanged { id });
            }
            debug!(container = %self.name, moved = total, stacks = changed.len(), "stacked units");
        }
        total
    }

    /// Place `item` at the first fitting point, rotating it if the current
    /// orientation does not fit anywhere.
    ///
    /// On failure the item's width, height and rotation are restored exactly.
    pub fn try_add_with_rotation(&mut self, mut item: Item) -> Result<GridPoint, Rejected> {
        if let Err(reason) = self.check_gate(&item, false) {
            return Err(self.reject(item, reason));
        }

        let original = (item.width, item.height, item.rotated);
        for attempt in 0..2 {
            if attempt == 1 {
                item.rotate();
            }
            if let Some(point) = self.first_point_that_fits(&item) {
                match self.try_add_at(item, point) {
                    Ok(placed) => return Ok(placed),
                    Err(rejected) => item = rejected.item,
                }
            }
        }

        (item.width, item.height, item.rotated) = original;
        Err(self.reject(item, PlacementError::NoSpace))
    }

    /// Detach an item from the container.
    pub fn try_remove(&mut self, id: RuntimeId) -> Result<Item, RemoveError> {
        let item = self.get(id).ok_or(RemoveError::NotContained(id))?;
        if !self.store.can_remove(item) {
            return Err(RemoveError::Refused(id));
        }
        let removed = self.store.remove_item(id).ok_or(RemoveError::Refused(id))?;

        self.rebuild();
        self.events.push(ContainerEvent::ItemRemoved { id });
        debug!(container = %self.name, %id, "item removed");
        Ok(removed)
    }

    /// Eject a contained item into the world.
    ///
    /// Any refusal fires a drop-failed notification and leaves the item in place.
    pub fn try_drop(&mut self, id: RuntimeId) -> Result<Item, DropError> {
        let refusal = match self.get(id) {
            None => Some(DropError::NotContained(id)),
            Some(item) if !item.can_drop => Some(DropError::NotDroppable(id)),
            Some(item) if !self.store.can_remove(item) || !self.store.can_drop(item) => {
                Some(DropError::Refused(id))
            }
            Some(_) => None,
        };
        if let Some(err) = refusal {
            self.events.push(ContainerEvent::ItemDropFailed { id });
            return Err(err);
        }

        match self.store.drop_item(id) {
            Some(item) => {
                self.rebuild();
                self.events.push(ContainerEvent::ItemDropped { id });
                debug!(container = %self.name, %id, "item dropped");
                Ok(item)
            }
            None => {
                self.events.push(ContainerEvent::ItemDropFailed { id });
                Err(DropError::Refused(id))
            }
        }
    }

    /// Ask this container's store to let a detached item go to the world.
    ///
    /// Used when an item dragged out of this container is released outside
    /// every container.
    pub fn authorize_world_drop(&mut self, item: &Item) -> Result<(), DropError> {
        let id = item.runtime_id;
        let refusal = if !item.can_drop {
            Some(DropError::NotDroppable(id))
        } else if !self.store.can_drop(item) {
            Some(DropError::Refused(id))
        } else {
            None
        };
        match refusal {
            Some(err) => {
                self.events.push(ContainerEvent::ItemDropFailed { id });
                Err(err)
            }
            None => {
                self.events.push(ContainerEvent::ItemDropped { id });
                Ok(())
            }
        }
    }

    /// Put a previously removed item straight back into the store.
    ///
    /// Skips placement checks; callers use it only for footprints they just
    /// vacated.
    pub(crate) fn reinsert(&mut self, item: Item) -> Result<(), Item> {
        let id = item.runtime_id;
        let point = item.position;
        self.store.add_item(item)?;
        self.rebuild();
        self.events.push(ContainerEvent::ItemAdded { id, point });
        Ok(())
    }

    /// Pull an item back out regardless of store removal permission.
    ///
    /// Rollback counterpart of a placement made moments earlier.
    pub(crate) fn take_back(&mut self, id: RuntimeId) -> Option<Item> {
        let item = self.store.remove_item(id)?;
        self.rebuild();
        self.events.push(ContainerEvent::ItemRemoved { id });
        Some(item)
    }

    /// Exchange the positions of two contained items atomically.
    ///
    /// Both placements are validated against the grid with both items
    /// lifted; nothing changes unless both fit.
    pub fn swap_items(&mut self, a: RuntimeId, b: RuntimeId) -> Result<(), SwapError> {
        if a == b {
            return Err(SwapError::SameItem);
        }
        if !self.render_mode().is_spatial() {
            return Err(SwapError::NotSpatial);
        }
        let first = self.get(a).cloned().ok_or(SwapError::NotContained(a))?;
        let second = self.get(b).cloned().ok_or(SwapError::NotContained(b))?;
        let (pos_a, pos_b) = (first.position, second.position);
        let lifted = [a, b];

        self.check_footprint(&first, pos_b, &lifted)
            .map_err(|reason| SwapError::DoesNotFit { id: a, at: pos_b, reason })?;
        self.check_footprint(&second, pos_a, &lifted)
            .map_err(|reason| SwapError::DoesNotFit { id: b, at: pos_a, reason })?;
        let moved_first = first.clone().at(pos_b);
        if second.overlaps_at(pos_a, &moved_first) {
            return Err(SwapError::DoesNotFit {
                id: b,
                at: pos_a,
                reason: PlacementError::Overlap(a),
            });
        }

        if let Some(item) = self.store.item_mut(a) {
            item.position = pos_b;
        }
        if let Some(item) = self.store.item_mut(b) {
            item.position = pos_a;
        }
        self.rebuild();
        self.events.push(ContainerEvent::ItemChanged { id: a });
        self.events.push(ContainerEvent::ItemChanged { id: b });
        debug!(container = %self.name, %a, %b, "items swapped");
        Ok(())
    }

    /// Change grid dimensions, dropping every item that no longer fits.
    pub fn resize(&mut self, size: GridSize) -> ResizeReport {
        self.size = size;
        self.rebuild();
        self.events.push(ContainerEvent::Resized { size });

        let mut report = ResizeReport::default();
        if !self.render_mode().is_spatial() {
            return report;
        }

        let outside: Vec<RuntimeId> = self
            .items
            .iter()
            .filter(|item| !self.in_bounds_at(item, item.position))
            .map(|item| item.runtime_id)
            .collect();
        for id in outside {
            match self.try_drop(id) {
                Ok(item) => report.dropped.push(item),
                Err(drop_err) => match self.try_remove(id) {
                    Ok(item) => {
                        warn!(container = %self.name, %id, %drop_err, "resize evicted undroppable item");
                        report.evicted.push(item);
                    }
                    Err(remove_err) => {
                        warn!(container = %self.name, %id, %remove_err, "item left outside resized grid");
                        report.stuck.push(id);
                    }
                },
            }
        }
        report
    }

    /// Move `amount` units of a stack into a new item placed at the first
    /// fitting point.
    ///
    /// When the new stack cannot be placed nothing changes: the source keeps
    /// its quantity and the partial stack is discarded.
    pub fn split_stack(
        &mut self,
        id: RuntimeId,
        amount: u32,
        factory: &mut ItemFactory,
    ) -> Result<RuntimeId, SplitError> {
        let source = self.get(id).ok_or(SplitError::NotContained(id))?;
        let quantity = source.quantity;
        let mut scratch = source.clone();
        let Some(split) = scratch.split_off(amount, factory.allocate_id()) else {
            return Err(SplitError::InvalidAmount { amount, quantity });
        };
        let new_id = split.runtime_id;

        let Some(point) = self.first_point_that_fits(&split) else {
            let reason = self
                .check_gate(&split, false)
                .err()
                .unwrap_or(PlacementError::NoSpace);
            debug!(container = %self.name, %id, amount, %reason, "split aborted");
            return Err(SplitError::Placement(reason));
        };
        self.try_add_at(split, point)
            .map_err(|rejected| SplitError::Placement(rejected.reason))?;

        if let Some(source) = self.store.item_mut(id) {
            source.quantity -= amount;
        }
        self.rebuild();
        self.events.push(ContainerEvent::ItemChanged { id });
        Ok(new_id)
    }

    /// Use up `amount` units of a stack, returning what remains.
    ///
    /// A stack consumed to zero is removed.
    pub fn consume(&mut self, id: RuntimeId, amount: u32) -> Result<u32, RemoveError> {
        let quantity = self.get(id).ok_or(RemoveError::NotContained(id))?.quantity;
        if amount == 0 {
            return Ok(quantity);
        }
        if amount >= quantity {
            self.try_remove(id)?;
            return Ok(0);
        }

        if let Some(item) = self.store.item_mut(id) {
            item.quantity -= amount;
        }
        self.rebuild();
        self.events.push(ContainerEvent::ItemChanged { id });
        Ok(quantity - amount)
    }
}
