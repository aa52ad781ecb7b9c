//! Backing store contract and an in-memory implementation.
//!
//! A container never owns its items directly: the store is the authority
//! for which items exist and whether an add/remove/drop is allowed. The
//! container keeps a read-through cache rebuilt from the store after every
//! mutation.

use gridstash_core::{Item, RenderMode, RuntimeId};
use std::fmt;

/// Persistence and validation authority behind a [`crate::Container`].
pub trait BackingStore: fmt::Debug {
    /// Number of stored items.
    fn item_count(&self) -> usize;

    /// Stored item at `index` (store order).
    fn item(&self, index: usize) -> Option<&Item>;

    /// Mutable access for in-place quantity/position changes.
    fn item_mut(&mut self, id: RuntimeId) -> Option<&mut Item>;

    /// True when no further items may be added.
    fn is_full(&self) -> bool;

    /// Placement semantics for the owning container.
    fn render_mode(&self) -> RenderMode;

    /// Whether `item` may be added.
    fn can_add(&self, item: &Item) -> bool;

    /// Whether `item` may be removed.
    fn can_remove(&self, item: &Item) -> bool;

    /// Whether `item` may be dropped into the world.
    fn can_drop(&self, item: &Item) -> bool;

    /// Persist an addition, or hand the item back on failure.
    fn add_item(&mut self, item: Item) -> Result<(), Item>;

    /// Remove and return an item.
    fn remove_item(&mut self, id: RuntimeId) -> Option<Item>;

    /// Remove an item that is leaving for the world.
    fn drop_item(&mut self, id: RuntimeId) -> Option<Item>;
}

/// Permission switches for [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePolicy {
    /// Answer for `can_add`.
    pub allow_add: bool,
    /// Answer for `can_remove`.
    pub allow_remove: bool,
    /// Answer for `can_drop`.
    pub allow_drop: bool,
    /// When false, `add_item` fails even though `can_add` passed.
    pub persist_adds: bool,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            allow_add: true,
            allow_remove: true,
            allow_drop: true,
            persist_adds: true,
        }
    }
}

/// Vec-backed store used by the headless tools and tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    items: Vec<Item>,
    capacity: Option<usize>,
    render_mode: RenderMode,
    policy: StorePolicy,
}

impl MemoryStore {
    /// Unbounded store with the given render mode. `Single` stores hold one item.
    pub fn new(render_mode: RenderMode) -> Self {
        let capacity = match render_mode {
            RenderMode::Single => Some(1),
            RenderMode::Grid | RenderMode::Layered => None,
        };
        Self {
            items: Vec::new(),
            capacity,
            render_mode,
            policy: StorePolicy::default(),
        }
    }

    /// Cap the number of stored items.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Replace the permission switches.
    pub fn with_policy(mut self, policy: StorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Seed with items that bypass validation (e.g. loaded state).
    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    /// Current permission switches.
    pub fn policy(&self) -> StorePolicy {
        self.policy
    }

    /// Adjust permissions in place.
    pub fn policy_mut(&mut self) -> &mut StorePolicy {
        &mut self.policy
    }
}

impl BackingStore for MemoryStore {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    fn item_mut(&mut self, id: RuntimeId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.runtime_id == id)
    }

    fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.items.len() >= cap)
    }

    fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    fn can_add(&self, item: &Item) -> bool {
        self.policy.allow_add && item.quantity > 0
    }

    fn can_remove(&self, _item: &Item) -> bool {
        self.policy.allow_remove
    }

    fn can_drop(&self, _item: &Item) -> bool {
        self.policy.allow_drop
    }

    fn add_item(&mut self, item: Item) -> Result<(), Item> {
        let duplicate = self.items.iter().any(|i| i.runtime_id == item.runtime_id);
        if !self.policy.persist_adds || item.quantity == 0 || duplicate || self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    fn remove_item(&mut self, id: RuntimeId) -> Option<Item> {
        let index = self.items.iter().position(|item| item.runtime_id == id)?;
        Some(self.items.remove(index))
    }

    fn drop_item(&mut self, id: RuntimeId) -> Option<Item> {
        if !self.policy.allow_drop {
            return None;
        }
        self.remove_item(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstash_core::GridSize;

    fn pebble(id: u64) -> Item {
        Item::new(RuntimeId(id), "Pebble", GridSize::new(1, 1))
    }

    #[test]
    fn single_store_holds_one_item() {
        let mut store = MemoryStore::new(RenderMode::Single);
        assert!(store.add_item(pebble(1)).is_ok());
        assert!(store.is_full());
        assert!(store.add_item(pebble(2)).is_err());
    }

    #[test]
    fn zero_quantity_is_never_persisted() {
        let mut store = MemoryStore::new(RenderMode::Grid);
        let mut empty = pebble(1);
        empty.quantity = 0;
        assert!(!store.can_add(&empty));
        assert!(store.add_item(empty).is_err());
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let mut store = MemoryStore::new(RenderMode::Grid);
        assert!(store.add_item(pebble(1)).is_ok());
        assert!(store.add_item(pebble(1)).is_err());
    }

    #[test]
    fn persist_failure_returns_item() {
        let mut store = MemoryStore::new(RenderMode::Grid).with_policy(StorePolicy {
            persist_adds: false,
            ..StorePolicy::default()
        });
        assert!(store.can_add(&pebble(1)));
        let returned = store.add_item(pebble(1)).unwrap_err();
        assert_eq!(returned.runtime_id, RuntimeId(1));
    }

    #[test]
    fn remove_and_drop_respect_policy() {
        let mut store = MemoryStore::new(RenderMode::Grid).with_items(vec![pebble(1), pebble(2)]);
        store.policy_mut().allow_drop = false;
        assert!(store.drop_item(RuntimeId(1)).is_none());
        assert!(store.remove_item(RuntimeId(1)).is_some());
        assert_eq!(store.item_count(), 1);
        assert_eq!(store.item(0).map(|i| i.runtime_id), Some(RuntimeId(2)));
    }
}
