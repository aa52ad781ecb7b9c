//! Error types for container operations.

use gridstash_core::{GridPoint, Item, RuntimeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an item cannot be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementError {
    /// Additions are blocked on this container.
    #[error("additions are blocked")]
    AdditionsBlocked,
    /// The backing store reports no free capacity.
    #[error("container is full")]
    Full,
    /// The backing store refused the item.
    #[error("backing store refused the item")]
    StoreRefused,
    /// The item is already in this container.
    #[error("item {0} is already contained")]
    AlreadyContained(RuntimeId),
    /// Part of the bounding box falls outside the grid.
    #[error("item does not fit inside the grid at {0}")]
    OutOfBounds(GridPoint),
    /// The footprint overlaps another item.
    #[error("item overlaps {0}")]
    Overlap(RuntimeId),
    /// No free point can hold the item.
    #[error("no free space for the item")]
    NoSpace,
    /// The store accepted the check but failed to persist the addition.
    #[error("backing store failed to persist the item")]
    PersistFailed,
}

/// A refused addition. The item is handed back untouched.
#[derive(Debug, Error)]
#[error("cannot add '{}': {reason}", .item.item_name)]
pub struct Rejected {
    /// The item, with its original position and orientation.
    pub item: Item,
    /// Why the addition failed.
    pub reason: PlacementError,
}

impl Rejected {
    pub(crate) fn new(item: Item, reason: PlacementError) -> Self {
        Self { item, reason }
    }
}

/// Errors from removing an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoveError {
    /// No such item in this container.
    #[error("item {0} is not in this container")]
    NotContained(RuntimeId),
    /// The backing store refused the removal.
    #[error("backing store refused to remove {0}")]
    Refused(RuntimeId),
}

/// Errors from dropping an item into the world.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropError {
    /// No such item in this container.
    #[error("item {0} is not in this container")]
    NotContained(RuntimeId),
    /// The item's capability flag forbids dropping.
    #[error("item {0} cannot be dropped")]
    NotDroppable(RuntimeId),
    /// The backing store refused the drop.
    #[error("backing store refused to drop {0}")]
    Refused(RuntimeId),
}

/// Errors from exchanging two items' positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    /// One of the items is not in this container.
    #[error("item {0} is not in this container")]
    NotContained(RuntimeId),
    /// Both handles name the same item.
    #[error("cannot swap an item with itself")]
    SameItem,
    /// Swapping needs spatial placement.
    #[error("swapping requires a spatial render mode")]
    NotSpatial,
    /// One item cannot occupy the other's position.
    #[error("{id} cannot be placed at {at}: {reason}")]
    DoesNotFit {
        /// Item that did not fit.
        id: RuntimeId,
        /// Position it was tested at.
        at: GridPoint,
        /// Placement failure.
        reason: PlacementError,
    },
}

/// Errors from splitting a stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    /// No such item in this container.
    #[error("item {0} is not in this container")]
    NotContained(RuntimeId),
    /// Amount must leave at least one unit behind and move at least one.
    #[error("cannot split {amount} from a stack of {quantity}")]
    InvalidAmount {
        /// Requested units.
        amount: u32,
        /// Units in the source stack.
        quantity: u32,
    },
    /// The new partial stack could not be placed.
    #[error("cannot place split stack: {0}")]
    Placement(PlacementError),
}
