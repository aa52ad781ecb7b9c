//! Drag session state machine.
//!
//! A session holds exactly one item that has already been detached from its
//! origin container. Hover updates only compute a [`DropPreview`]; the drop
//! itself walks an ordered decision list where the first applicable rule
//! wins:
//!
//! 1. the drop cell holds a compatible stack with room in a container that
//!    accepts the item: merge, and send any remainder back to the origin point
//! 2. the drop cell is empty and the item fits: place it
//! 3. the occupant can be displaced into the origin slot: swap
//! 4. over a container but invalid: return to the origin point
//! 5. outside every container: drop into the world, else return
//!
//! Every failure path ends with the item back in its origin container. If
//! even that is refused the item is handed to the caller inside
//! [`DragError::Stranded`].

use gridstash_core::{GridPoint, Item, RuntimeId};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::container::Container;
use crate::context::ContainerId;
use crate::error::RemoveError;

pub(crate) type Containers = BTreeMap<ContainerId, Container>;

/// Container and cell currently under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hover {
    /// Hovered container.
    pub container: ContainerId,
    /// Cell under the pointer.
    pub point: GridPoint,
}

impl Hover {
    /// Create a hover target.
    pub fn new(container: ContainerId, point: GridPoint) -> Self {
        Self { container, point }
    }
}

/// Visual feedback for the current hover position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPreview {
    /// Dropping here places the item.
    Place,
    /// Dropping here merges into the stack under the pointer.
    Stack,
    /// Dropping here swaps with the item under the pointer.
    Swap,
    /// Dropping here sends the item back to its origin.
    Invalid,
    /// Not over any container.
    Outside,
}

/// Terminal result of a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Placed into the hovered container.
    Added {
        /// Receiving container.
        container: ContainerId,
        /// Final anchor.
        point: GridPoint,
    },
    /// Exchanged with the item under the pointer.
    Swapped {
        /// Container that received the dragged item.
        container: ContainerId,
        /// Final anchor of the dragged item.
        point: GridPoint,
        /// Item moved into the origin slot.
        displaced: RuntimeId,
    },
    /// Merged into a stack.
    QuantityChanged {
        /// Container holding the target stack.
        container: ContainerId,
        /// Stack that received units.
        target: RuntimeId,
        /// Units moved.
        transferred: u32,
        /// Where the remainder went, if any units were left over.
        remainder: Option<GridPoint>,
    },
    /// Placed back into the origin container.
    Returned {
        /// Origin container.
        container: ContainerId,
        /// Final anchor.
        point: GridPoint,
    },
    /// Ejected into the world; the caller now owns the item.
    Dropped {
        /// The dropped item.
        item: Item,
    },
}

impl DragOutcome {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DragOutcome::Added { .. } => "Added",
            DragOutcome::Swapped { .. } => "Swapped",
            DragOutcome::QuantityChanged { .. } => "QuantityChanged",
            DragOutcome::Returned { .. } => "Returned",
            DragOutcome::Dropped { .. } => "Dropped",
        }
    }
}

/// Errors raised by drag operations.
#[derive(Debug, Error)]
pub enum DragError {
    /// A session is already in progress.
    #[error("an item is already being dragged")]
    AlreadyDragging,
    /// No session is in progress.
    #[error("no item is being dragged")]
    NotDragging,
    /// The container ID is not registered.
    #[error("unknown container {0}")]
    UnknownContainer(ContainerId),
    /// Nothing under the pointer to pick up.
    #[error("no item at {point} in container {container}")]
    NothingAtPoint {
        /// Container that was pressed.
        container: ContainerId,
        /// Pressed cell.
        point: GridPoint,
    },
    /// The origin container refused to let go of the item.
    #[error("cannot detach item: {0}")]
    Detach(#[from] RemoveError),
    /// No container would take the item back; ownership returns to the caller.
    #[error("item '{}' could not be returned to any container", .0.item_name)]
    Stranded(Box<Item>),
}

/// One in-progress move.
#[derive(Debug, Clone)]
pub struct DragSession {
    item: Item,
    origin: ContainerId,
    origin_point: GridPoint,
    origin_orientation: (i32, i32, bool),
    hover: Option<Hover>,
    preview: DropPreview,
}

enum SwapAttempt {
    Done(DragOutcome),
    Declined(DragSession),
}

impl DragSession {
    pub(crate) fn begin(item: Item, origin: ContainerId) -> Self {
        let origin_point = item.position;
        let origin_orientation = (item.width, item.height, item.rotated);
        Self {
            item,
            origin,
            origin_point,
            origin_orientation,
            hover: None,
            preview: DropPreview::Outside,
        }
    }

    /// The held item.
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Container the item was lifted from.
    pub fn origin(&self) -> ContainerId {
        self.origin
    }

    /// Anchor the item had before it was lifted.
    pub fn origin_point(&self) -> GridPoint {
        self.origin_point
    }

    /// Last hover target passed to an update.
    pub fn hover(&self) -> Option<Hover> {
        self.hover
    }

    /// Feedback computed by the last update.
    pub fn preview(&self) -> DropPreview {
        self.preview
    }

    pub(crate) fn rotate(&mut self) {
        self.item.rotate();
    }

    pub(crate) fn clear_hover_on(&mut self, container: ContainerId) {
        if self.hover.is_some_and(|hover| hover.container == container) {
            self.hover = None;
            self.preview = DropPreview::Outside;
        }
    }

    /// Recompute feedback for `hover`. Never mutates any container.
    pub(crate) fn update(&mut self, containers: &Containers, hover: Option<Hover>) -> DropPreview {
        self.hover = hover;
        self.preview = self.preview_for(containers, hover);
        self.preview
    }

    fn preview_for(&self, containers: &Containers, hover: Option<Hover>) -> DropPreview {
        let Some(hover) = hover else {
            return DropPreview::Outside;
        };
        let Some(target) = containers.get(&hover.container) else {
            return DropPreview::Invalid;
        };
        match target.get_at_point(hover.point) {
            Some(occupant) if self.merge_allowed(target, occupant) => DropPreview::Stack,
            None if target.can_add_at(&self.item, hover.point) => DropPreview::Place,
            Some(occupant) if self.swap_feasible(containers, hover, occupant) => DropPreview::Swap,
            _ => DropPreview::Invalid,
        }
    }

    fn merge_allowed(&self, target: &Container, occupant: &Item) -> bool {
        occupant.can_merge(&self.item)
            && !occupant.is_full()
            && target.check_merge(&self.item).is_ok()
    }

    /// Read-only check that a swap with `occupant` could succeed.
    fn swap_feasible(&self, containers: &Containers, hover: Hover, occupant: &Item) -> bool {
        let Some(target) = containers.get(&hover.container) else {
            return false;
        };
        if !target.store().can_remove(occupant) {
            return false;
        }
        if target
            .check_add_at_replacing(&self.item, hover.point, occupant.runtime_id)
            .is_err()
        {
            return false;
        }

        if hover.container == self.origin {
            // Same grid: the occupant moves into the slot the held item left,
            // which must not collide with the held item's new footprint.
            let placed = self.item.clone().at(target.center_or(hover.point, &self.item));
            return target
                .check_footprint(occupant, self.origin_point, &[occupant.runtime_id])
                .is_ok()
                && !occupant.overlaps_at(self.origin_point, &placed);
        }
        containers
            .get(&self.origin)
            .is_some_and(|origin| origin.can_add_at(occupant, self.origin_point))
    }

    /// Resolve the drop at `hover`.
    pub(crate) fn resolve(
        mut self,
        containers: &mut Containers,
        hover: Option<Hover>,
    ) -> Result<DragOutcome, DragError> {
        let Some(hover) = hover else {
            return self.drop_to_world(containers);
        };
        let Some(target) = containers.get_mut(&hover.container) else {
            debug!(container = %hover.container, "hovered container vanished, returning item");
            return self.return_to_origin(containers);
        };

        let occupant = target.get_at_point(hover.point).cloned();

        // Rule 1: merge into a compatible stack.
        if let Some(occupant) = occupant.as_ref() {
            if self.merge_allowed(target, occupant) {
                let transferred = target.transfer_into(occupant.runtime_id, &mut self.item);
                let target_id = occupant.runtime_id;
                if self.item.quantity == 0 {
                    return Ok(DragOutcome::QuantityChanged {
                        container: hover.container,
                        target: target_id,
                        transferred,
                        remainder: None,
                    });
                }
                let remainder = match self.return_to_origin(containers)? {
                    DragOutcome::Returned { point, .. } => Some(point),
                    _ => None,
                };
                return Ok(DragOutcome::QuantityChanged {
                    container: hover.container,
                    target: target_id,
                    transferred,
                    remainder,
                });
            }
        }

        // Rule 2: empty cell that fits.
        if occupant.is_none() && target.can_add_at(&self.item, hover.point) {
            match target.try_add_at(self.item, hover.point) {
                Ok(point) => {
                    return Ok(DragOutcome::Added {
                        container: hover.container,
                        point,
                    });
                }
                Err(rejected) => self.item = rejected.item,
            }
        }

        // Rule 3: displace the occupant into the origin slot.
        if let Some(occupant) = occupant {
            if self.swap_feasible(containers, hover, &occupant) {
                match self.try_swap(containers, hover, occupant.runtime_id)? {
                    SwapAttempt::Done(outcome) => return Ok(outcome),
                    SwapAttempt::Declined(session) => self = session,
                }
            }
        }

        // Rule 4: invalid drop over a container.
        self.return_to_origin(containers)
    }

    fn try_swap(
        mut self,
        containers: &mut Containers,
        hover: Hover,
        occupant_id: RuntimeId,
    ) -> Result<SwapAttempt, DragError> {
        let Some(target) = containers.get_mut(&hover.container) else {
            return Ok(SwapAttempt::Declined(self));
        };
        let Ok(occupant) = target.try_remove(occupant_id) else {
            return Ok(SwapAttempt::Declined(self));
        };

        let dragged_id = self.item.runtime_id;
        let point = match target.try_add_at(self.item, hover.point) {
            Ok(point) => point,
            Err(rejected) => {
                self.item = rejected.item;
                target
                    .reinsert(occupant)
                    .map_err(|occupant| DragError::Stranded(Box::new(occupant)))?;
                return Ok(SwapAttempt::Declined(self));
            }
        };

        let origin_point = self.origin_point;
        let placed_occupant = match containers.get_mut(&self.origin) {
            Some(origin) => origin.try_add_at(occupant, origin_point).map_err(|r| r.item),
            None => Err(occupant),
        };
        match placed_occupant {
            Ok(_) => {
                debug!(dragged = %dragged_id, displaced = %occupant_id, "swap committed");
                Ok(SwapAttempt::Done(DragOutcome::Swapped {
                    container: hover.container,
                    point,
                    displaced: occupant_id,
                }))
            }
            Err(occupant) => {
                warn!(dragged = %dragged_id, displaced = %occupant_id, "swap rolled back");
                let Some(target) = containers.get_mut(&hover.container) else {
                    return Err(DragError::Stranded(Box::new(occupant)));
                };
                let Some(item) = target.take_back(dragged_id) else {
                    return Err(DragError::Stranded(Box::new(occupant)));
                };
                self.item = item;
                target
                    .reinsert(occupant)
                    .map_err(|occupant| DragError::Stranded(Box::new(occupant)))?;
                Ok(SwapAttempt::Declined(self))
            }
        }
    }

    fn drop_to_world(self, containers: &mut Containers) -> Result<DragOutcome, DragError> {
        let permitted = containers
            .get_mut(&self.origin)
            .map(|origin| origin.authorize_world_drop(&self.item));
        match permitted {
            Some(Ok(())) => {
                debug!(id = %self.item.runtime_id, "item dropped into the world");
                Ok(DragOutcome::Dropped { item: self.item })
            }
            _ => self.return_to_origin(containers),
        }
    }

    /// Put the item back where it came from, in its original orientation.
    pub(crate) fn return_to_origin(
        mut self,
        containers: &mut Containers,
    ) -> Result<DragOutcome, DragError> {
        (self.item.width, self.item.height, self.item.rotated) = self.origin_orientation;
        let Some(origin) = containers.get_mut(&self.origin) else {
            warn!(container = %self.origin, "origin container missing, item stranded");
            return Err(DragError::Stranded(Box::new(self.item)));
        };

        let item = match origin.try_add_at(self.item, self.origin_point) {
            Ok(point) => {
                return Ok(DragOutcome::Returned {
                    container: self.origin,
                    point,
                });
            }
            Err(rejected) => rejected.item,
        };

        // The origin slot was taken since the drag began; settle for any free spot.
        warn!(container = %origin.name(), id = %item.runtime_id, "origin slot unavailable");
        match origin.try_add_with_rotation(item) {
            Ok(point) => Ok(DragOutcome::Returned {
                container: self.origin,
                point,
            }),
            Err(rejected) => Err(DragError::Stranded(Box::new(rejected.item))),
        }
    }
}

impl Container {
    /// Anchor an item would actually take if added at `point`.
    fn center_or(&self, point: GridPoint, item: &Item) -> GridPoint {
        if self.render_mode().is_spatial() {
            point
        } else {
            self.center_point(item)
        }
    }
}
