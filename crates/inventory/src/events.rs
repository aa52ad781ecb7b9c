//! Container notifications.
//!
//! Mutations never call out to listeners directly. Each event is pushed onto
//! the container's [`EventQueue`] after the item cache has been rebuilt, and
//! consumers drain the queue once the mutating call has returned. A handler
//! that calls back into the container therefore always observes a
//! consistent cache, and events keep the order their mutations happened in.

use gridstash_core::{GridPoint, GridSize, RuntimeId};
use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

/// A fire-and-forget notification emitted by a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContainerEvent {
    /// An item was placed.
    ItemAdded {
        /// Placed item.
        id: RuntimeId,
        /// Final anchor position.
        point: GridPoint,
    },
    /// An addition was refused.
    ItemAddFailed {
        /// Refused item.
        id: RuntimeId,
        /// Why it was refused.
        reason: PlacementError,
    },
    /// An item left the container.
    ItemRemoved {
        /// Removed item.
        id: RuntimeId,
    },
    /// An item was ejected into the world.
    ItemDropped {
        /// Dropped item.
        id: RuntimeId,
    },
    /// A drop was refused.
    ItemDropFailed {
        /// Item that stayed put.
        id: RuntimeId,
    },
    /// Quantity or position changed in place.
    ItemChanged {
        /// Mutated item.
        id: RuntimeId,
    },
    /// The item cache was refreshed from the backing store.
    Rebuilt {
        /// Items in the refreshed cache.
        count: usize,
    },
    /// Grid dimensions changed.
    Resized {
        /// New dimensions.
        size: GridSize,
    },
    /// An addition was attempted while additions are blocked.
    AddBlocked {
        /// Item that was turned away.
        id: RuntimeId,
    },
}

impl ContainerEvent {
    /// Short label for logs and event sinks.
    pub fn kind(&self) -> &'static str {
        match self {
            ContainerEvent::ItemAdded { .. } => "ItemAdded",
            ContainerEvent::ItemAddFailed { .. } => "ItemAddFailed",
            ContainerEvent::ItemRemoved { .. } => "ItemRemoved",
            ContainerEvent::ItemDropped { .. } => "ItemDropped",
            ContainerEvent::ItemDropFailed { .. } => "ItemDropFailed",
            ContainerEvent::ItemChanged { .. } => "ItemChanged",
            ContainerEvent::Rebuilt { .. } => "Rebuilt",
            ContainerEvent::Resized { .. } => "Resized",
            ContainerEvent::AddBlocked { .. } => "AddBlocked",
        }
    }
}

/// Ordered outbox of container events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: Vec<ContainerEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: ContainerEvent) {
        tracing::trace!(kind = event.kind(), "container event");
        self.pending.push(event);
    }

    /// Take every pending event in emission order.
    pub fn drain(&mut self) -> Vec<ContainerEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Pending events without consuming them.
    pub fn pending(&self) -> &[ContainerEvent] {
        &self.pending
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
