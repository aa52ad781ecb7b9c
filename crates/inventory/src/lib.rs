#![warn(missing_docs)]
//! Grid inventory engine: spatial containers, stacking, swaps, and the drag
//! session that moves items between containers.

mod container;
mod context;
mod coords;
mod drag;
mod error;
mod events;
mod store;

pub use container::{AddOutcome, Container, ResizeReport};
pub use context::{ContainerId, InventoryContext};
pub use coords::{exceeds_drag_threshold, CellLayout};
pub use drag::{DragError, DragOutcome, DragSession, DropPreview, Hover};
pub use error::{DropError, PlacementError, Rejected, RemoveError, SplitError, SwapError};
pub use events::{ContainerEvent, EventQueue};
pub use store::{BackingStore, MemoryStore, StorePolicy};

pub use gridstash_core::{GridPoint, GridSize, Item, ItemFactory, RenderMode, RuntimeId, ShapeMask};
