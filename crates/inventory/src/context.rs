//! Coordinating context: the set of live containers plus the single drag
//! session that may move an item between any two of them.

use gridstash_core::GridPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::container::Container;
use crate::drag::{Containers, DragError, DragOutcome, DragSession, DropPreview, Hover};
use crate::events::ContainerEvent;

/// Handle to a container registered with an [`InventoryContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub u32);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Owns containers and at most one drag session.
#[derive(Debug, Default)]
pub struct InventoryContext {
    containers: Containers,
    next_id: u32,
    session: Option<DragSession>,
}

impl InventoryContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container.
    pub fn add_container(&mut self, container: Container) -> ContainerId {
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        self.containers.insert(id, container);
        id
    }

    /// Unregister a container.
    ///
    /// A drag that originated here is cancelled first so its item goes back
    /// into the container before it leaves. A drag hovering here loses its
    /// hover target.
    pub fn remove_container(&mut self, id: ContainerId) -> Result<Container, DragError> {
        if !self.containers.contains_key(&id) {
            return Err(DragError::UnknownContainer(id));
        }
        if self.session.as_ref().is_some_and(|s| s.origin() == id) {
            self.cancel_drag()?;
        }
        if let Some(session) = self.session.as_mut() {
            session.clear_hover_on(id);
        }
        self.containers
            .remove(&id)
            .ok_or(DragError::UnknownContainer(id))
    }

    /// Look up a container.
    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    /// Look up a container mutably.
    pub fn container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(&id)
    }

    /// First container registered under `name`.
    pub fn find_container(&self, name: &str) -> Option<ContainerId> {
        self.containers
            .iter()
            .find(|(_, container)| container.name() == name)
            .map(|(id, _)| *id)
    }

    /// Registered containers in ID order.
    pub fn containers(&self) -> impl Iterator<Item = (ContainerId, &Container)> {
        self.containers.iter().map(|(id, container)| (*id, container))
    }

    /// The in-progress drag, if any.
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Whether an item is currently held.
    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Lift the item under `point` out of `container` and start dragging it.
    pub fn begin_drag(
        &mut self,
        container: ContainerId,
        point: GridPoint,
    ) -> Result<&DragSession, DragError> {
        if self.session.is_some() {
            return Err(DragError::AlreadyDragging);
        }
        let origin = self
            .containers
            .get_mut(&container)
            .ok_or(DragError::UnknownContainer(container))?;
        let id = origin
            .get_at_point(point)
            .map(|item| item.runtime_id)
            .ok_or(DragError::NothingAtPoint { container, point })?;
        let item = origin.try_remove(id)?;

        debug!(%container, %id, %point, "drag started");
        Ok(self.session.insert(DragSession::begin(item, container)))
    }

    /// Report the current hover target and get drop feedback.
    pub fn update_drag(&mut self, hover: Option<Hover>) -> Result<DropPreview, DragError> {
        let session = self.session.as_mut().ok_or(DragError::NotDragging)?;
        Ok(session.update(&self.containers, hover))
    }

    /// Toggle the held item's orientation and refresh feedback.
    pub fn rotate_held(&mut self) -> Result<DropPreview, DragError> {
        let session = self.session.as_mut().ok_or(DragError::NotDragging)?;
        session.rotate();
        let hover = session.hover();
        Ok(session.update(&self.containers, hover))
    }

    /// Release the held item at `hover` (or outside every container).
    pub fn end_drag(&mut self, hover: Option<Hover>) -> Result<DragOutcome, DragError> {
        let session = self.session.take().ok_or(DragError::NotDragging)?;
        let id = session.item().runtime_id;
        let outcome = session.resolve(&mut self.containers, hover)?;
        debug!(%id, outcome = outcome.kind(), "drag ended");
        Ok(outcome)
    }

    /// Abandon the drag and put the item back at its origin.
    pub fn cancel_drag(&mut self) -> Result<DragOutcome, DragError> {
        let session = self.session.take().ok_or(DragError::NotDragging)?;
        session.return_to_origin(&mut self.containers)
    }

    /// Drain every container's notifications, tagged with their container.
    pub fn drain_events(&mut self) -> Vec<(ContainerId, ContainerEvent)> {
        self.containers
            .iter_mut()
            .flat_map(|(id, container)| {
                let id = *id;
                container.drain_events().into_iter().map(move |event| (id, event))
            })
            .collect()
    }
}
