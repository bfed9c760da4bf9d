//! Per-viewer sends: current frame on join, single-cell resends, markers

use std::sync::Arc;

use crate::domain::{BlockId, MapAnimation, MapId, Position};
use crate::error::Result;
use crate::evaluator::{LayerOrder, visible_at_cell};
use crate::host::{BlockChange, BlockSink, ViewerId, World};
use crate::registry::AnimationRegistry;

/// Animation-related state kept for one connected viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSession {
    pub id: ViewerId,
    /// Animated cells are painted with the marker block instead of animating
    pub markers_shown: bool,
}

impl ViewerSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ViewerId(id.into()),
            markers_shown: false,
        }
    }

    /// Whether tick broadcasts should reach this viewer
    pub fn receives_animation(&self) -> bool {
        !self.markers_shown
    }
}

/// Sends animation state to individual viewers
pub struct ViewerSync {
    registry: Arc<AnimationRegistry>,
    world: Arc<dyn World>,
    sink: Arc<dyn BlockSink>,
    order: LayerOrder,
    marker_block: BlockId,
}

impl ViewerSync {
    pub fn new(
        registry: Arc<AnimationRegistry>,
        world: Arc<dyn World>,
        sink: Arc<dyn BlockSink>,
        order: LayerOrder,
        marker_block: BlockId,
    ) -> Self {
        Self {
            registry,
            world,
            sink,
            order,
            marker_block,
        }
    }

    /// Send every currently visible animated block on `map`
    ///
    /// Cells showing terrain are left out since the viewer already has it.
    /// Returns how many cells were sent.
    pub fn send_current_frame(&self, session: &ViewerSession, map: &MapId) -> Result<usize> {
        let changes = if session.receives_animation() {
            self.registry.with_map(map, |state| self.frame(state, None))?
        } else {
            self.registry.with_map(map, |state| self.markers(state))?
        };
        let changes = changes.unwrap_or_default();
        if !changes.is_empty() {
            self.sink.send_to_viewer(&session.id, &changes);
        }
        Ok(changes.len())
    }

    /// Resend the block at one position, e.g. after the viewer clicked it
    ///
    /// Returns false when the position holds no animation.
    pub fn send_current_frame_at(&self, session: &ViewerSession, map: &MapId, position: Position) -> Result<bool> {
        let block = self.registry.with_map(map, |state| {
            let cell = state.cell(position)?;
            if !session.receives_animation() {
                return Some(self.marker_block);
            }
            visible_at_cell(cell, state.current_tick, self.order).or_else(|| self.world.terrain_block(map, position))
        })?;

        match block.flatten() {
            Some(block) => {
                self.sink.send_to_viewer(&session.id, &[BlockChange { position, block }]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flip the marker display for one viewer, returning the new state
    ///
    /// Turning markers on paints every animated cell with the marker block.
    /// Turning them off resends the real frame, terrain included.
    pub fn toggle_markers(&self, session: &mut ViewerSession, map: &MapId) -> Result<bool> {
        let changes = if session.markers_shown {
            self.registry.with_map(map, |state| self.frame(state, Some(map)))?
        } else {
            self.registry.with_map(map, |state| self.markers(state))?
        };
        session.markers_shown = !session.markers_shown;

        let changes = changes.unwrap_or_default();
        if !changes.is_empty() {
            self.sink.send_to_viewer(&session.id, &changes);
        }
        log::debug!(
            "Markers {} for {} on {}",
            if session.markers_shown { "shown" } else { "hidden" },
            session.id,
            map
        );
        Ok(session.markers_shown)
    }

    /// Visible blocks at the map's tick; terrain is filled in when `terrain_for` is set
    fn frame(&self, state: &MapAnimation, terrain_for: Option<&MapId>) -> Vec<BlockChange> {
        state
            .cells()
            .filter_map(|cell| {
                let block = visible_at_cell(cell, state.current_tick, self.order)
                    .or_else(|| terrain_for.and_then(|map| self.world.terrain_block(map, cell.position())))?;
                Some(BlockChange {
                    position: cell.position(),
                    block,
                })
            })
            .collect()
    }

    fn markers(&self, state: &MapAnimation) -> Vec<BlockChange> {
        state
            .cells()
            .map(|cell| BlockChange {
                position: cell.position(),
                block: self.marker_block,
            })
            .collect()
    }
}
