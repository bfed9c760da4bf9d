//! Host collaborator interfaces
//!
//! The engine never talks to players, levels or the network directly. The host
//! server implements these traits to answer terrain queries and deliver block
//! changes to viewers.

use serde::Serialize;
use std::fmt;

use crate::domain::{BlockId, MapId, Position};

/// One block update for a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockChange {
    pub position: Position,
    pub block: BlockId,
}

/// Opaque identifier of a connected viewer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ViewerId(pub String);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read access to the host's maps
pub trait World: Send + Sync {
    /// Terrain block stored at a position, `None` if outside the map
    fn terrain_block(&self, map: &MapId, position: Position) -> Option<BlockId>;

    /// Whether the map is currently loaded
    fn is_loaded(&self, map: &MapId) -> bool;

    /// Whether a position lies inside the map
    fn in_bounds(&self, map: &MapId, position: Position) -> bool {
        self.terrain_block(map, position).is_some()
    }
}

/// Delivery of block changes to viewers
///
/// Calls are fire-and-forget; the engine never waits on delivery.
pub trait BlockSink: Send + Sync {
    /// Send a batch to every viewer on `map` that receives animations
    ///
    /// The engine does not track who is on a map. Implementations must skip
    /// viewers whose `ViewerSession::receives_animation` is false, or frames
    /// would paint over their markers.
    fn broadcast(&self, map: &MapId, changes: &[BlockChange]);

    /// Send a batch to a single viewer
    fn send_to_viewer(&self, viewer: &ViewerId, changes: &[BlockChange]);
}

/// Box-shaped map with solid ground below `ground` and air above
#[derive(Debug, Clone)]
pub struct FlatWorld {
    pub width: u16,
    pub height: u16,
    pub length: u16,
    pub ground: u16,
    pub ground_block: BlockId,
    pub air_block: BlockId,
}

impl FlatWorld {
    pub fn new(width: u16, height: u16, length: u16) -> Self {
        Self {
            width,
            height,
            length,
            ground: height / 2,
            ground_block: 1,
            air_block: 0,
        }
    }
}

impl World for FlatWorld {
    fn terrain_block(&self, _map: &MapId, position: Position) -> Option<BlockId> {
        if position.x >= self.width || position.y >= self.height || position.z >= self.length {
            return None;
        }
        Some(if position.y < self.ground {
            self.ground_block
        } else {
            self.air_block
        })
    }

    fn is_loaded(&self, _map: &MapId) -> bool {
        true
    }
}

/// Batch captured by `RecordingSink`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Delivery {
    Broadcast { map: MapId, changes: Vec<BlockChange> },
    Viewer { viewer: ViewerId, changes: Vec<BlockChange> },
}

/// Sink that keeps every batch in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: std::sync::Mutex<Vec<Delivery>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything delivered so far
    pub fn take(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|mut d| std::mem::take(&mut *d))
            .unwrap_or_default()
    }

    fn push(&self, delivery: Delivery) {
        if let Ok(mut d) = self.deliveries.lock() {
            d.push(delivery);
        }
    }
}

impl BlockSink for RecordingSink {
    fn broadcast(&self, map: &MapId, changes: &[BlockChange]) {
        self.push(Delivery::Broadcast {
            map: map.clone(),
            changes: changes.to_vec(),
        });
    }

    fn send_to_viewer(&self, viewer: &ViewerId, changes: &[BlockChange]) {
        self.push(Delivery::Viewer {
            viewer: viewer.clone(),
            changes: changes.to_vec(),
        });
    }
}
