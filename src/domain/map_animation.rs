//! Per-map animation state

use serde::Serialize;
use std::collections::BTreeMap;

use super::anim_loop::Tick;
use super::cell::AnimatedCell;
use super::position::Position;

/// Upper bound on loops held by one map
pub const MAX_LOOPS_PER_MAP: usize = u16::MAX as usize;

/// Complete animation state for one map
///
/// `loop_count` is a cached sum of every cell's loops. It is only changed by
/// the mutation methods in `crate::ops`, always together with the cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapAnimation {
    /// When false the clock is frozen and nothing is broadcast
    pub running: bool,
    /// Animation clock, wraps from `Tick::MAX` to 0
    pub current_tick: Tick,
    pub(crate) cells: BTreeMap<Position, AnimatedCell>,
    pub(crate) loop_count: usize,
    #[serde(skip)]
    pub(crate) retired: bool,
}

impl Default for MapAnimation {
    fn default() -> Self {
        Self::new()
    }
}

impl MapAnimation {
    /// Empty, running state at tick 0
    pub fn new() -> Self {
        Self {
            running: true,
            current_tick: 0,
            cells: BTreeMap::new(),
            loop_count: 0,
            retired: false,
        }
    }

    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loop_count == 0
    }

    pub fn cell(&self, position: Position) -> Option<&AnimatedCell> {
        self.cells.get(&position)
    }

    /// Cells in position order
    pub fn cells(&self) -> impl Iterator<Item = &AnimatedCell> {
        self.cells.values()
    }

    /// Advance the clock by one tick
    pub fn advance_tick(&mut self) {
        self.current_tick = self.current_tick.wrapping_add(1);
    }

    /// Forget what was last broadcast so the next tick resends every cell
    pub fn invalidate_sent(&mut self) {
        for cell in self.cells.values_mut() {
            cell.last_sent = None;
        }
    }

    /// Recount loops from the cells themselves
    pub(crate) fn counted_loops(&self) -> usize {
        self.cells.values().map(AnimatedCell::len).sum()
    }

    pub(crate) fn check_invariants(&self) {
        debug_assert_eq!(self.loop_count, self.counted_loops(), "cached loop count drifted");
        debug_assert!(self.cells.values().all(|c| !c.is_empty()), "empty cell retained");
        debug_assert!(self.cells.values().all(|c| !c.loops.contains_key(&0)), "index 0 stored");
    }
}
