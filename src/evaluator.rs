//! Loop evaluation - which block a loop or cell shows at a tick
//!
//! Pure functions, no state. `None` means "show the terrain underneath".

use serde::{Deserialize, Serialize};

use crate::domain::{AnimatedCell, BlockId, Loop, Tick};

/// Which loop wins when several loops in a cell are on at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerOrder {
    /// Ascending scan: the lowest visible index is shown
    #[default]
    LowestIndexFirst,
    /// Descending scan: the highest visible index is shown
    HighestIndexFirst,
}

/// Block shown by a single loop at `tick`
///
/// Past `end` the loop keeps the on/off state it had at `end`.
pub fn visible(lp: &Loop, tick: Tick) -> Option<BlockId> {
    let tick = i64::from(tick);
    let start = i64::from(lp.start);
    if tick < start {
        return None;
    }

    let sample = tick.min(i64::from(lp.end));
    let phase = (sample - start).rem_euclid(i64::from(lp.interval));
    (phase < i64::from(lp.duration)).then_some(lp.block)
}

/// Block shown by a cell at `tick`: the first visible loop in `order`
pub fn visible_at_cell(cell: &AnimatedCell, tick: Tick, order: LayerOrder) -> Option<BlockId> {
    match order {
        LayerOrder::LowestIndexFirst => cell.loops().find_map(|(_, lp)| visible(lp, tick)),
        LayerOrder::HighestIndexFirst => cell.loops().rev().find_map(|(_, lp)| visible(lp, tick)),
    }
}
