//! Edit modes shared by placement, paste and delete

use serde::{Deserialize, Serialize};

use super::anim_loop::{BlockId, LoopIndex};

/// Where new loops go relative to the loops already in a cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Clear the cell, new loops start at index 1
    #[default]
    Overwrite,
    /// After the current highest index
    Append,
    /// Existing loops move up, new loops start at index 1
    Prepend,
    /// Exactly at this index, replacing whatever is there
    At(LoopIndex),
}

/// Which loops a delete removes from a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteSelector {
    /// Every loop, removing the cell
    All,
    /// The loop at one index
    Index(LoopIndex),
    /// Every loop showing this block
    Block(BlockId),
}
