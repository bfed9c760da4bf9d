//! Domain types for blockanim
//!
//! This module contains the animation data model:
//! - Loop: one periodic on/off rule carrying a block
//! - AnimatedCell: a world position holding loops ordered by index
//! - MapAnimation: every cell of one map plus its clock and run state
//! - Position/Region/MapId: addressing
//! - Placement/DeleteSelector: edit modes

pub mod anim_loop;
pub mod cell;
pub mod edit;
pub mod map_animation;
pub mod map_id;
pub mod position;

pub use anim_loop::{BlockId, Loop, LoopIndex, NEVER, Tick};
pub use cell::AnimatedCell;
pub use edit::{DeleteSelector, Placement};
pub use map_animation::{MAX_LOOPS_PER_MAP, MapAnimation};
pub use map_id::MapId;
pub use position::{Offset, Position, Region};
