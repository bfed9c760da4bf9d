//! Blockanim - tick-driven block animations for voxel maps
//!
//! Blocks on a map carry loops: periodic on/off rules that decide which block
//! is shown at each tick. The engine ticks every active map, broadcasts only
//! the blocks that changed, and keeps each map's loops in a text file.

pub mod config;
pub mod daemon;
pub mod domain;
pub mod editor;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod ops;
pub mod registry;
pub mod storage;
pub mod viewer;

pub use error::{AnimError, Result};
