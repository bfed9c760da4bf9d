//! Daemon Core - tick loop, autosave, and the engine tying them together
//!
//! The daemon side of the crate is the long-running part that:
//! - Ticks every active map at a fixed rate and broadcasts changed blocks
//! - Saves active maps periodically
//! - Loads and unloads map animations as the host loads and unloads maps

pub mod autosave;
pub mod engine;
pub mod tick;

pub use autosave::*;
pub use engine::*;
pub use tick::*;
