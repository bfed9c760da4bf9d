//! Storage layer - animation files on disk
//!
//! Each map's loops live in a plain text file, one loop per line. The codec
//! turns a `MapAnimation` into lines and back; the store owns the directory
//! and the file lifecycle.

mod codec;
mod store;

pub use codec::{Decoded, LineError, decode, encode, parse_line};
pub use store::AnimationStore;
