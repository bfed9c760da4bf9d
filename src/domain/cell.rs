//! Animated cell - one world position carrying loops

use serde::Serialize;
use std::collections::BTreeMap;

use super::anim_loop::{BlockId, Loop, LoopIndex};
use super::position::Position;

/// One animated position. Loops are kept ordered by index.
///
/// Loops are only added or removed through `MapAnimation`, which keeps the
/// map's loop count in step and drops cells that become empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimatedCell {
    pub(crate) position: Position,
    #[serde(skip)]
    pub(crate) last_sent: Option<BlockId>,
    pub(crate) loops: BTreeMap<LoopIndex, Loop>,
}

impl AnimatedCell {
    pub(crate) fn new(position: Position) -> Self {
        Self {
            position,
            last_sent: None,
            loops: BTreeMap::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Block most recently broadcast for this cell
    pub fn last_sent(&self) -> Option<BlockId> {
        self.last_sent
    }

    /// Loops in ascending index order
    pub fn loops(&self) -> impl DoubleEndedIterator<Item = (LoopIndex, &Loop)> {
        self.loops.iter().map(|(i, l)| (*i, l))
    }

    pub fn get(&self, index: LoopIndex) -> Option<&Loop> {
        self.loops.get(&index)
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn min_index(&self) -> Option<LoopIndex> {
        self.loops.keys().next().copied()
    }

    pub fn max_index(&self) -> Option<LoopIndex> {
        self.loops.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NEVER;

    fn cell_with(indices: &[LoopIndex]) -> AnimatedCell {
        let mut cell = AnimatedCell::new(Position::new(1, 2, 3));
        for (n, i) in indices.iter().enumerate() {
            cell.loops.insert(*i, Loop::new(4, 1, 0, NEVER, n as BlockId).unwrap());
        }
        cell
    }

    #[test]
    fn test_new_cell_is_empty() {
        let cell = AnimatedCell::new(Position::new(0, 0, 0));
        assert!(cell.is_empty());
        assert_eq!(cell.last_sent(), None);
        assert_eq!(cell.min_index(), None);
    }

    #[test]
    fn test_loops_iterate_in_index_order() {
        let cell = cell_with(&[5, 1, 3]);
        let indices: Vec<LoopIndex> = cell.loops().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![1, 3, 5]);
        assert_eq!(cell.min_index(), Some(1));
        assert_eq!(cell.max_index(), Some(5));
    }

    #[test]
    fn test_get() {
        let cell = cell_with(&[2]);
        assert!(cell.get(2).is_some());
        assert!(cell.get(1).is_none());
        assert_eq!(cell.len(), 1);
    }
}
