//! Mutation operations on a map's animation state
//!
//! Every operation either applies completely or returns an error and leaves
//! the map untouched. The cached loop count is adjusted in the same step as
//! the cells, and cells that lose their last loop are dropped.

mod clipboard;
mod reverse;

use std::collections::BTreeMap;

use crate::domain::{
    AnimatedCell, DeleteSelector, Loop, LoopIndex, MAX_LOOPS_PER_MAP, MapAnimation, Placement, Position, Region,
};
use crate::error::{AnimError, Result};

pub use clipboard::{Clipboard, ClipboardCell, PasteReport};
pub use reverse::{ReverseMode, lcm_within, reversed_starts};

/// Loops of one cell keyed by index
pub(crate) type LoopMap = BTreeMap<LoopIndex, Loop>;

impl MapAnimation {
    /// Place one loop at a position
    pub fn place(&mut self, position: Position, placement: Placement, lp: Loop) -> Result<()> {
        self.place_many(position, placement, vec![lp])
    }

    /// Place several loops at a position, keeping their order
    pub fn place_many(&mut self, position: Position, placement: Placement, loops: Vec<Loop>) -> Result<()> {
        if loops.is_empty() {
            return Err(AnimError::Input("nothing to place".to_string()));
        }
        for lp in &loops {
            lp.validate()?;
        }

        let incoming = numbered(loops)?;
        let arranged = arrange(self.cell(position).map(|c| &c.loops), incoming, placement)?;
        self.commit(vec![(position, arranged)])
    }

    /// Remove the loops matching `selector`, returning how many were removed
    pub fn delete(&mut self, position: Position, selector: DeleteSelector) -> usize {
        let Some(cell) = self.cells.get_mut(&position) else {
            return 0;
        };

        let before = cell.loops.len();
        match selector {
            DeleteSelector::All => cell.loops.clear(),
            DeleteSelector::Index(index) => {
                cell.loops.remove(&index);
            }
            DeleteSelector::Block(block) => cell.loops.retain(|_, lp| lp.block != block),
        }
        let removed = before - cell.loops.len();

        if cell.loops.is_empty() {
            self.cells.remove(&position);
        }
        self.loop_count -= removed;
        self.check_invariants();
        removed
    }

    /// Exchange the loops at two indices
    ///
    /// Index 0 stands for the smallest index currently in the cell. If only
    /// one side holds a loop it is moved to the other index. Returns false
    /// when nothing changed.
    pub fn swap(&mut self, position: Position, first: LoopIndex, second: LoopIndex) -> Result<bool> {
        let Some(cell) = self.cells.get_mut(&position) else {
            return Ok(false);
        };

        let smallest = cell.min_index().unwrap_or(0);
        let resolve = |i: LoopIndex| if i == 0 { smallest } else { i };
        let (a, b) = (resolve(first), resolve(second));
        if a == b {
            return Ok(false);
        }

        match (cell.loops.remove(&a), cell.loops.remove(&b)) {
            (None, None) => return Ok(false),
            (Some(la), None) => {
                cell.loops.insert(b, la);
            }
            (None, Some(lb)) => {
                cell.loops.insert(a, lb);
            }
            (Some(la), Some(lb)) => {
                cell.loops.insert(a, lb);
                cell.loops.insert(b, la);
            }
        }
        self.check_invariants();
        Ok(true)
    }

    /// Delay every loop at a position by `delay` ticks
    pub fn shift(&mut self, position: Position, delay: i32) -> Result<bool> {
        let Some(cell) = self.cells.get(&position) else {
            return Ok(false);
        };

        let shifted = shifted_loops(&cell.loops, delay)?;
        if let Some(cell) = self.cells.get_mut(&position) {
            cell.loops = shifted;
        }
        Ok(true)
    }

    /// Positions of the animated cells inside `region`
    pub fn positions_in(&self, region: Region) -> Vec<Position> {
        self.cells
            .range(region.min()..=region.max())
            .map(|(p, _)| *p)
            .filter(|p| region.contains(*p))
            .collect()
    }

    /// Apply per-cell replacements after checking the map-wide loop limit
    pub(crate) fn commit(&mut self, changes: Vec<(Position, LoopMap)>) -> Result<()> {
        let removed: usize = changes
            .iter()
            .filter_map(|(p, _)| self.cells.get(p))
            .map(AnimatedCell::len)
            .sum();
        let added: usize = changes.iter().map(|(_, loops)| loops.len()).sum();
        let total = self.loop_count - removed + added;
        if total > MAX_LOOPS_PER_MAP {
            return Err(AnimError::Capacity(format!(
                "map would hold {} loops, limit is {}",
                total, MAX_LOOPS_PER_MAP
            )));
        }

        for (position, loops) in changes {
            if loops.is_empty() {
                self.cells.remove(&position);
                continue;
            }
            let cell = self
                .cells
                .entry(position)
                .or_insert_with(|| AnimatedCell::new(position));
            cell.loops = loops;
        }
        self.loop_count = total;
        self.check_invariants();
        Ok(())
    }
}

/// Number loops 1..=n in the given order
fn numbered(loops: Vec<Loop>) -> Result<LoopMap> {
    let mut map = LoopMap::new();
    for (n, lp) in loops.into_iter().enumerate() {
        let index = LoopIndex::try_from(n + 1)
            .map_err(|_| AnimError::Capacity("too many loops for one cell".to_string()))?;
        map.insert(index, lp);
    }
    Ok(map)
}

/// Combine a cell's existing loops with incoming ones according to `placement`
///
/// For `Overwrite` the incoming indices are kept; the other modes only use
/// the incoming order.
pub(crate) fn arrange(existing: Option<&LoopMap>, incoming: LoopMap, placement: Placement) -> Result<LoopMap> {
    let overflow = || AnimError::Capacity("loop index out of range".to_string());
    let empty = LoopMap::new();
    let existing = existing.unwrap_or(&empty);

    match placement {
        Placement::Overwrite => Ok(incoming),
        Placement::Append => {
            let base = existing.keys().next_back().copied().unwrap_or(0);
            let mut out = existing.clone();
            for (n, lp) in incoming.into_values().enumerate() {
                let offset = LoopIndex::try_from(n + 1).map_err(|_| overflow())?;
                out.insert(base.checked_add(offset).ok_or_else(overflow)?, lp);
            }
            Ok(out)
        }
        Placement::Prepend => {
            let count = LoopIndex::try_from(incoming.len()).map_err(|_| overflow())?;
            let mut out = LoopMap::new();
            for (n, lp) in incoming.into_values().enumerate() {
                out.insert(LoopIndex::try_from(n + 1).map_err(|_| overflow())?, lp);
            }
            for (index, lp) in existing {
                out.insert(index.checked_add(count).ok_or_else(overflow)?, *lp);
            }
            Ok(out)
        }
        Placement::At(index) => {
            if index == 0 {
                return Err(AnimError::Input("loop index 0 is reserved".to_string()));
            }
            let mut out = existing.clone();
            for (n, lp) in incoming.into_values().enumerate() {
                let offset = LoopIndex::try_from(n).map_err(|_| overflow())?;
                out.insert(index.checked_add(offset).ok_or_else(overflow)?, lp);
            }
            Ok(out)
        }
    }
}

/// Copy of `loops` with every start moved by `delay`, validated
pub(crate) fn shifted_loops(loops: &LoopMap, delay: i32) -> Result<LoopMap> {
    loops
        .iter()
        .map(|(index, lp)| {
            let moved = lp.shifted(delay)?;
            moved.validate()?;
            Ok((*index, moved))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockId, NEVER};
    use proptest::prelude::*;

    const P: Position = Position::new(10, 20, 30);

    fn lp(block: BlockId) -> Loop {
        Loop::new(10, 3, 0, NEVER, block).unwrap()
    }

    fn blocks(map: &MapAnimation, p: Position) -> Vec<(LoopIndex, BlockId)> {
        map.cell(p)
            .map(|c| c.loops().map(|(i, l)| (i, l.block)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_place_creates_cell_at_index_one() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Overwrite, lp(1)).unwrap();
        assert_eq!(blocks(&map, P), vec![(1, 1)]);
        assert_eq!(map.loop_count(), 1);
        assert_eq!(map.cell_count(), 1);
    }

    #[test]
    fn test_place_overwrite_clears_existing() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        map.place(P, Placement::Append, lp(2)).unwrap();
        map.place(P, Placement::Overwrite, lp(3)).unwrap();
        assert_eq!(blocks(&map, P), vec![(1, 3)]);
        assert_eq!(map.loop_count(), 1);
    }

    #[test]
    fn test_place_append_uses_next_index() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        map.place(P, Placement::At(7), lp(2)).unwrap();
        map.place(P, Placement::Append, lp(3)).unwrap();
        assert_eq!(blocks(&map, P), vec![(1, 1), (7, 2), (8, 3)]);
        assert_eq!(map.loop_count(), 3);
    }

    #[test]
    fn test_place_prepend_renumbers() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        map.place(P, Placement::Append, lp(2)).unwrap();
        map.place(P, Placement::Prepend, lp(3)).unwrap();
        assert_eq!(blocks(&map, P), vec![(1, 3), (2, 1), (3, 2)]);
        assert_eq!(map.loop_count(), 3);
    }

    #[test]
    fn test_place_at_replaces_without_double_count() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::At(2), lp(1)).unwrap();
        map.place(P, Placement::At(2), lp(5)).unwrap();
        assert_eq!(blocks(&map, P), vec![(2, 5)]);
        assert_eq!(map.loop_count(), 1);
    }

    #[test]
    fn test_place_at_zero_rejected() {
        let mut map = MapAnimation::new();
        let err = map.place(P, Placement::At(0), lp(1)).unwrap_err();
        assert!(err.is_input());
        assert!(map.is_empty());
    }

    #[test]
    fn test_place_invalid_loop_rejected_without_change() {
        let mut map = MapAnimation::new();
        let bad = Loop {
            interval: 4,
            duration: 9,
            start: 0,
            end: NEVER,
            block: 1,
        };
        assert!(map.place(P, Placement::Append, bad).unwrap_err().is_input());
        assert_eq!(map.cell_count(), 0);
    }

    #[test]
    fn test_append_index_overflow() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::At(LoopIndex::MAX), lp(1)).unwrap();
        let err = map.place(P, Placement::Append, lp(2)).unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(map.loop_count(), 1);
    }

    #[test]
    fn test_place_many_sequence() {
        let mut map = MapAnimation::new();
        let seq = Loop::sequence(0, NEVER, &[(21, 2), (23, 3), (25, 1)]).unwrap();
        map.place_many(P, Placement::Overwrite, seq).unwrap();
        assert_eq!(blocks(&map, P), vec![(1, 21), (2, 23), (3, 25)]);
        assert_eq!(map.loop_count(), 3);
    }

    #[test]
    fn test_map_capacity_limit() {
        let mut map = MapAnimation::new();
        map.loop_count = MAX_LOOPS_PER_MAP;
        let err = map.place(P, Placement::Append, lp(1)).unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(map.cell_count(), 0);
    }

    #[test]
    fn test_delete_by_index() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        map.place(P, Placement::Append, lp(2)).unwrap();
        assert_eq!(map.delete(P, DeleteSelector::Index(1)), 1);
        assert_eq!(blocks(&map, P), vec![(2, 2)]);
        assert_eq!(map.loop_count(), 1);
    }

    #[test]
    fn test_delete_by_block_keeps_other_loops() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        map.place(P, Placement::Append, lp(2)).unwrap();
        map.place(P, Placement::Append, lp(1)).unwrap();
        assert_eq!(map.delete(P, DeleteSelector::Block(1)), 2);
        assert_eq!(blocks(&map, P), vec![(2, 2)]);
        assert_eq!(map.loop_count(), 1);
    }

    #[test]
    fn test_delete_last_loop_removes_cell() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        assert_eq!(map.delete(P, DeleteSelector::Block(1)), 1);
        assert!(map.cell(P).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut map = MapAnimation::new();
        assert_eq!(map.delete(P, DeleteSelector::All), 0);
        map.place(P, Placement::Append, lp(1)).unwrap();
        assert_eq!(map.delete(P, DeleteSelector::Index(9)), 0);
        assert_eq!(map.loop_count(), 1);
    }

    #[test]
    fn test_swap_both_present() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        map.place(P, Placement::Append, lp(2)).unwrap();
        assert!(map.swap(P, 1, 2).unwrap());
        assert_eq!(blocks(&map, P), vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_swap_twice_restores() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        map.place(P, Placement::Append, lp(2)).unwrap();
        map.place(P, Placement::Append, lp(3)).unwrap();
        let before = blocks(&map, P);
        map.swap(P, 1, 3).unwrap();
        map.swap(P, 1, 3).unwrap();
        assert_eq!(blocks(&map, P), before);
    }

    #[test]
    fn test_swap_one_side_missing_moves() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        assert!(map.swap(P, 1, 5).unwrap());
        assert_eq!(blocks(&map, P), vec![(5, 1)]);
        assert_eq!(map.loop_count(), 1);
    }

    #[test]
    fn test_swap_neither_present() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        assert!(!map.swap(P, 4, 5).unwrap());
        assert!(!map.swap(Position::new(0, 0, 0), 1, 2).unwrap());
    }

    #[test]
    fn test_swap_zero_means_smallest_index() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::At(3), lp(1)).unwrap();
        map.place(P, Placement::At(6), lp(2)).unwrap();
        assert!(map.swap(P, 0, 6).unwrap());
        assert_eq!(blocks(&map, P), vec![(3, 2), (6, 1)]);
    }

    #[test]
    fn test_swap_zero_twice_resolves_again() {
        // 0 is resolved against the current smallest index each time, so a
        // move-to-empty-slot is not undone by repeating the swap
        let mut map = MapAnimation::new();
        map.place(P, Placement::At(3), lp(1)).unwrap();
        map.place(P, Placement::At(6), lp(2)).unwrap();
        assert!(map.swap(P, 0, 1).unwrap());
        assert_eq!(blocks(&map, P), vec![(1, 1), (6, 2)]);
        // smallest is now 1, which equals the other side
        assert!(!map.swap(P, 0, 1).unwrap());
        assert_eq!(blocks(&map, P), vec![(1, 1), (6, 2)]);
    }

    #[test]
    fn test_swap_same_index_noop() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, lp(1)).unwrap();
        assert!(!map.swap(P, 1, 1).unwrap());
        assert!(!map.swap(P, 0, 1).unwrap());
    }

    #[test]
    fn test_shift_moves_starts_only() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, Loop::new(10, 3, 2, 500, 1).unwrap())
            .unwrap();
        assert!(map.shift(P, -5).unwrap());
        let shifted = *map.cell(P).unwrap().get(1).unwrap();
        assert_eq!(shifted, Loop::new(10, 3, -3, 500, 1).unwrap());
    }

    #[test]
    fn test_shift_past_end_rejected() {
        let mut map = MapAnimation::new();
        map.place(P, Placement::Append, Loop::new(10, 3, 0, 20, 1).unwrap())
            .unwrap();
        assert!(map.shift(P, 50).unwrap_err().is_input());
        assert_eq!(map.cell(P).unwrap().get(1).unwrap().start, 0);
    }

    #[test]
    fn test_shift_missing_cell() {
        let mut map = MapAnimation::new();
        assert!(!map.shift(P, 3).unwrap());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Place(u16, u8, BlockId),
        Delete(u16, u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u16..4, 0u8..4, 0u16..3).prop_map(|(x, mode, b)| Op::Place(x, mode, b)),
            (0u16..4, 0u8..5).prop_map(|(x, sel)| Op::Delete(x, sel)),
        ]
    }

    proptest! {
        #[test]
        fn prop_loop_count_matches_cells(ops in proptest::collection::vec(op_strategy(), 0..60)) {
            let mut map = MapAnimation::new();
            for op in ops {
                match op {
                    Op::Place(x, mode, block) => {
                        let placement = match mode {
                            0 => Placement::Overwrite,
                            1 => Placement::Append,
                            2 => Placement::Prepend,
                            _ => Placement::At(2),
                        };
                        map.place(Position::new(x, 0, 0), placement, lp(block)).unwrap();
                    }
                    Op::Delete(x, sel) => {
                        let selector = match sel {
                            0 => DeleteSelector::All,
                            1 | 2 => DeleteSelector::Index(u16::from(sel)),
                            _ => DeleteSelector::Block(u16::from(sel) - 3),
                        };
                        map.delete(Position::new(x, 0, 0), selector);
                    }
                }
                prop_assert_eq!(map.loop_count(), map.counted_loops());
                prop_assert!(map.cells().all(|c| !c.is_empty()));
            }
        }
    }
}
