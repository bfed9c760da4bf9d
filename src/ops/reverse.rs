//! Time reversal of a cell's loops
//!
//! Each loop's start first moves by `interval - duration`, flipping its phase
//! inside its own period. The offsets of the loops from the earliest start are
//! then mirrored inside a super-period equal to the least common multiple of
//! their intervals, so a sequence A then B then C plays as C then B then A.
//! When the super-period is larger than the configured ceiling only the
//! per-loop phase flip is applied.

use std::fmt;

use super::LoopMap;
use crate::domain::{Loop, MapAnimation, Position};
use crate::error::{AnimError, Result};

/// How a reversal was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverseMode {
    /// Loops re-sequenced inside a common super-period
    Resequenced { super_period: u64 },
    /// Super-period over the ceiling: each loop flipped inside its own interval
    PhaseFlip,
}

impl fmt::Display for ReverseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReverseMode::Resequenced { super_period } => write!(f, "resequenced over {} ticks", super_period),
            ReverseMode::PhaseFlip => write!(f, "per-loop phase flip"),
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple of `intervals`, or `None` once it passes `ceiling`
pub fn lcm_within(intervals: impl IntoIterator<Item = u16>, ceiling: u64) -> Option<u64> {
    let mut acc: u64 = 1;
    for interval in intervals {
        let interval = u64::from(interval);
        if interval == 0 {
            return None;
        }
        acc = (acc / gcd(acc, interval)).checked_mul(interval)?;
        if acc > ceiling {
            return None;
        }
    }
    Some(acc)
}

/// New start ticks for `loops`, in the same order
pub fn reversed_starts(loops: &[Loop], ceiling: u64) -> Result<(Vec<i32>, ReverseMode)> {
    if loops.is_empty() {
        return Ok((Vec::new(), ReverseMode::Resequenced { super_period: 1 }));
    }

    if let Some(super_period) = lcm_within(loops.iter().map(|l| l.interval), ceiling) {
        let period = i64::try_from(super_period).unwrap_or(i64::MAX);
        let anchor = loops.iter().map(|l| i64::from(l.start)).min().unwrap_or(0);
        let flip = |l: &Loop| i64::from(l.interval) - i64::from(l.duration);

        // offset from the anchor mirrored, then the phase flip, wrapped into the super-period
        let starts: Option<Vec<i32>> = loops
            .iter()
            .map(|l| {
                let mirrored = anchor - i64::from(l.start);
                i32::try_from(anchor + (mirrored + flip(l)).rem_euclid(period)).ok()
            })
            .collect();
        if let Some(starts) = starts {
            return Ok((starts, ReverseMode::Resequenced { super_period }));
        }
    }

    let starts = loops
        .iter()
        .map(|l| {
            l.start
                .checked_add(i32::from(l.interval - l.duration))
                .ok_or_else(|| AnimError::Capacity(format!("start {} cannot be flipped", l.start)))
        })
        .collect::<Result<Vec<i32>>>()?;
    Ok((starts, ReverseMode::PhaseFlip))
}

impl MapAnimation {
    /// Time-reverse the loops at a position
    ///
    /// Returns `None` when there is no cell at `position`.
    pub fn reverse(&mut self, position: Position, max_super_period: u64) -> Result<Option<ReverseMode>> {
        let Some(cell) = self.cells.get(&position) else {
            return Ok(None);
        };

        let loops: Vec<Loop> = cell.loops.values().copied().collect();
        let (starts, mode) = reversed_starts(&loops, max_super_period)?;
        if mode == ReverseMode::PhaseFlip {
            log::warn!(
                "Super-period at {} exceeds {} ticks, reversing each loop on its own",
                position,
                max_super_period
            );
        }

        let reversed = cell
            .loops
            .iter()
            .zip(starts)
            .map(|((index, lp), start)| {
                let flipped = Loop { start, ..*lp };
                flipped.validate()?;
                Ok((*index, flipped))
            })
            .collect::<Result<LoopMap>>()?;

        if let Some(cell) = self.cells.get_mut(&position) {
            cell.loops = reversed;
        }
        Ok(Some(mode))
    }
}
