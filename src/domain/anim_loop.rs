//! Loop definition
//!
//! A Loop is one periodic visibility rule: every `interval` ticks, starting at
//! `start`, the loop shows `block` for `duration` ticks. Past `end` the loop
//! freezes in whatever state it had at `end`.

use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};

/// Host block identifier
pub type BlockId = u16;

/// Position of a loop inside its cell (1-based, 0 is reserved)
pub type LoopIndex = u16;

/// Value of a map's animation clock
pub type Tick = u16;

/// End tick meaning "never freezes"
pub const NEVER: Tick = Tick::MAX;

/// A single periodic on/off rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loop {
    /// Period in ticks
    pub interval: u16,
    /// Ticks per period during which the loop is visible
    pub duration: u16,
    /// Tick at which the first period begins (may be negative)
    pub start: i32,
    /// Tick after which the phase freezes
    pub end: Tick,
    /// Block shown while the loop is on
    pub block: BlockId,
}

impl Loop {
    /// Create a validated loop
    pub fn new(interval: u16, duration: u16, start: i32, end: Tick, block: BlockId) -> Result<Self> {
        let lp = Self {
            interval,
            duration,
            start,
            end,
            block,
        };
        lp.validate()?;
        Ok(lp)
    }

    /// Create a loop that starts at tick 0 and never freezes
    pub fn forever(interval: u16, duration: u16, block: BlockId) -> Result<Self> {
        Self::new(interval, duration, 0, NEVER, block)
    }

    /// Build a block-list sequence: each block is shown for its duration, one
    /// after the other, and the whole sequence repeats.
    ///
    /// All loops share `interval = sum of durations`; each starts where the
    /// previous one ends.
    pub fn sequence(start: i32, end: Tick, frames: &[(BlockId, u16)]) -> Result<Vec<Self>> {
        if frames.is_empty() {
            return Err(AnimError::Input("block list cannot be empty".to_string()));
        }

        let total: u32 = frames.iter().map(|(_, d)| u32::from(*d)).sum();
        let interval = u16::try_from(total)
            .map_err(|_| AnimError::Input(format!("sequence period {} exceeds {}", total, u16::MAX)))?;

        let mut offset = start;
        let mut loops = Vec::with_capacity(frames.len());
        for (block, duration) in frames {
            loops.push(Self::new(interval, *duration, offset, end, *block)?);
            offset = offset
                .checked_add(i32::from(*duration))
                .ok_or_else(|| AnimError::Capacity("sequence start out of range".to_string()))?;
        }
        Ok(loops)
    }

    /// Check the loop invariants
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(AnimError::Input("interval cannot be 0".to_string()));
        }
        if self.duration == 0 {
            return Err(AnimError::Input("duration cannot be 0".to_string()));
        }
        if self.duration > self.interval {
            return Err(AnimError::Input(format!(
                "duration {} cannot be greater than interval {}",
                self.duration, self.interval
            )));
        }
        if i64::from(self.start) > i64::from(self.end) {
            return Err(AnimError::Input(format!(
                "start {} cannot be greater than end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Same loop with its start moved by `delay` ticks
    pub fn shifted(&self, delay: i32) -> Result<Self> {
        let start = self
            .start
            .checked_add(delay)
            .ok_or_else(|| AnimError::Capacity(format!("start {} + {} out of range", self.start, delay)))?;
        Ok(Self { start, ..*self })
    }

    /// True if the loop never freezes
    pub fn is_endless(&self) -> bool {
        self.end == NEVER
    }
}
