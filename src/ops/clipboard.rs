//! Copy and paste of animated regions

use serde::Serialize;

use super::{LoopMap, arrange, shifted_loops};
use crate::domain::{MAX_LOOPS_PER_MAP, MapAnimation, Offset, Placement, Position, Region};
use crate::error::{AnimError, Result};

/// One copied cell, relative to the clipboard anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardCell {
    pub offset: Offset,
    pub loops: LoopMap,
}

/// Animated cells captured from a region, anchored at its minimum corner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clipboard {
    pub anchor: Position,
    pub region: Region,
    pub cells: Vec<ClipboardCell>,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn loop_count(&self) -> usize {
        self.cells.iter().map(|c| c.loops.len()).sum()
    }
}

/// Outcome of a paste
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasteReport {
    /// Cells written into the map
    pub pasted: usize,
    /// Cells whose destination fell outside the map
    pub skipped: usize,
}

impl MapAnimation {
    /// Capture every animated cell inside `region`
    pub fn copy(&self, region: Region) -> Result<Clipboard> {
        let volume = region.volume();
        if volume > MAX_LOOPS_PER_MAP as u64 {
            return Err(AnimError::Capacity(format!(
                "region of {} blocks exceeds the copy limit of {}",
                volume, MAX_LOOPS_PER_MAP
            )));
        }

        let anchor = region.min();
        let cells = self
            .cells
            .range(region.min()..=region.max())
            .filter(|(p, _)| region.contains(**p))
            .map(|(p, cell)| ClipboardCell {
                offset: p.delta_from(anchor),
                loops: cell.loops.clone(),
            })
            .collect();

        Ok(Clipboard { anchor, region, cells })
    }

    /// Re-apply a clipboard with its anchor moved to `anchor`
    ///
    /// Every start is shifted by `delay`. Destinations outside the map, as
    /// judged by `in_bounds`, are skipped.
    pub fn paste(
        &mut self,
        clipboard: &Clipboard,
        anchor: Position,
        delay: i32,
        placement: Placement,
        in_bounds: impl Fn(Position) -> bool,
    ) -> Result<PasteReport> {
        let mut report = PasteReport::default();
        let mut changes = Vec::with_capacity(clipboard.cells.len());

        for copied in &clipboard.cells {
            let Some(dest) = anchor.offset(copied.offset).filter(|p| in_bounds(*p)) else {
                report.skipped += 1;
                continue;
            };
            let loops = shifted_loops(&copied.loops, delay)?;
            let arranged = arrange(self.cell(dest).map(|c| &c.loops), loops, placement)?;
            changes.push((dest, arranged));
        }

        report.pasted = changes.len();
        self.commit(changes)?;
        Ok(report)
    }
}
