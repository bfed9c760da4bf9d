//! Map-level editing facade
//!
//! `AnimationEditor` resolves a map through the registry and runs the
//! mutation operations under that map's lock. Maps are created on the first
//! placement and deactivated as soon as they lose their last loop.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{DeleteSelector, Loop, LoopIndex, MapAnimation, MapId, Placement, Position, Region, Tick};
use crate::error::{AnimError, Result};
use crate::host::World;
use crate::ops::{Clipboard, PasteReport, ReverseMode};
use crate::registry::AnimationRegistry;

/// Cells an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditScope {
    Cell(Position),
    /// Placements fill every position; other edits touch the animated cells inside
    Cuboid(Region),
}

/// One editing verb with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "lowercase")]
pub enum EditCommand {
    Place { placement: Placement, loops: Vec<Loop> },
    Delete { selector: DeleteSelector },
    Swap { first: LoopIndex, second: LoopIndex },
    Shift { delay: i32 },
    Reverse,
}

/// Result of `AnimationEditor::apply`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditSummary {
    /// Cells the command changed
    pub cells: usize,
    /// Loops added minus loops removed
    pub loop_delta: i64,
}

/// Editing entry point used by command handlers
pub struct AnimationEditor {
    registry: Arc<AnimationRegistry>,
    world: Arc<dyn World>,
    max_super_period: u64,
}

impl AnimationEditor {
    pub fn new(registry: Arc<AnimationRegistry>, world: Arc<dyn World>, max_super_period: u64) -> Self {
        Self {
            registry,
            world,
            max_super_period,
        }
    }

    pub fn registry(&self) -> &Arc<AnimationRegistry> {
        &self.registry
    }

    /// Place one loop, creating the map's state if needed
    pub fn place(&self, map: &MapId, position: Position, placement: Placement, lp: Loop) -> Result<()> {
        self.place_many(map, position, placement, vec![lp])
    }

    /// Place a list of loops, creating the map's state if needed
    pub fn place_many(&self, map: &MapId, position: Position, placement: Placement, loops: Vec<Loop>) -> Result<()> {
        self.checked_in_bounds(map, position)?;
        let result = self
            .registry
            .with_map_or_create(map, |state| state.place_many(position, placement, loops))?;
        self.settle(map, result)
    }

    /// Remove matching loops, returning how many went
    pub fn delete(&self, map: &MapId, position: Position, selector: DeleteSelector) -> Result<usize> {
        let removed = self
            .registry
            .with_map(map, |state| state.delete(position, selector))?
            .unwrap_or(0);
        self.registry.remove_if_empty(map)?;
        Ok(removed)
    }

    pub fn swap(&self, map: &MapId, position: Position, first: LoopIndex, second: LoopIndex) -> Result<bool> {
        Ok(self
            .registry
            .with_map(map, |state| state.swap(position, first, second))?
            .transpose()?
            .unwrap_or(false))
    }

    pub fn shift(&self, map: &MapId, position: Position, delay: i32) -> Result<bool> {
        Ok(self
            .registry
            .with_map(map, |state| state.shift(position, delay))?
            .transpose()?
            .unwrap_or(false))
    }

    /// Time-reverse a cell, `None` if it holds no loops
    pub fn reverse(&self, map: &MapId, position: Position) -> Result<Option<ReverseMode>> {
        let ceiling = self.max_super_period;
        Ok(self
            .registry
            .with_map(map, |state| state.reverse(position, ceiling))?
            .transpose()?
            .flatten())
    }

    /// Capture the animated cells of a region
    pub fn copy(&self, map: &MapId, region: Region) -> Result<Clipboard> {
        match self.registry.with_map(map, |state| state.copy(region))? {
            Some(clipboard) => clipboard,
            None => MapAnimation::new().copy(region),
        }
    }

    /// Copy a region, then remove its loops
    pub fn cut(&self, map: &MapId, region: Region) -> Result<Clipboard> {
        let clipboard = match self.registry.with_map(map, |state| -> Result<Clipboard> {
            let clipboard = state.copy(region)?;
            for position in state.positions_in(region) {
                state.delete(position, DeleteSelector::All);
            }
            Ok(clipboard)
        })? {
            Some(clipboard) => clipboard?,
            None => return MapAnimation::new().copy(region),
        };
        self.registry.remove_if_empty(map)?;
        Ok(clipboard)
    }

    /// Paste a clipboard with its anchor at `anchor`, starts delayed by `delay`
    pub fn paste(
        &self,
        map: &MapId,
        clipboard: &Clipboard,
        anchor: Position,
        delay: i32,
        placement: Placement,
    ) -> Result<PasteReport> {
        if clipboard.is_empty() {
            return Ok(PasteReport::default());
        }
        let world = self.world.as_ref();
        let result = self.registry.with_map_or_create(map, |state| {
            state.paste(clipboard, anchor, delay, placement, |p| world.in_bounds(map, p))
        })?;
        let report = self.settle(map, result)?;
        if report.skipped > 0 {
            log::info!("Paste on {} skipped {} cells outside the map", map, report.skipped);
        }
        Ok(report)
    }

    /// Pause or resume a map's clock
    pub fn set_running(&self, map: &MapId, running: bool) -> Result<()> {
        self.existing(map, |state| state.running = running)
    }

    /// Jump a map's clock to `tick`
    pub fn set_tick(&self, map: &MapId, tick: Tick) -> Result<()> {
        self.existing(map, |state| state.current_tick = tick)
    }

    pub fn restart(&self, map: &MapId) -> Result<()> {
        self.set_tick(map, 0)
    }

    /// Loops at a cell in index order
    pub fn info(&self, map: &MapId, position: Position) -> Result<Vec<(LoopIndex, Loop)>> {
        Ok(self
            .registry
            .with_map(map, |state| {
                state
                    .cell(position)
                    .map(|cell| cell.loops().map(|(i, l)| (i, *l)).collect())
                    .unwrap_or_default()
            })?
            .unwrap_or_default())
    }

    /// Run one command over a scope as a single all-or-nothing edit
    pub fn apply(&self, map: &MapId, scope: EditScope, command: EditCommand) -> Result<EditSummary> {
        let creates = matches!(command, EditCommand::Place { .. });
        let ceiling = self.max_super_period;
        let world = self.world.as_ref();
        let in_bounds = |p: Position| world.in_bounds(map, p);

        let edit = |state: &mut MapAnimation| -> Result<EditSummary> {
            let mut draft = state.clone();
            let before = draft.loop_count();
            let cells = run_command(&mut draft, scope, &command, ceiling, &in_bounds)?;
            let summary = EditSummary {
                cells,
                loop_delta: draft.loop_count() as i64 - before as i64,
            };
            *state = draft;
            Ok(summary)
        };

        let summary = if creates {
            if let EditScope::Cell(position) = scope {
                self.checked_in_bounds(map, position)?;
            }
            let result = self.registry.with_map_or_create(map, edit)?;
            self.settle(map, result)?
        } else {
            let summary = self.registry.with_map(map, edit)?.transpose()?.unwrap_or_default();
            self.registry.remove_if_empty(map)?;
            summary
        };

        log::debug!("{:?} on {} changed {} cells", command, map, summary.cells);
        Ok(summary)
    }

    fn existing(&self, map: &MapId, f: impl FnOnce(&mut MapAnimation)) -> Result<()> {
        self.registry
            .with_map(map, f)?
            .ok_or_else(|| AnimError::MapNotFound(map.to_string()))
    }

    fn checked_in_bounds(&self, map: &MapId, position: Position) -> Result<()> {
        if self.world.in_bounds(map, position) {
            Ok(())
        } else {
            Err(AnimError::Input(format!("{} is outside {}", position, map)))
        }
    }

    /// Drop a map created for a failed edit
    fn settle<T>(&self, map: &MapId, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.registry.remove_if_empty(map)?;
        }
        result
    }
}

fn run_command(
    state: &mut MapAnimation,
    scope: EditScope,
    command: &EditCommand,
    ceiling: u64,
    in_bounds: &dyn Fn(Position) -> bool,
) -> Result<usize> {
    let targets = match (scope, command) {
        (EditScope::Cell(position), _) => vec![position],
        (EditScope::Cuboid(region), EditCommand::Place { loops, .. }) => {
            let needed = region.volume().saturating_mul(loops.len() as u64);
            if needed > crate::domain::MAX_LOOPS_PER_MAP as u64 {
                return Err(AnimError::Capacity(format!(
                    "filling {} blocks would exceed the map loop limit",
                    region.volume()
                )));
            }
            region.positions().filter(|p| in_bounds(*p)).collect()
        }
        (EditScope::Cuboid(region), _) => state.positions_in(region),
    };

    let mut changed = 0;
    for position in targets {
        let hit = match command {
            EditCommand::Place { placement, loops } => {
                state.place_many(position, *placement, loops.clone())?;
                true
            }
            EditCommand::Delete { selector } => state.delete(position, *selector) > 0,
            EditCommand::Swap { first, second } => state.swap(position, *first, *second)?,
            EditCommand::Shift { delay } => state.shift(position, *delay)?,
            EditCommand::Reverse => state.reverse(position, ceiling)?.is_some(),
        };
        if hit {
            changed += 1;
        }
    }
    Ok(changed)
}
