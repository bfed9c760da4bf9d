//! Tick Loop - drives every active map's animation clock
//!
//! Once per tick, for each active map that is running:
//! - Evaluates every animated cell at the map's current tick
//! - Falls back to the terrain block when no loop is on
//! - Collects the cells whose block differs from what was last sent
//! - Hands the batch to the block sink, then advances the clock

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{MapAnimation, MapId};
use crate::error::{AnimError, Result};
use crate::evaluator::{LayerOrder, visible_at_cell};
use crate::host::{BlockChange, BlockSink, World};
use crate::registry::{AnimationRegistry, lock_map};

/// Configuration for the animation tick loop
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Interval between ticks
    pub tick_interval: Duration,
    /// Which loop wins inside a cell
    pub layer_order: LayerOrder,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            layer_order: LayerOrder::default(),
        }
    }
}

impl TickConfig {
    /// Create a tick config from a rate in ticks per second
    pub fn from_rate(ticks_per_second: u32) -> Self {
        let rate = u64::from(ticks_per_second.max(1));
        Self {
            tick_interval: Duration::from_millis((1000 / rate).max(1)),
            ..Self::default()
        }
    }

    /// Set the layer order
    pub fn with_layer_order(mut self, order: LayerOrder) -> Self {
        self.layer_order = order;
        self
    }
}

/// What happened during one tick pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Maps whose clock advanced
    pub maps_ticked: usize,
    /// Maps skipped because they were stopped or not loaded
    pub maps_skipped: usize,
    /// Maps whose evaluation failed this tick
    pub maps_failed: usize,
    /// Cells broadcast across all maps
    pub cells_changed: usize,
}

/// Cells whose visible block changed since the last broadcast
///
/// Updates each changed cell's last-sent block. Cells outside the world are
/// left alone.
pub fn frame_changes(state: &mut MapAnimation, map: &MapId, world: &dyn World, order: LayerOrder) -> Vec<BlockChange> {
    let tick = state.current_tick;
    let mut changes = Vec::new();

    for cell in state.cells.values_mut() {
        let block = match visible_at_cell(cell, tick, order) {
            Some(block) => block,
            None => match world.terrain_block(map, cell.position) {
                Some(block) => block,
                None => continue,
            },
        };

        if cell.last_sent == Some(block) {
            continue;
        }
        cell.last_sent = Some(block);
        changes.push(BlockChange {
            position: cell.position,
            block,
        });
    }
    changes
}

/// Shared state of one tick pass
#[derive(Clone)]
struct TickPass {
    registry: Arc<AnimationRegistry>,
    world: Arc<dyn World>,
    sink: Arc<dyn BlockSink>,
    order: LayerOrder,
}

enum MapOutcome {
    Ticked(usize),
    Skipped,
}

impl TickPass {
    fn run(&self) -> TickReport {
        let mut report = TickReport::default();
        let handles = match self.registry.handles() {
            Ok(handles) => handles,
            Err(e) => {
                tracing::error!(error = %e, "Could not list active maps");
                return report;
            }
        };

        for (map, handle) in handles {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let changes = {
                    let mut state = lock_map(&handle);
                    if state.retired || !state.running || !self.world.is_loaded(&map) {
                        return MapOutcome::Skipped;
                    }
                    let changes = frame_changes(&mut state, &map, self.world.as_ref(), self.order);
                    state.advance_tick();
                    changes
                };

                if !changes.is_empty() {
                    tracing::trace!(map = %map, changed = changes.len(), "Broadcasting animation frame");
                    self.sink.broadcast(&map, &changes);
                }
                MapOutcome::Ticked(changes.len())
            }));

            match outcome {
                Ok(MapOutcome::Ticked(changed)) => {
                    report.maps_ticked += 1;
                    report.cells_changed += changed;
                }
                Ok(MapOutcome::Skipped) => report.maps_skipped += 1,
                Err(_) => {
                    tracing::error!(map = %map, "Animation tick panicked, map skipped this tick");
                    report.maps_failed += 1;
                }
            }
        }
        report
    }
}

/// Fixed-rate driver for all active maps
pub struct TickScheduler {
    config: TickConfig,
    pass: TickPass,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TickScheduler {
    /// Create a stopped scheduler
    pub fn new(
        config: TickConfig,
        registry: Arc<AnimationRegistry>,
        world: Arc<dyn World>,
        sink: Arc<dyn BlockSink>,
    ) -> Self {
        let pass = TickPass {
            registry,
            world,
            sink,
            order: config.layer_order,
        };
        Self {
            config,
            pass,
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Run a single tick pass synchronously
    pub fn tick_once(&self) -> TickReport {
        self.pass.run()
    }

    /// Check if the background task is running
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Start ticking in the background on the current tokio runtime
    ///
    /// Starting an already running scheduler does nothing.
    pub fn start(&self) -> Result<()> {
        let mut task = self
            .task
            .lock()
            .map_err(|e| AnimError::Scheduler(e.to_string()))?;
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AnimError::Scheduler(format!("no tokio runtime: {}", e)))?;
        let pass = self.pass.clone();
        let period = self.config.tick_interval;

        *task = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                // passes lock maps and query the world, so they stay off the async workers
                let pass = pass.clone();
                match tokio::task::spawn_blocking(move || pass.run()).await {
                    Ok(report) if report.maps_failed > 0 => {
                        tracing::warn!(failed = report.maps_failed, "Tick pass had failing maps");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Tick pass task failed"),
                }
            }
        }));
        log::info!("Animation ticker started every {:?}", period);
        Ok(())
    }

    /// Stop the background task; safe to call when already stopped
    pub fn stop(&self) {
        let handle = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(e) => e.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
            log::info!("Animation ticker stopped");
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
