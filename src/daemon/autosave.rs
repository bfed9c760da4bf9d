//! Periodic best-effort save of every active map

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::MapId;
use crate::error::{AnimError, Result};
use crate::registry::AnimationRegistry;
use crate::storage::AnimationStore;

/// Outcome of saving several maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Maps written to disk
    pub saved: usize,
    /// Files removed for maps that ran out of loops
    pub removed: usize,
    /// Maps whose save failed
    pub failed: Vec<MapId>,
}

/// Persist one map, returning the loops written
///
/// A map that lost its last loop has its file removed. Other inactive maps
/// are left alone since their files are already current.
pub fn persist(registry: &AnimationRegistry, store: &AnimationStore, map: &MapId) -> Result<usize> {
    if let Some(state) = registry.snapshot(map)? {
        return store.save(map, &state);
    }
    if registry.take_if_emptied(map)? {
        remove_emptied(registry, store, map)?;
    }
    Ok(0)
}

/// Delete an emptied map's file, queueing it again if the delete fails
fn remove_emptied(registry: &AnimationRegistry, store: &AnimationStore, map: &MapId) -> Result<bool> {
    store.delete(map).inspect_err(|_| {
        if let Err(e) = registry.mark_emptied(map) {
            log::error!("Could not requeue {} for removal: {}", map, e);
        }
    })
}

/// Save every active map and clean up files of emptied ones
///
/// Failures are logged per map and do not stop the rest.
pub fn save_all(registry: &AnimationRegistry, store: &AnimationStore) -> SaveReport {
    let mut report = SaveReport::default();

    match registry.take_emptied() {
        Ok(emptied) => {
            for map in emptied {
                match remove_emptied(registry, store, &map) {
                    Ok(true) => report.removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        log::error!("Failed to remove animations of {}: {}", map, e);
                        report.failed.push(map);
                    }
                }
            }
        }
        Err(e) => log::error!("Could not list emptied maps: {}", e),
    }

    let maps = match registry.active_maps() {
        Ok(maps) => maps,
        Err(e) => {
            log::error!("Could not list active maps: {}", e);
            return report;
        }
    };

    for map in maps {
        match persist(registry, store, &map) {
            Ok(_) => report.saved += 1,
            Err(e) => {
                log::error!("Failed to save animations of {}: {}", map, e);
                report.failed.push(map);
            }
        }
    }
    report
}

/// Background task running `save_all` on a fixed interval
pub struct Autosave {
    registry: Arc<AnimationRegistry>,
    store: Arc<AnimationStore>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Autosave {
    pub fn new(registry: Arc<AnimationRegistry>, store: Arc<AnimationStore>, interval: Duration) -> Self {
        Self {
            registry,
            store,
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Start saving in the background; does nothing if already started
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
        let registry = self.registry.clone();
        let store = self.store.clone();
        let period = self.interval;

        *task = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let registry = registry.clone();
                let store = store.clone();
                match tokio::task::spawn_blocking(move || save_all(&registry, &store)).await {
                    Ok(report) => log::debug!(
                        "Autosave wrote {} maps, removed {}, {} failed",
                        report.saved,
                        report.removed,
                        report.failed.len()
                    ),
                    Err(e) => log::error!("Autosave task failed: {}", e),
                }
            }
        }));
        log::info!("Autosave started every {:?}", period);
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
            log::info!("Autosave stopped");
        }
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.stop();
    }
}
