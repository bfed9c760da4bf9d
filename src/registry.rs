//! Animation registry - owns every map's animation state
//!
//! The registry maps a map id to its state behind a per-map `Mutex`. The outer
//! `RwLock` is only held long enough to look up, insert or remove an entry, so
//! work on different maps never contends. A map removed from the registry is
//! marked retired under its own lock; callers that raced with the removal see
//! the flag and look the map up again instead of editing a discarded state.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::domain::{MapAnimation, MapId};
use crate::error::{AnimError, Result};

/// Shared handle to one map's state
pub type MapHandle = Arc<Mutex<MapAnimation>>;

/// Registry of active (ticked) maps
#[derive(Debug, Default)]
pub struct AnimationRegistry {
    maps: RwLock<HashMap<MapId, MapHandle>>,
    /// Maps deactivated for running out of loops, whose files are stale
    emptied: Mutex<BTreeSet<MapId>>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> AnimError {
    AnimError::Scheduler(format!("registry lock poisoned: {}", e))
}

/// Lock a map, recovering the state if a previous holder panicked
pub(crate) fn lock_map(handle: &MapHandle) -> MutexGuard<'_, MapAnimation> {
    handle.lock().unwrap_or_else(|e| {
        log::error!("Map lock poisoned, continuing with last state");
        e.into_inner()
    })
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a map is being ticked
    pub fn is_active(&self, map: &MapId) -> Result<bool> {
        Ok(self.maps.read().map_err(poisoned)?.contains_key(map))
    }

    /// Register a map with the given state, replacing any previous state
    pub fn activate(&self, map: MapId, state: MapAnimation) -> Result<()> {
        let previous = self
            .maps
            .write()
            .map_err(poisoned)?
            .insert(map.clone(), Arc::new(Mutex::new(state)));
        if let Some(previous) = previous {
            lock_map(&previous).retired = true;
        }
        log::debug!("Activated animations for {}", map);
        Ok(())
    }

    /// Stop ticking a map and drop its in-memory state
    pub fn deactivate(&self, map: &MapId) -> Result<bool> {
        let removed = self.maps.write().map_err(poisoned)?.remove(map);
        match removed {
            Some(handle) => {
                lock_map(&handle).retired = true;
                log::debug!("Deactivated animations for {}", map);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deactivate a map if it holds no loops
    pub fn remove_if_empty(&self, map: &MapId) -> Result<bool> {
        let mut maps = self.maps.write().map_err(poisoned)?;
        let Some(handle) = maps.get(map).cloned() else {
            return Ok(false);
        };

        let mut state = lock_map(&handle);
        if state.loop_count() > 0 {
            return Ok(false);
        }
        state.retired = true;
        maps.remove(map);
        self.emptied.lock().map_err(poisoned)?.insert(map.clone());
        log::info!("No animations left on {}, deactivated", map);
        Ok(true)
    }

    /// Drain the maps deactivated by `remove_if_empty` that are still inactive
    pub fn take_emptied(&self) -> Result<Vec<MapId>> {
        let maps = self.maps.read().map_err(poisoned)?;
        let mut emptied = self.emptied.lock().map_err(poisoned)?;
        let drained = std::mem::take(&mut *emptied);
        Ok(drained.into_iter().filter(|m| !maps.contains_key(m)).collect())
    }

    /// Claim one emptied map, true if it was pending and is still inactive
    pub fn take_if_emptied(&self, map: &MapId) -> Result<bool> {
        let maps = self.maps.read().map_err(poisoned)?;
        let pending = self.emptied.lock().map_err(poisoned)?.remove(map);
        Ok(pending && !maps.contains_key(map))
    }

    /// Queue a map's stale file for removal again after a failed delete
    pub fn mark_emptied(&self, map: &MapId) -> Result<()> {
        self.emptied.lock().map_err(poisoned)?.insert(map.clone());
        Ok(())
    }

    /// Run `f` on a map's state if the map is active
    pub fn with_map<R>(&self, map: &MapId, f: impl FnOnce(&mut MapAnimation) -> R) -> Result<Option<R>> {
        loop {
            let Some(handle) = self.handle(map)? else {
                return Ok(None);
            };
            let mut state = lock_map(&handle);
            if state.retired {
                continue;
            }
            return Ok(Some(f(&mut state)));
        }
    }

    /// Run `f` on a map's state, creating an empty running state first if needed
    pub fn with_map_or_create<R>(&self, map: &MapId, f: impl FnOnce(&mut MapAnimation) -> R) -> Result<R> {
        loop {
            let handle = self.handle_or_create(map)?;
            let mut state = lock_map(&handle);
            if state.retired {
                continue;
            }
            return Ok(f(&mut state));
        }
    }

    /// Copy of a map's current state
    pub fn snapshot(&self, map: &MapId) -> Result<Option<MapAnimation>> {
        self.with_map(map, |state| state.clone())
    }

    /// Ids of every active map
    pub fn active_maps(&self) -> Result<Vec<MapId>> {
        let mut ids: Vec<MapId> = self.maps.read().map_err(poisoned)?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Handles of every active map, for the tick pass
    pub(crate) fn handles(&self) -> Result<Vec<(MapId, MapHandle)>> {
        let maps = self.maps.read().map_err(poisoned)?;
        Ok(maps.iter().map(|(id, h)| (id.clone(), h.clone())).collect())
    }

    /// Drop every map
    pub fn clear(&self) -> Result<()> {
        let drained: Vec<MapHandle> = self.maps.write().map_err(poisoned)?.drain().map(|(_, h)| h).collect();
        for handle in drained {
            lock_map(&handle).retired = true;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.maps.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle(&self, map: &MapId) -> Result<Option<MapHandle>> {
        Ok(self.maps.read().map_err(poisoned)?.get(map).cloned())
    }

    fn handle_or_create(&self, map: &MapId) -> Result<MapHandle> {
        if let Some(handle) = self.handle(map)? {
            return Ok(handle);
        }
        let mut maps = self.maps.write().map_err(poisoned)?;
        let handle = maps.entry(map.clone()).or_insert_with(|| {
            log::info!("Created animation state for {}", map);
            Arc::new(Mutex::new(MapAnimation::new()))
        });
        Ok(handle.clone())
    }
}
