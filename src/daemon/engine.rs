//! Animation engine - shared state for the host integration
//!
//! AnimationEngine owns all the components the host talks to: the registry,
//! the editor, per-viewer sends, the tick loop, storage and autosave. The
//! host forwards its map load/unload events and shutdown here.

use std::sync::Arc;

use crate::config::Config;
use crate::domain::MapId;
use crate::editor::AnimationEditor;
use crate::error::Result;
use crate::host::{BlockSink, World};
use crate::registry::AnimationRegistry;
use crate::storage::AnimationStore;
use crate::viewer::ViewerSync;

use super::autosave::{Autosave, SaveReport, persist, save_all};
use super::tick::TickScheduler;

/// Everything needed to animate a host's maps
pub struct AnimationEngine {
    registry: Arc<AnimationRegistry>,
    store: Arc<AnimationStore>,
    editor: AnimationEditor,
    viewers: ViewerSync,
    scheduler: TickScheduler,
    autosave: Autosave,
}

impl AnimationEngine {
    /// Create a stopped engine with all components wired from `config`
    pub fn new(config: &Config, world: Arc<dyn World>, sink: Arc<dyn BlockSink>) -> Self {
        let registry = Arc::new(AnimationRegistry::new());
        let store = Arc::new(AnimationStore::new(&config.storage.dir));
        let tick = config.tick_config();

        let editor = AnimationEditor::new(registry.clone(), world.clone(), config.reverse.max_super_period);
        let viewers = ViewerSync::new(
            registry.clone(),
            world.clone(),
            sink.clone(),
            tick.layer_order,
            config.viewer.marker_block,
        );
        let scheduler = TickScheduler::new(tick, registry.clone(), world, sink);
        let autosave = Autosave::new(registry.clone(), store.clone(), config.autosave_interval());

        Self {
            registry,
            store,
            editor,
            viewers,
            scheduler,
            autosave,
        }
    }

    pub fn registry(&self) -> &Arc<AnimationRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &AnimationStore {
        &self.store
    }

    pub fn editor(&self) -> &AnimationEditor {
        &self.editor
    }

    pub fn viewers(&self) -> &ViewerSync {
        &self.viewers
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Start ticking and autosaving; must run inside a tokio runtime
    pub fn start(&self) -> Result<()> {
        self.store.ensure_dir()?;
        self.scheduler.start()?;
        self.autosave.start()?;
        log::info!("Animation engine started, storing in {}", self.store.dir().display());
        Ok(())
    }

    /// Load a map's animations when the host loads the map
    ///
    /// Returns the number of loops now active. An unreadable file is logged
    /// and the map starts without animations.
    pub fn map_loaded(&self, map: &MapId) -> Result<usize> {
        let state = match self.store.load(map) {
            Ok(Some(state)) => state,
            Ok(None) => return Ok(0),
            Err(e) => {
                log::error!("Could not load animations for {}: {}", map, e);
                return Ok(0);
            }
        };
        if state.is_empty() {
            return Ok(0);
        }

        let loops = state.loop_count();
        self.registry.activate(map.clone(), state)?;
        log::info!("Loaded {} animation loops for {}", loops, map);
        Ok(loops)
    }

    /// Save and drop a map's animations when the host unloads the map
    ///
    /// If the save fails the state stays in memory for the next autosave.
    pub fn map_unloaded(&self, map: &MapId) -> Result<()> {
        persist(&self.registry, &self.store, map)?;
        self.registry.deactivate(map)?;
        Ok(())
    }

    /// Save one map now
    pub fn save(&self, map: &MapId) -> Result<usize> {
        persist(&self.registry, &self.store, map)
    }

    /// Save every active map, best effort
    pub fn save_all(&self) -> SaveReport {
        save_all(&self.registry, &self.store)
    }

    /// Stop background work, save everything and forget all maps
    pub fn shutdown(&self) -> Result<SaveReport> {
        self.autosave.stop();
        self.scheduler.stop();
        let report = self.save_all();
        if !report.failed.is_empty() {
            log::warn!("{} maps could not be saved at shutdown", report.failed.len());
        }
        self.registry.clear()?;
        log::info!("Animation engine shut down");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeleteSelector, Loop, NEVER, Placement, Position};
    use crate::host::{FlatWorld, RecordingSink};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn engine(dir: PathBuf) -> AnimationEngine {
        let mut config = Config::default();
        config.storage.dir = dir;
        AnimationEngine::new(
            &config,
            Arc::new(FlatWorld::new(64, 64, 64)),
            Arc::new(RecordingSink::new()),
        )
    }

    fn map() -> MapId {
        MapId::new("hub").unwrap()
    }

    #[test]
    fn test_map_loaded_without_file() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().to_path_buf());
        assert_eq!(engine.map_loaded(&map()).unwrap(), 0);
        assert!(!engine.registry().is_active(&map()).unwrap());
    }

    #[test]
    fn test_unload_then_load_restores() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().to_path_buf());
        engine
            .editor()
            .place(&map(), Position::new(1, 2, 3), Placement::Overwrite, Loop::new(8, 3, 1, NEVER, 9).unwrap())
            .unwrap();
        let before = engine.registry().snapshot(&map()).unwrap().unwrap();

        engine.map_unloaded(&map()).unwrap();
        assert!(!engine.registry().is_active(&map()).unwrap());
        assert!(engine.store().exists(&map()));

        assert_eq!(engine.map_loaded(&map()).unwrap(), 1);
        assert_eq!(engine.registry().snapshot(&map()).unwrap().unwrap(), before);
    }

    #[test]
    fn test_emptied_map_stays_empty_after_reload() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().to_path_buf());
        let p = Position::new(1, 2, 3);
        engine
            .editor()
            .place(&map(), p, Placement::Overwrite, Loop::forever(8, 3, 9).unwrap())
            .unwrap();
        engine.save(&map()).unwrap();

        engine.editor().delete(&map(), p, DeleteSelector::All).unwrap();
        engine.map_unloaded(&map()).unwrap();
        assert!(!engine.store().exists(&map()));
        assert_eq!(engine.map_loaded(&map()).unwrap(), 0);
    }

    #[test]
    fn test_explicit_save_of_emptied_map_removes_file() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().to_path_buf());
        let p = Position::new(1, 2, 3);
        engine
            .editor()
            .place(&map(), p, Placement::Overwrite, Loop::forever(8, 3, 9).unwrap())
            .unwrap();
        engine.save(&map()).unwrap();

        engine.editor().delete(&map(), p, DeleteSelector::All).unwrap();
        assert_eq!(engine.save(&map()).unwrap(), 0);
        assert!(!engine.store().exists(&map()));
    }

    #[test]
    fn test_unreadable_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().to_path_buf());
        std::fs::create_dir_all(engine.store().path_for(&map())).unwrap();
        assert_eq!(engine.map_loaded(&map()).unwrap(), 0);
    }

    #[test]
    fn test_failed_unload_keeps_state() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().to_path_buf());
        engine
            .editor()
            .place(&map(), Position::new(0, 0, 0), Placement::Overwrite, Loop::forever(4, 1, 2).unwrap())
            .unwrap();
        std::fs::create_dir_all(engine.store().path_for(&map()).join("blocker")).unwrap();

        assert!(engine.map_unloaded(&map()).is_err());
        assert!(engine.registry().is_active(&map()).unwrap());
    }

    #[test]
    fn test_start_requires_runtime() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().join("anims"));
        assert!(engine.start().is_err());
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path().join("anims"));
        engine.start().unwrap();
        engine.start().unwrap();
        assert!(engine.scheduler().is_running());
        assert!(temp.path().join("anims").is_dir());

        engine
            .editor()
            .place(&map(), Position::new(0, 0, 0), Placement::Overwrite, Loop::forever(4, 1, 2).unwrap())
            .unwrap();
        let report = engine.shutdown().unwrap();
        assert_eq!(report.saved, 1);
        assert!(!engine.scheduler().is_running());
        assert!(engine.registry().is_empty());
        assert!(engine.store().exists(&map()));
    }
}
