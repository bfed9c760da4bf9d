//! File-per-map animation store

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::codec::{decode, encode};
use crate::domain::{MapAnimation, MapId};
use crate::error::{AnimError, Result};

/// Animation files under one directory, named `<map>+animation.txt`
#[derive(Debug, Clone)]
pub struct AnimationStore {
    dir: PathBuf,
}

impl AnimationStore {
    /// Create a store rooted at `dir`; nothing is touched on disk yet
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the file path for a map
    pub fn path_for(&self, map: &MapId) -> PathBuf {
        self.dir.join(format!("{}+animation.txt", map))
    }

    /// Create the storage directory if missing
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AnimError::Persistence(format!("cannot create {}: {}", self.dir.display(), e)))
    }

    pub fn exists(&self, map: &MapId) -> bool {
        self.path_for(map).is_file()
    }

    /// Write a map's loops, returning how many were written
    ///
    /// A map without loops has its file removed instead.
    pub fn save(&self, map: &MapId, state: &MapAnimation) -> Result<usize> {
        if state.is_empty() {
            self.delete(map)?;
            return Ok(0);
        }

        self.ensure_dir()?;
        let path = self.path_for(map);
        let tmp = path.with_extension("txt.tmp");
        let write = || -> std::io::Result<()> {
            fs::write(&tmp, encode(state))?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AnimError::Persistence(format!("cannot write {}: {}", path.display(), e))
        })?;

        log::debug!("Saved {} loops for {} to {}", state.loop_count(), map, path.display());
        Ok(state.loop_count())
    }

    /// Read a map's loops, `None` when it has no file
    ///
    /// Lines that fail to parse are logged and skipped.
    pub fn load(&self, map: &MapId) -> Result<Option<MapAnimation>> {
        let path = self.path_for(map);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AnimError::Persistence(format!("cannot read {}: {}", path.display(), e)));
            }
        };

        let decoded = decode(&text)?;
        for error in &decoded.errors {
            log::warn!("Skipping {} {}", path.display(), error);
        }
        log::debug!("Loaded {} loops for {}", decoded.state.loop_count(), map);
        Ok(Some(decoded.state))
    }

    /// Maps that have a file in the directory, sorted
    pub fn list(&self) -> Result<Vec<MapId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AnimError::Persistence(format!("cannot list {}: {}", self.dir.display(), e)));
            }
        };

        let mut maps = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let map = name
                .to_str()
                .and_then(|n| n.strip_suffix("+animation.txt"))
                .and_then(|n| MapId::new(n).ok());
            maps.extend(map);
        }
        maps.sort();
        Ok(maps)
    }

    /// Remove a map's file, returning whether one existed
    pub fn delete(&self, map: &MapId) -> Result<bool> {
        let path = self.path_for(map);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AnimError::Persistence(format!("cannot delete {}: {}", path.display(), e))),
        }
    }
}
