//! State store: persistence of tree states keyed by monitored root.
//!
//! One state file per monitored root lives under a single state directory.
//! The directory is passed in at construction; nothing here reads ambient
//! environment. Files are named by hashing the absolute root path, so the
//! mapping is a stable deterministic function of the root and nothing else.

use crate::state_file::{StateFile, StateFileError};
use crate::util::hashing::hash_path_field;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("State file error: {0}")]
    StateFile(#[from] StateFileError),
    #[error("Unable to create state directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("A non-directory exists at state directory path {0}")]
    NotADirectory(PathBuf),
}

pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: PathBuf) -> Self {
        StateStore { dir }
    }

    /// Path of the state file for `root`.
    ///
    /// Derived from a hash of the absolute root path bytes, so the same root
    /// always maps to the same file and distinct roots to distinct files.
    pub fn locate(&self, root: &Path) -> PathBuf {
        let mut hasher = Sha256::new();
        hash_path_field(&mut hasher, root);
        self.dir
            .join(format!("tree_{:x}.toml", hasher.finalize()))
    }

    /// Load the previously saved state for `root`.
    ///
    /// Returns `Ok(None)` only when no state file exists (first run). A state
    /// file that exists but cannot be decoded is an error: silently treating
    /// corrupt state as empty would discard the very history the operator
    /// needs to investigate.
    pub fn load(&self, root: &Path) -> Result<Option<StateFile>, StoreError> {
        let path = self.locate(root);

        match StateFile::load(&path) {
            Ok(state) => {
                debug!("Loaded state for {} from {}", root.display(), path.display());
                Ok(Some(state))
            }
            Err(StateFileError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                debug!("No prior state at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(StoreError::StateFile(e)),
        }
    }

    /// Save `state` as the state for `root`, creating the state directory if
    /// needed. The write is atomic; a prior state file survives a failed save.
    pub fn save(&self, root: &Path, state: &StateFile) -> Result<(), StoreError> {
        self.ensure_dir()?;

        let path = self.locate(root);
        state.save(&path)?;
        debug!("Saved state for {} to {}", root.display(), path.display());
        Ok(())
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        match std::fs::metadata(&self.dir) {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::NotADirectory(self.dir.clone())),
            Err(e) if e.kind() == ErrorKind::NotFound => std::fs::create_dir_all(&self.dir)
                .map_err(|e| StoreError::CreateDir(self.dir.clone(), e)),
            Err(e) => Err(StoreError::CreateDir(self.dir.clone(), e)),
        }
    }
}
