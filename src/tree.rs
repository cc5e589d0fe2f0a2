//! The directory tree model: traversal and reconciliation.
//!
//! A [`DirTree`] binds one root directory, an exclusion set, and two tree
//! states: the state loaded from the previous run and the state computed by
//! scanning the filesystem now. Comparison classifies every path seen in
//! either state; afterwards the current state replaces the loaded one as the
//! state to persist. Only the immediately previous state is ever kept.

use crate::digest::{DigestError, digest_file};
use crate::exclude::ExcludeSet;
use crate::state_file::{StateFile, TreeEntry};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Added,
    Removed,
    /// Content digest differs from the previous run. The digest alone cannot
    /// tell a legitimate edit from bitrot; both are reported and left to the
    /// operator's judgment.
    Changed,
    Unchanged,
}

/// One path's classification after reconciling the loaded state against the
/// current scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeDelta {
    Added {
        path: String,
        entry: TreeEntry,
    },
    Removed {
        path: String,
        old: TreeEntry,
    },
    Changed {
        path: String,
        old: TreeEntry,
        new: TreeEntry,
    },
    Unchanged {
        path: String,
    },
}

impl TreeDelta {
    pub fn path(&self) -> &str {
        match self {
            TreeDelta::Added { path, .. }
            | TreeDelta::Removed { path, .. }
            | TreeDelta::Changed { path, .. }
            | TreeDelta::Unchanged { path } => path,
        }
    }

    pub fn kind(&self) -> DeltaKind {
        match self {
            TreeDelta::Added { .. } => DeltaKind::Added,
            TreeDelta::Removed { .. } => DeltaKind::Removed,
            TreeDelta::Changed { .. } => DeltaKind::Changed,
            TreeDelta::Unchanged { .. } => DeltaKind::Unchanged,
        }
    }
}

/// Directory tree model bound to one root for one run.
pub struct DirTree {
    root: PathBuf,
    excludes: ExcludeSet,
    loaded: BTreeMap<String, TreeEntry>,
    current: BTreeMap<String, TreeEntry>,
}

impl DirTree {
    /// Create a model bound to `root` (expected to be absolute). The loaded
    /// and current states start empty; an empty loaded state is what a first
    /// run looks like.
    pub fn new(root: PathBuf, excludes: ExcludeSet) -> Self {
        DirTree {
            root,
            excludes,
            loaded: BTreeMap::new(),
            current: BTreeMap::new(),
        }
    }

    /// Populate the loaded state from a previously persisted state file.
    ///
    /// State files are keyed externally by root path, but the recorded root
    /// may legitimately differ if the tree was relocated; entries are
    /// root-relative so the state stays usable.
    pub fn load_state(&mut self, state: StateFile) {
        if state.root != self.root {
            debug!(
                "State was saved for root {}, now scanning {}",
                state.root.display(),
                self.root.display()
            );
        }
        self.loaded = state.entries;
    }

    /// Walk the filesystem under the root and compute the current state.
    ///
    /// Exactly one entry is produced per readable regular file; symlinks and
    /// non-regular files are skipped. Per-file failures are logged as
    /// warnings and the file is omitted. Errors on the root itself are fatal.
    pub fn scan(&mut self) -> Result<(), ScanError> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| fatal_io(e, &self.root))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let children = read_dir_sorted(&self.root).map_err(|e| fatal_io(e, &self.root))?;

        let mut current = BTreeMap::new();
        self.walk_children(children, "", &mut current);
        self.current = current;
        Ok(())
    }

    fn walk_children(
        &self,
        children: Vec<PathBuf>,
        prefix: &str,
        out: &mut BTreeMap<String, TreeEntry>,
    ) {
        for path in children {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("Skipping {}: file name is not valid UTF-8", path.display());
                continue;
            };

            let rel_path = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", prefix, name)
            };

            if self.excludes.matches(&rel_path) {
                debug!("Pruning excluded path {}", rel_path);
                continue;
            }

            // symlink_metadata so symlinks are classified as such rather
            // than followed.
            let metadata = match std::fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Skipping {}: vanished during scan", rel_path);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", rel_path, e);
                    continue;
                }
            };

            let file_type = metadata.file_type();

            if file_type.is_symlink() {
                debug!("Skipping symlink {}", rel_path);
            } else if file_type.is_dir() {
                match read_dir_sorted(&path) {
                    Ok(sub) => self.walk_children(sub, &rel_path, out),
                    Err(e) => warn!("Skipping directory {}: {}", rel_path, e),
                }
            } else if file_type.is_file() {
                match digest_file(&path) {
                    Ok(digest) => {
                        out.insert(
                            rel_path,
                            TreeEntry {
                                sha256: digest.sha256,
                                mtime_nanos: mtime_nanos(digest.mtime),
                                size: digest.size,
                            },
                        );
                    }
                    Err(DigestError::PermissionDenied(_)) => {
                        warn!("Skipping {}: permission denied", rel_path);
                    }
                    Err(DigestError::Io(e)) => {
                        warn!("Skipping {}: {}", rel_path, e);
                    }
                }
            } else {
                // Sockets, fifos, devices: reading them would hang or
                // produce nondeterministic content.
                debug!("Skipping non-regular file {}", rel_path);
            }
        }
    }

    /// Reconcile the loaded state against the current scan.
    ///
    /// Every path present in either state is classified into exactly one of
    /// Added, Removed, Changed or Unchanged. The result is sorted by path.
    pub fn compare(&self) -> Vec<TreeDelta> {
        let mut deltas = Vec::new();

        for (path, entry) in &self.current {
            match self.loaded.get(path) {
                None => deltas.push(TreeDelta::Added {
                    path: path.clone(),
                    entry: entry.clone(),
                }),
                Some(old) if old.sha256 != entry.sha256 => deltas.push(TreeDelta::Changed {
                    path: path.clone(),
                    old: old.clone(),
                    new: entry.clone(),
                }),
                Some(_) => deltas.push(TreeDelta::Unchanged { path: path.clone() }),
            }
        }

        for (path, old) in &self.loaded {
            if !self.current.contains_key(path) {
                deltas.push(TreeDelta::Removed {
                    path: path.clone(),
                    old: old.clone(),
                });
            }
        }

        deltas.sort_by(|a, b| a.path().cmp(b.path()));
        deltas
    }

    /// Consume the model, yielding the current state as the state to persist
    /// for the next run. The loaded state is discarded.
    pub fn into_state(self) -> StateFile {
        StateFile::new(self.root, self.current)
    }

    #[cfg(test)]
    fn current_paths(&self) -> Vec<&str> {
        self.current.keys().map(String::as_str).collect()
    }
}

fn fatal_io(e: std::io::Error, path: &Path) -> ScanError {
    if e.kind() == ErrorKind::PermissionDenied {
        ScanError::PermissionDenied(path.to_path_buf())
    } else {
        ScanError::Io(e)
    }
}

/// List a directory's children as absolute paths in lexicographic order, so
/// scan logging is reproducible across runs.
fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        children.push(entry?.path());
    }
    children.sort();
    Ok(children)
}

fn mtime_nanos(mtime: std::time::SystemTime) -> u64 {
    mtime
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
