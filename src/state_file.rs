use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StateFileError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Unsupported state file version: {0}")]
    UnsupportedVersion(u32),
}

/// One file's recorded state: content digest plus metadata hints.
///
/// The path is the key in [`StateFile::entries`], not part of the entry.
/// `mtime_nanos` and `size` are captured at scan time and are informational
/// only; comparison is decided by the digest alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeEntry {
    /// Hex encoded SHA-256 of the file content.
    pub sha256: String,
    /// Modification time in nanoseconds since Unix epoch.
    /// Modern filesystems (ext4, APFS, etc.) support nanosecond precision.
    pub mtime_nanos: u64,
    /// File size in bytes.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Metadata {
    version: u32,
}

/// Helper struct to extract only the metadata section from a TOML file,
/// ignoring all other content. Used to check version before parsing the full file.
/// Note: We explicitly do NOT use deny_unknown_fields here, as this struct's
/// purpose is to ignore everything except metadata.
#[derive(Debug, Deserialize)]
struct MetadataOnly {
    metadata: Metadata,
}

/// Persisted tree state for one monitored root.
///
/// Encodes the absolute root the state was computed for plus one entry per
/// regular file, keyed by normalized root-relative path. The root binding is
/// informational; lookup is keyed externally by a hash of the root path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateFile {
    // Field order matters for TOML output: top-level values must be
    // emitted before tables.
    /// Absolute root path at the time the state was saved.
    pub root: PathBuf,
    metadata: Metadata,
    pub entries: BTreeMap<String, TreeEntry>,
}

impl StateFile {
    const SUPPORTED_VERSION: u32 = 1;

    /// Create a new StateFile with the current supported version
    pub fn new(root: PathBuf, entries: BTreeMap<String, TreeEntry>) -> Self {
        StateFile {
            root,
            metadata: Metadata {
                version: Self::SUPPORTED_VERSION,
            },
            entries,
        }
    }

    /// Parse a TOML string into a StateFile structure
    pub fn from_toml(content: &str) -> Result<Self, StateFileError> {
        // First, extract only the metadata to check version. Otherwise
        // we would fail on unexpected *other* input (which could just be
        // due to a future version), without being able to provide a sensible
        // explanation.
        let metadata_only: MetadataOnly = toml::from_str(content)?;

        if metadata_only.metadata.version != Self::SUPPORTED_VERSION {
            return Err(StateFileError::UnsupportedVersion(
                metadata_only.metadata.version,
            ));
        }

        // Version is supported, now parse the full file
        let state_file: StateFile = toml::from_str(content)?;
        Ok(state_file)
    }

    /// Serialize a StateFile structure to TOML string
    pub fn to_toml(&self) -> Result<String, StateFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a StateFile from the filesystem
    pub fn load(path: &Path) -> Result<Self, StateFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                StateFileError::PermissionDenied(path.to_path_buf())
            } else {
                StateFileError::Io(e)
            }
        })?;

        Self::from_toml(&content)
    }

    /// Save a StateFile to the filesystem atomically.
    ///
    /// Writes to a temporary file, fsyncs it, then atomically renames it into
    /// place. A failed save leaves any previous state file untouched.
    pub fn save(&self, path: &Path) -> Result<(), StateFileError> {
        use std::io::Write;

        let content = self.to_toml()?;

        let parent = path.parent().unwrap_or(Path::new("."));

        let mut temp_file = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                StateFileError::PermissionDenied(parent.to_path_buf())
            } else {
                StateFileError::Io(e)
            }
        })?;

        temp_file.write_all(content.as_bytes()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                StateFileError::PermissionDenied(path.to_path_buf())
            } else {
                StateFileError::Io(e)
            }
        })?;

        temp_file.as_file().sync_all().map_err(StateFileError::Io)?;

        temp_file.persist(path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::PermissionDenied {
                StateFileError::PermissionDenied(path.to_path_buf())
            } else {
                StateFileError::Io(e.error)
            }
        })?;

        Ok(())
    }
}
