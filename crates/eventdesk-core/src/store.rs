//! Persistent store: one JSON file per record under a private directory.
//!
//! Names are used verbatim as file stems, so callers must hand in names that
//! are already safe (see `CacheKey::file_stem`). Every write goes to its own
//! temporary file and is renamed into place, so concurrent writes of one
//! name never see each other's partial output; the last rename wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No stored record named {0}")]
    NotFound(String),

    #[error("Stored record {name} could not be decoded: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record {name} could not be encoded: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on record {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid record name: {0:?}")]
    InvalidName(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    fn io(name: &str, source: std::io::Error) -> Self {
        StoreError::Io {
            name: name.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// The root is created lazily on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0'])
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if !Self::is_valid_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", name, RECORD_EXTENSION)))
    }

    pub fn save<T: Serialize + ?Sized>(&self, name: &str, record: &T) -> Result<()> {
        let path = self.path_for(name)?;
        let contents = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Encode {
            name: name.to_string(),
            source,
        })?;

        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::io(name, e))?;

        // <name>.XXXXXX.tmp, removed on drop unless persisted
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{}.", name))
            .suffix(&format!(".{}", TEMP_EXTENSION))
            .tempfile_in(&self.root)
            .map_err(|e| StoreError::io(name, e))?;
        tmp.write_all(&contents)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(name, e))?;
        tmp.persist(&path).map_err(|e| StoreError::io(name, e.error))?;

        trace!(record = name, bytes = contents.len(), "Record saved");
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path_for(name)?;
        let contents = match std::fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(StoreError::io(name, e)),
        };

        serde_json::from_slice(&contents).map_err(|source| StoreError::Decode {
            name: name.to_string(),
            source,
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Deleting a record that does not exist is not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(name, e)),
        }
    }

    /// Remove every record (and any half-written temp file) in the root.
    /// Files this store did not write are left alone.
    pub fn clear_all(&self) -> Result<usize> {
        let root_name = self.root.display().to_string();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io(&root_name, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&root_name, e))?.path();
            let managed = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == RECORD_EXTENSION || ext == TEMP_EXTENSION);
            if !managed {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path.display().to_string(), e)),
            }
        }

        debug!(root = %root_name, removed, "Cleared persisted records");
        Ok(removed)
    }
}
