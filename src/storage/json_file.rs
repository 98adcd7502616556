use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::storage::traits::KeyValueStorage;

/// File-backed storage: each key lives in `<dir>/<key>.json`.
///
/// Values are written to a temporary file in the same directory and then
/// renamed over the target, so a crash mid-write never leaves a torn file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                Error::Storage(format!(
                    "Failed to create data directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            tracing::debug!("No stored value for '{}' at {}", key, path.display());
            return Ok(None);
        }

        fs::read_to_string(&path).map(Some).map_err(|e| {
            Error::Storage(format!("Failed to read '{}': {}", path.display(), e))
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);

        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            Error::Storage(format!(
                "Failed to create temporary file in '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        temp_file.write_all(value.as_bytes()).map_err(|e| {
            Error::Storage(format!("Failed to write value for '{}': {}", key, e))
        })?;

        temp_file.persist(&path).map_err(|e| {
            Error::Storage(format!(
                "Failed to move value for '{}' into '{}': {}",
                key,
                path.display(),
                e
            ))
        })?;

        tracing::debug!("Stored {} bytes under '{}'", value.len(), key);
        Ok(())
    }
}
