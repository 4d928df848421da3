//! Output of the rendered image.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::Error;

/// Destination for rendered artifacts.
pub trait ArtifactSink: Send + Sync {
    /// Write the artifact for `key`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be written.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, Error>;

    /// Read back the artifact for `key`, `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing artifact cannot be read.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
}

/// Writes `<dir>/<key>.svg`.
#[derive(Debug, Clone)]
pub struct FileArtifactSink {
    dir: PathBuf,
}

impl FileArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.svg"))
    }
}

impl ArtifactSink for FileArtifactSink {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, Error> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        fs::write(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "wrote contributor image");
        Ok(path)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryArtifactSink {
    artifacts: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl ArtifactSink for MemoryArtifactSink {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, Error> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), bytes.to_vec());
        Ok(PathBuf::from(format!("memory://{key}.svg")))
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.get(key))
    }
}
