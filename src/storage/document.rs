use crate::error::Result;
use crate::storage::write_atomic;
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Durable cache of the last accepted raw update document.
pub trait DocumentStore: Send + Sync {
    fn load(&self) -> Option<Vec<u8>>;

    /// A document shipped with the installation, used when nothing newer is
    /// cached.
    fn load_bundled(&self) -> Option<Vec<u8>> {
        None
    }

    fn persist(&self, data: &[u8]) -> Result<()>;
}

pub struct FileDocumentStore {
    path: PathBuf,
    bundled: Option<PathBuf>,
}

impl FileDocumentStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            bundled: None,
        }
    }

    pub fn with_bundled(mut self, bundled: Option<PathBuf>) -> Self {
        self.bundled = bundled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(data) if data.is_empty() => {
            debug!("Ignoring empty update document at {path:?}");
            None
        }
        Ok(data) => Some(data),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No update document at {path:?}");
            None
        }
        Err(e) => {
            warn!("Failed to read update document {path:?}: {e}");
            None
        }
    }
}

impl DocumentStore for FileDocumentStore {
    fn load(&self) -> Option<Vec<u8>> {
        read_optional(&self.path)
    }

    fn load_bundled(&self) -> Option<Vec<u8>> {
        self.bundled.as_deref().and_then(read_optional)
    }

    fn persist(&self, data: &[u8]) -> Result<()> {
        write_atomic(&self.path, data)?;
        debug!("Saved update document to {:?}", self.path);
        Ok(())
    }
}
