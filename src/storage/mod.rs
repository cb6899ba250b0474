// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Durable state of the update subsystem.

mod content_index;
mod document;
mod state;

pub use content_index::{ContentIndex, FsContentIndex};
pub use document::{DocumentStore, FileDocumentStore};
pub use state::{JsonStateStore, StateStore, UpdateState};

use crate::error::{Result, RolloutError};
use crate::platform;
use std::fs;
use std::path::Path;

/// Writes `data` next to `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RolloutError::ConfigError(format!("Failed to create directory {parent:?}: {e}"))
        })?;
    }

    let temp_path = path.with_extension("tmp");

    // Leftover from an interrupted write
    if temp_path.exists() {
        fs::remove_file(&temp_path)?;
    }

    fs::write(&temp_path, data)?;
    platform::file_ops::atomic_rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("version.xml");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_write_atomic_replaces_stale_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        fs::write(path.with_extension("tmp"), b"garbage").unwrap();

        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }
}
