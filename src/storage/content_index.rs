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

use crate::error::{Result, RolloutError};
use crate::models::ContentId;
use crate::platform;
use crate::security;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

/// What content is already complete on local disk.
pub trait ContentIndex: Send + Sync {
    /// Whether the index finished its initial scan.
    fn is_ready(&self) -> bool;

    fn has_complete(&self, id: &ContentId) -> bool;

    /// Files in the update download area with their content ids.
    fn update_area_files(&self) -> Vec<(ContentId, PathBuf)>;

    fn remove(&self, path: &Path) -> Result<()>;
}

/// Indexes the files of the update directory by SHA-1.
pub struct FsContentIndex {
    update_dir: PathBuf,
    entries: RwLock<HashMap<ContentId, PathBuf>>,
    ready: AtomicBool,
}

impl FsContentIndex {
    pub fn new(update_dir: PathBuf) -> Self {
        Self {
            update_dir,
            entries: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn update_dir(&self) -> &Path {
        &self.update_dir
    }

    /// Hashes every file of the update directory. Marks the index ready.
    pub fn scan(&self) -> Result<usize> {
        let mut entries = HashMap::new();

        if self.update_dir.exists() {
            for entry in WalkDir::new(&self.update_dir).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| {
                    RolloutError::Io(std::io::Error::other(format!(
                        "Failed to scan {:?}: {e}",
                        self.update_dir
                    )))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    continue;
                }
                match security::calculate_sha1(&path) {
                    Ok(digest) => {
                        entries.insert(ContentId::sha1_hex(&digest), path);
                    }
                    Err(e) => warn!("Failed to hash {path:?}: {e}"),
                }
            }
        }

        let count = entries.len();
        *self.entries.write() = entries;
        self.ready.store(true, Ordering::SeqCst);
        info!("Indexed {count} files in {:?}", self.update_dir);
        Ok(count)
    }

    /// Adds a single completed file.
    pub fn add(&self, path: &Path) -> Result<ContentId> {
        let id = ContentId::sha1_hex(&security::calculate_sha1(path)?);
        self.entries.write().insert(id.clone(), path.to_path_buf());
        Ok(id)
    }
}

impl ContentIndex for FsContentIndex {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn has_complete(&self, id: &ContentId) -> bool {
        self.entries
            .read()
            .get(id)
            .is_some_and(|path| path.is_file())
    }

    fn update_area_files(&self) -> Vec<(ContentId, PathBuf)> {
        let mut files: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(id, path)| (id.clone(), path.clone()))
            .collect();
        files.sort();
        files
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if !security::is_within(&self.update_dir, path) {
            return Err(RolloutError::InvalidConfig(format!(
                "Refusing to delete {path:?} outside {:?}",
                self.update_dir
            )));
        }

        platform::file_ops::remove_file(path)?;
        self.entries.write().retain(|_, p| p != path);
        debug!("Removed obsolete update file {path:?}");
        Ok(())
    }
}
