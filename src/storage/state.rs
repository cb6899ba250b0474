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

use crate::error::Result;
use crate::storage::write_atomic;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

/// Scalar settings that survive restarts. Times are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateState {
    /// Timestamp of the last accepted collection.
    pub last_update_timestamp: i64,
    /// When the last HTTP failover attempt was made.
    pub last_http_failover: i64,
    /// Content ids of payloads given up as hopeless or failed.
    pub failed_updates: BTreeSet<String>,
    /// Earliest time a new update transfer may start.
    pub next_download_time: i64,
}

pub trait StateStore: Send + Sync {
    fn load(&self) -> UpdateState;

    fn save(&self, state: &UpdateState) -> Result<()>;
}

pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> UpdateState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No update state at {:?}: {e}", self.path);
                return UpdateState::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding corrupt update state {:?}: {e}", self.path);
                UpdateState::default()
            }
        }
    }

    fn save(&self, state: &UpdateState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_state_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(temp_dir.path().join("update_state.json"));
        assert_eq!(store.load(), UpdateState::default());
    }

    #[test]
    fn test_save_and_load_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStateStore::new(temp_dir.path().join("update_state.json"));

        let mut state = UpdateState {
            last_update_timestamp: 1_000,
            last_http_failover: 2_000,
            next_download_time: 3_000,
            ..Default::default()
        };
        state.failed_updates.insert("urn:sha1:aaaa".to_string());
        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_partial_and_corrupt_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("update_state.json");
        let store = JsonStateStore::new(path.clone());

        fs::write(&path, r#"{"last_http_failover": 42}"#).unwrap();
        let state = store.load();
        assert_eq!(state.last_http_failover, 42);
        assert!(state.failed_updates.is_empty());

        fs::write(&path, "{not json").unwrap();
        assert_eq!(store.load(), UpdateState::default());
    }
}
