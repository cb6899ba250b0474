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

use crate::collection::UpdateCollection;
use crate::commands::{configured_profile, format_timestamp};
use crate::config::RolloutConfig;
use crate::error::Result;
use crate::models::Version;
use crate::security::{MessageVerifier, UnsignedVerifier};
use crate::storage::{DocumentStore, FileDocumentStore, JsonStateStore, StateStore};
use colored::*;
use comfy_table::{Table, presets::UTF8_BORDERS_ONLY};
use log::debug;
use std::path::Path;

pub struct StatusCommand<'a> {
    config: &'a RolloutConfig,
    home: &'a Path,
}

impl<'a> StatusCommand<'a> {
    pub fn new(config: &'a RolloutConfig, home: &'a Path) -> Result<Self> {
        Ok(Self { config, home })
    }

    pub fn execute(&self) -> Result<()> {
        let state = JsonStateStore::new(self.config.state_path(self.home)).load();

        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.add_row(vec!["Home".to_string(), self.home.display().to_string()]);
        table.add_row(vec!["Cached document".to_string(), self.cached_document()]);
        table.add_row(vec![
            "Last update".to_string(),
            format_timestamp(state.last_update_timestamp),
        ]);
        table.add_row(vec![
            "Last failover".to_string(),
            format_timestamp(state.last_http_failover),
        ]);
        table.add_row(vec![
            "Next download".to_string(),
            format_timestamp(state.next_download_time),
        ]);
        table.add_row(vec![
            "Failed downloads".to_string(),
            state.failed_updates.len().to_string(),
        ]);

        println!("{}", "Update status".bold());
        println!("{table}");
        for failed in &state.failed_updates {
            println!("  {} {failed}", "✗".red());
        }
        Ok(())
    }

    fn cached_document(&self) -> String {
        let store = FileDocumentStore::new(self.config.document_path(self.home));
        let Some(data) = store.load() else {
            return "none".to_string();
        };
        let Some(xml) = UnsignedVerifier.verify(&data) else {
            return "unreadable".to_string();
        };

        let profile = configured_profile(self.config, Version::zero());
        match UpdateCollection::parse(&xml, &profile) {
            Ok(collection) => format!("id {}", collection.id()),
            Err(e) => {
                debug!("Cached document is invalid: {e}");
                "invalid".to_string()
            }
        }
    }
}
