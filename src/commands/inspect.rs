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
use crate::commands::{configured_profile, format_timestamp, read_document};
use crate::config::RolloutConfig;
use crate::error::Result;
use crate::models::{UpdateCandidate, Version};
use colored::*;
use comfy_table::{Cell, Table, presets::UTF8_BORDERS_ONLY};
use log::debug;
use std::path::Path;

pub struct InspectCommand<'a> {
    config: &'a RolloutConfig,
}

impl<'a> InspectCommand<'a> {
    pub fn new(config: &'a RolloutConfig) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn execute(&self, file: &Path, inflate: bool) -> Result<()> {
        let xml = read_document(file, inflate)?;
        let profile = configured_profile(self.config, Version::zero());
        let collection = UpdateCollection::parse(&xml, &profile)?;
        debug!("Inspecting {}", file.display());

        println!(
            "{} {} (published {})",
            "Update collection".bold(),
            collection.id(),
            format_timestamp(collection.timestamp())
        );
        if collection.is_ignore() {
            println!("{} placeholder collection, never accepted", "!".yellow().bold());
            return Ok(());
        }

        if collection.candidates().is_empty() {
            println!("No update entries");
        } else {
            println!("{}", candidate_table(collection.candidates()));
        }

        if !collection.downloadable().is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec![
                Cell::new("Content id"),
                Cell::new("File"),
                Cell::new("Size"),
            ]);
            for descriptor in collection.downloadable() {
                table.add_row(vec![
                    Cell::new(descriptor.content_id.as_str()),
                    Cell::new(&descriptor.file_name),
                    Cell::new(descriptor.size),
                ]);
            }
            println!();
            println!("{}", "Downloadable resources".bold());
            println!("{table}");
        }

        Ok(())
    }
}

pub(crate) fn candidate_table(candidates: &[UpdateCandidate]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        Cell::new("Lang"),
        Cell::new("For"),
        Cell::new("From"),
        Cell::new("To"),
        Cell::new("Style"),
        Cell::new("Edition"),
        Cell::new("Download"),
    ]);

    for candidate in candidates {
        let edition = match (candidate.pro, candidate.free) {
            (true, true) => "any",
            (true, false) => "pro",
            (false, true) => "free",
            (false, false) => "none",
        };
        table.add_row(vec![
            Cell::new(&candidate.language),
            Cell::new(&candidate.for_version),
            Cell::new(&candidate.from_version),
            Cell::new(&candidate.to_version),
            Cell::new(candidate.style),
            Cell::new(edition),
            Cell::new(candidate.update_file_name().unwrap_or("-")),
        ]);
    }
    table
}
