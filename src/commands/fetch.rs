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

use crate::collection::{UpdateCollection, decorate_url};
use crate::commands::configured_profile;
use crate::commands::inspect::candidate_table;
use crate::config::RolloutConfig;
use crate::download::{AttohttpcFailoverClient, FailoverClient};
use crate::error::{Result, RolloutError};
use crate::models::Version;
use crate::security::{self, MessageVerifier, UnsignedVerifier};
use crate::storage::{DocumentStore, FileDocumentStore};
use colored::*;
use log::info;
use std::path::Path;

/// Performs one failover request by hand.
pub struct FetchCommand<'a> {
    config: &'a RolloutConfig,
    home: &'a Path,
    client: Box<dyn FailoverClient>,
}

impl<'a> FetchCommand<'a> {
    pub fn new(config: &'a RolloutConfig, home: &'a Path) -> Result<Self> {
        let client = AttohttpcFailoverClient::new().with_timeouts(
            config.failover.connect_timeout(),
            config.failover.read_timeout(),
        );
        Ok(Self {
            config,
            home,
            client: Box::new(client),
        })
    }

    pub fn with_client(mut self, client: Box<dyn FailoverClient>) -> Self {
        self.client = client;
        self
    }

    pub fn execute(&self, url: Option<&str>, client_version: &str, save: bool) -> Result<()> {
        let profile = configured_profile(self.config, client_version.parse::<Version>()?);
        let url = decorate_url(
            url.unwrap_or(&self.config.failover.timeout_url),
            &profile,
        );

        let body = self.client.fetch(&url)?;
        let data = security::inflate(&body)?;
        let xml = UnsignedVerifier.verify(&data).ok_or_else(|| {
            RolloutError::VerificationFailed(format!("Response from {url} is not a document"))
        })?;
        let collection = UpdateCollection::parse(&xml, &profile)?;

        println!(
            "{} Fetched update collection {}",
            "✓".green().bold(),
            collection.id()
        );
        if !collection.candidates().is_empty() {
            println!("{}", candidate_table(collection.candidates()));
        }

        if save {
            let store = FileDocumentStore::new(self.config.document_path(self.home));
            store.persist(&data)?;
            info!("Saved update document to {}", store.path().display());
            println!("Saved to {}", store.path().display());
        }
        Ok(())
    }
}
