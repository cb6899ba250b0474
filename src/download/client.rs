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
use crate::user_agent;
use attohttpc::Session;
use log::debug;
use std::time::Duration;

/// Fetches a compressed, signed update document over HTTP.
pub trait FailoverClient: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AttohttpcFailoverClient {
    connect_timeout: Duration,
    read_timeout: Duration,
    user_agent: String,
}

impl AttohttpcFailoverClient {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            user_agent: user_agent::failover_client(),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }
}

impl Default for AttohttpcFailoverClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FailoverClient for AttohttpcFailoverClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut session = Session::new();
        session.proxy_settings(attohttpc::ProxySettings::from_env());

        debug!("Requesting update document from {url}");
        let response = session
            .get(url)
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .header("User-Agent", &self.user_agent)
            .header("Cache-Control", "no-cache")
            .header("Connection", "close")
            .follow_redirects(true)
            .send()?;

        if !response.is_success() {
            return Err(RolloutError::HttpStatus(response.status().as_u16()));
        }

        let body = response.bytes()?;
        if body.is_empty() {
            return Err(RolloutError::FailoverFetch(format!(
                "Empty response from {url}"
            )));
        }
        Ok(body)
    }
}
