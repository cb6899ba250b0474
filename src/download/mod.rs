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

//! Download subsystem contract.
//!
//! The coordinator never moves bytes itself. It asks a [`DownloadManager`]
//! to start, feed and stop transfers of update payloads, and fetches failover
//! documents through a [`FailoverClient`].

mod client;

pub use client::{AttohttpcFailoverClient, DEFAULT_TIMEOUT, FailoverClient};

use crate::error::Result;
use crate::models::{ContentId, DownloadDescriptor};
use crate::network::Peer;
use std::sync::Arc;

/// An in-progress transfer owned by the download subsystem.
pub trait Transfer: Send + Sync {
    fn content_id(&self) -> &ContentId;

    /// Milliseconds since the epoch at which the transfer was started.
    fn start_time(&self) -> i64;

    /// Number of connection attempts made so far.
    fn attempts(&self) -> u32;
}

pub type TransferHandle = Arc<dyn Transfer>;

/// A peer that can serve an update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub address: String,
    pub tls_capable: bool,
    pub content_id: ContentId,
    pub file_name: String,
    pub size: u64,
}

impl SourceDescriptor {
    pub fn for_peer(peer: &dyn Peer, descriptor: &DownloadDescriptor) -> Self {
        Self {
            address: peer.address(),
            tls_capable: peer.is_tls_capable(),
            content_id: descriptor.content_id.clone(),
            file_name: descriptor.file_name.clone(),
            size: descriptor.size,
        }
    }
}

pub trait DownloadManager: Send + Sync {
    /// Whether saved transfers have been restored and new ones may start.
    fn is_ready(&self) -> bool;

    fn find_transfer(&self, id: &ContentId) -> Option<TransferHandle>;

    fn start_transfer(
        &self,
        descriptor: &DownloadDescriptor,
        start_time: i64,
    ) -> Result<TransferHandle>;

    fn add_source(&self, transfer: &TransferHandle, source: SourceDescriptor);

    fn stop_transfer(&self, transfer: &TransferHandle);

    /// Whether any update transfer is currently running.
    fn has_active_update_transfer(&self) -> bool;

    /// Stops every update transfer whose content is not in `keep`.
    fn kill_transfers_not_listed(&self, keep: &[ContentId]);
}
