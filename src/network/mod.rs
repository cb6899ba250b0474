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

//! Peer layer contract.

use std::sync::Arc;

/// A connected peer.
pub trait Peer: Send + Sync {
    fn address(&self) -> String;

    fn is_tls_capable(&self) -> bool;

    /// The update id the peer last advertised, 0 if none.
    fn advertised_update_id(&self) -> i32;
}

pub type PeerHandle = Arc<dyn Peer>;

pub trait PeerNetwork: Send + Sync {
    /// Tells every peer our capabilities (including the update id) changed.
    fn broadcast_capability_changed(&self);

    fn connected_peers(&self) -> Vec<PeerHandle>;

    fn is_connected(&self) -> bool;
}

/// Tracks how trustworthy the data sent over the network is.
pub trait NetworkHealth: Send + Sync {
    fn on_invalid_response(&self, source: &str);

    fn on_valid_response(&self, source: &str);
}

/// Label for a data source in logs and health reports.
pub fn source_label(peer: Option<&PeerHandle>) -> String {
    peer.map(|p| p.address())
        .unwrap_or_else(|| "unknown".to_string())
}
