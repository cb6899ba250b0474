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

mod parser;
pub mod url;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::models::{ClientProfile, DownloadDescriptor, UpdateCandidate};

pub use parser::parse_collection;
pub use url::decorate_url;

/// Id carried by placeholder collections that peers send when they are at
/// capacity. Never accepted as a real update.
pub const IGNORE_ID: i32 = i32::MAX;

/// An immutable, parsed update document.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCollection {
    id: i32,
    timestamp: i64,
    candidates: Vec<UpdateCandidate>,
    downloadable: Vec<DownloadDescriptor>,
}

impl UpdateCollection {
    pub fn parse(xml: &str, profile: &ClientProfile) -> Result<Self> {
        parse_collection(xml, profile)
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Milliseconds since the epoch, as published.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_ignore(&self) -> bool {
        self.id == IGNORE_ID
    }

    /// Every localized candidate, in document order.
    pub fn candidates(&self) -> &[UpdateCandidate] {
        &self.candidates
    }

    /// Resources named by any block, including blocks that failed validation.
    pub fn downloadable(&self) -> &[DownloadDescriptor] {
        &self.downloadable
    }

    /// Picks the candidate for `profile`.
    ///
    /// The first allowed candidate in the requested language wins outright.
    /// Otherwise the first allowed English candidate seen is returned.
    pub fn select_best(&self, profile: &ClientProfile) -> Option<&UpdateCandidate> {
        let mut english = None;
        for candidate in &self.candidates {
            if !candidate.is_allowed(profile) {
                continue;
            }
            if candidate.language == profile.language {
                return Some(candidate);
            }
            if english.is_none() && candidate.language == "en" {
                english = Some(candidate);
            }
        }
        english
    }
}
