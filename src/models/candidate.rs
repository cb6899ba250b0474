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
use crate::models::platform::{OsList, Platform};
use crate::models::style::UpdateStyle;
use crate::models::version::Version;
use data_encoding::BASE32;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Content identifier of a downloadable resource, in URN form
/// (`urn:sha1:...`). Compared case-insensitively. SHA-1 URNs are kept as
/// lowercase hex whether they arrive in base32 or hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a `urn:sha1:` identifier from a hex digest.
    pub fn sha1_hex(digest: &str) -> Self {
        Self(format!("urn:sha1:{}", digest.to_lowercase()))
    }
}

impl FromStr for ContentId {
    type Err = RolloutError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        let mut parts = normalized.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("urn"), Some("sha1"), Some(nss)) if !nss.is_empty() => match sha1_digest(nss) {
                Some(digest) => Ok(Self::sha1_hex(&digest)),
                None => Ok(Self(normalized)),
            },
            (Some("urn"), Some(nid), Some(nss)) if !nid.is_empty() && !nss.is_empty() => {
                Ok(Self(normalized))
            }
            _ => Err(RolloutError::InvalidDocument(format!(
                "Not a content identifier: {s}"
            ))),
        }
    }
}

/// Hex digest of a 40-digit hex or 32-character base32 SHA-1.
fn sha1_digest(nss: &str) -> Option<String> {
    match nss.len() {
        40 if nss.bytes().all(|b| b.is_ascii_hexdigit()) => Some(nss.to_string()),
        32 => BASE32
            .decode(nss.to_ascii_uppercase().as_bytes())
            .ok()
            .filter(|bytes| bytes.len() == 20)
            .map(hex::encode),
        _ => None,
    }
}

impl TryFrom<String> for ContentId {
    type Error = RolloutError;

    fn try_from(value: String) -> Result<Self> {
        ContentId::from_str(&value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the download subsystem needs to fetch an update payload.
/// Only ever constructed complete: identifier, file name and a non-zero size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDescriptor {
    pub content_id: ContentId,
    pub file_name: String,
    pub size: u64,
    pub root_hash: Option<String>,
}

impl DownloadDescriptor {
    pub fn new(content_id: ContentId, file_name: &str, size: u64) -> Option<Self> {
        let file_name = file_name.trim();
        if file_name.is_empty() || size == 0 {
            return None;
        }
        Some(Self {
            content_id,
            file_name: file_name.to_string(),
            size,
            root_hash: None,
        })
    }

    pub fn with_root_hash(mut self, root_hash: Option<String>) -> Self {
        self.root_hash = root_hash.filter(|hash| !hash.trim().is_empty());
        self
    }
}

/// The environment a candidate is matched against.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub version: Version,
    pub language: String,
    pub pro: bool,
    pub style: UpdateStyle,
    pub runtime_version: Option<Version>,
    pub platform: Platform,
}

/// One localized rollout entry of an update collection.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCandidate {
    pub from_version: Version,
    pub to_version: Version,
    pub for_version: Version,
    pub runtime_from: Option<Version>,
    pub runtime_to: Option<Version>,
    pub os_list: OsList,
    pub pro: bool,
    pub free: bool,
    pub style: UpdateStyle,

    pub language: String,
    pub update_text: String,
    pub update_title: Option<String>,
    pub button1_text: Option<String>,
    pub button2_text: Option<String>,
    pub update_url: String,
    pub update_command: Option<String>,
    pub download: Option<DownloadDescriptor>,
}

impl UpdateCandidate {
    pub fn is_downloadable(&self) -> bool {
        self.download.is_some()
    }

    pub fn content_id(&self) -> Option<&ContentId> {
        self.download.as_ref().map(|d| &d.content_id)
    }

    pub fn update_file_name(&self) -> Option<&str> {
        self.download.as_ref().map(|d| d.file_name.as_str())
    }

    /// Whether this entry targets the given client, ignoring language.
    pub fn is_allowed(&self, profile: &ClientProfile) -> bool {
        profile.version >= self.from_version
            && profile.version < self.to_version
            && self.style <= profile.style
            && self.os_list.is_acceptable(&profile.platform)
            && self.runtime_allows(profile.runtime_version.as_ref())
            && if profile.pro { self.pro } else { self.free }
    }

    fn runtime_allows(&self, runtime: Option<&Version>) -> bool {
        let Some(runtime) = runtime else {
            return true;
        };
        if let Some(from) = &self.runtime_from {
            if runtime < from {
                return false;
            }
        }
        if let Some(to) = &self.runtime_to {
            if runtime > to {
                return false;
            }
        }
        true
    }

    /// Copy of this candidate with its install command replaced.
    pub fn with_command(&self, command: Option<String>) -> Self {
        Self {
            update_command: command,
            ..self.clone()
        }
    }

    /// Expands `$` to the update directory (with a trailing separator) and
    /// `%` to the update file name.
    pub fn prepared_command(&self, update_dir: &Path) -> Option<String> {
        let command = self.update_command.as_ref()?;
        let file_name = self.update_file_name().unwrap_or_default();
        let mut dir = update_dir.display().to_string();
        if !dir.ends_with(std::path::MAIN_SEPARATOR) {
            dir.push(std::path::MAIN_SEPARATOR);
        }
        Some(command.replace('$', &dir).replace('%', file_name))
    }
}
