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

pub mod compare;
pub mod fetch;
pub mod inspect;
pub mod select;
pub mod status;

use crate::config::RolloutConfig;
use crate::error::{Result, RolloutError};
use crate::models::{ClientProfile, Platform, Version};
use crate::security::{self, MessageVerifier, UnsignedVerifier};
use std::fs;
use std::path::Path;

/// Reads an update document from disk, inflating it first when asked.
pub(crate) fn read_document(path: &Path, inflate: bool) -> Result<String> {
    let raw = fs::read(path)?;
    let data = if inflate {
        security::inflate(&raw)?
    } else {
        raw
    };

    UnsignedVerifier.verify(&data).ok_or_else(|| {
        RolloutError::VerificationFailed(format!("{} is not an update document", path.display()))
    })
}

/// Profile of this machine as configured, for the given client version.
pub(crate) fn configured_profile(config: &RolloutConfig, version: Version) -> ClientProfile {
    ClientProfile {
        version,
        language: config.client.language.clone(),
        pro: config.client.pro,
        style: config.client.style,
        runtime_version: None,
        platform: Platform::current(),
    }
}

/// Formats a millisecond timestamp for display.
pub(crate) fn format_timestamp(millis: i64) -> String {
    if millis <= 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
