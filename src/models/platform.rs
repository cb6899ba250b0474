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

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use sysinfo::System;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    Mac,
    Linux,
    /// BSDs, Solaris, AIX and friends
    Unix,
    Other,
}

impl OsFamily {
    /// Maps a `std::env::consts::OS` value or a human OS name to a family.
    pub fn from_os_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.starts_with("windows") {
            OsFamily::Windows
        } else if lower.starts_with("mac") || lower == "darwin" {
            OsFamily::Mac
        } else if lower.contains("linux") {
            OsFamily::Linux
        } else if [
            "freebsd", "openbsd", "netbsd", "dragonfly", "solaris", "sunos", "illumos", "aix",
            "hp-ux",
        ]
        .iter()
        .any(|unix| lower.starts_with(unix))
        {
            OsFamily::Unix
        } else {
            OsFamily::Other
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let family = match self {
            OsFamily::Windows => "windows",
            OsFamily::Mac => "mac",
            OsFamily::Linux => "linux",
            OsFamily::Unix => "unix",
            OsFamily::Other => "other",
        };
        write!(f, "{family}")
    }
}

/// The operating system the client runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub version: String,
    pub family: OsFamily,
}

impl Platform {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            family: OsFamily::from_os_name(name),
        }
    }

    pub fn current() -> Self {
        let consts_os = std::env::consts::OS;
        Self {
            name: System::name().unwrap_or_else(|| consts_os.to_string()),
            version: System::os_version().unwrap_or_default(),
            family: OsFamily::from_os_name(consts_os),
        }
    }
}

/// One entry of an `os` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsDescriptor {
    Any,
    Windows,
    Mac,
    Linux,
    /// Any POSIX flavour, Linux included
    Unix,
    /// Matches when none of the concrete families do
    Other,
    Named(String),
}

impl OsDescriptor {
    pub fn matches(&self, platform: &Platform) -> bool {
        match self {
            OsDescriptor::Any => true,
            OsDescriptor::Windows => platform.family == OsFamily::Windows,
            OsDescriptor::Mac => platform.family == OsFamily::Mac,
            OsDescriptor::Linux => platform.family == OsFamily::Linux,
            OsDescriptor::Unix => {
                matches!(platform.family, OsFamily::Linux | OsFamily::Unix)
            }
            OsDescriptor::Other => platform.family == OsFamily::Other,
            OsDescriptor::Named(name) => name.eq_ignore_ascii_case(platform.name.trim()),
        }
    }
}

impl FromStr for OsDescriptor {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "*" => OsDescriptor::Any,
            "windows" => OsDescriptor::Windows,
            "mac" => OsDescriptor::Mac,
            "linux" => OsDescriptor::Linux,
            "unix" => OsDescriptor::Unix,
            "other" => OsDescriptor::Other,
            _ => OsDescriptor::Named(trimmed.to_string()),
        })
    }
}

/// Comma separated list of OS descriptors. Acceptable when any entry matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsList(Vec<OsDescriptor>);

impl OsList {
    pub fn any() -> Self {
        Self(vec![OsDescriptor::Any])
    }

    pub fn descriptors(&self) -> &[OsDescriptor] {
        &self.0
    }

    pub fn is_acceptable(&self, platform: &Platform) -> bool {
        self.0.iter().any(|descriptor| descriptor.matches(platform))
    }
}

impl Default for OsList {
    fn default() -> Self {
        Self::any()
    }
}

impl FromStr for OsList {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let descriptors: Vec<OsDescriptor> = s
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .filter_map(|item| item.parse().ok())
            .collect();
        if descriptors.is_empty() {
            return Ok(Self::any());
        }
        Ok(Self(descriptors))
    }
}
