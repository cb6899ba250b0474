use crate::error::{Result, RolloutError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How urgent an update is. Ordered: beta < minor < major < critical < force.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStyle {
    Beta,
    #[default]
    Minor,
    Major,
    Critical,
    Force,
}

impl UpdateStyle {
    pub fn level(self) -> u8 {
        match self {
            UpdateStyle::Beta => 0,
            UpdateStyle::Minor => 1,
            UpdateStyle::Major => 2,
            UpdateStyle::Critical => 3,
            UpdateStyle::Force => 4,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(UpdateStyle::Beta),
            1 => Some(UpdateStyle::Minor),
            2 => Some(UpdateStyle::Major),
            3 => Some(UpdateStyle::Critical),
            4 => Some(UpdateStyle::Force),
            _ => None,
        }
    }

    /// Requested ceilings above major are clamped to major.
    pub fn capped(self) -> Self {
        self.min(UpdateStyle::Major)
    }
}

impl FromStr for UpdateStyle {
    type Err = RolloutError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(level) = trimmed.parse::<i64>() {
            return UpdateStyle::from_level(level)
                .ok_or_else(|| RolloutError::InvalidConfig(format!("Unknown update style: {s}")));
        }

        match trimmed.to_lowercase().as_str() {
            "beta" => Ok(UpdateStyle::Beta),
            "minor" => Ok(UpdateStyle::Minor),
            "major" => Ok(UpdateStyle::Major),
            "critical" => Ok(UpdateStyle::Critical),
            "force" => Ok(UpdateStyle::Force),
            _ => Err(RolloutError::InvalidConfig(format!(
                "Unknown update style: {s}"
            ))),
        }
    }
}

impl std::fmt::Display for UpdateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let style = match self {
            UpdateStyle::Beta => "beta",
            UpdateStyle::Minor => "minor",
            UpdateStyle::Major => "major",
            UpdateStyle::Critical => "critical",
            UpdateStyle::Force => "force",
        };
        write!(f, "{style}")
    }
}
