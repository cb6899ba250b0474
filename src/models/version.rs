use crate::error::{Result, RolloutError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A dotted client or runtime version: `major.minor.service[<sep>revision]`.
///
/// Equality is defined as "comparison yields `Ordering::Equal`". The original
/// spelling is kept for display only, so `"1.2.3"` and `"1.2.3_0"` are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u32,
    minor: u32,
    service: u32,
    revision: u32,
    raw: String,
}

impl Version {
    pub fn new(major: u32, minor: u32, service: u32) -> Self {
        Self {
            major,
            minor,
            service,
            revision: 0,
            raw: format!("{major}.{minor}.{service}"),
        }
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self.raw = format!(
            "{}.{}.{}_{}",
            self.major, self.minor, self.service, revision
        );
        self
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn service(&self) -> u32 {
        self.service
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// The lowest possible version, used as the default lower bound of a range.
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    fn key(&self) -> (u32, u32, u32, u32) {
        (self.major, self.minor, self.service, self.revision)
    }
}

impl FromStr for Version {
    type Err = RolloutError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RolloutError::InvalidVersionFormat(s.to_string());
        let trimmed = s.trim();

        let mut segments = trimmed.splitn(3, '.');
        let major = parse_segment(segments.next()).ok_or_else(invalid)?;
        let minor = parse_segment(segments.next()).ok_or_else(invalid)?;
        let rest = segments.next().ok_or_else(invalid)?;

        let service_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if service_len == 0 {
            return Err(invalid());
        }
        let service = rest[..service_len].parse::<u32>().map_err(|_| invalid())?;

        // Exactly one separator character is skipped before the revision run.
        // Anything unparsable there leaves the revision at zero.
        let tail = &rest[service_len..];
        let revision = tail
            .chars()
            .next()
            .map(|sep| &tail[sep.len_utf8()..])
            .map(|after| {
                let digits = after.bytes().take_while(u8::is_ascii_digit).count();
                after[..digits].parse::<u32>().unwrap_or(0)
            })
            .unwrap_or(0);

        Ok(Self {
            major,
            minor,
            service,
            revision,
            raw: trimmed.to_string(),
        })
    }
}

fn parse_segment(segment: Option<&str>) -> Option<u32> {
    segment.and_then(|s| s.parse::<u32>().ok())
}

impl TryFrom<String> for Version {
    type Error = RolloutError;

    fn try_from(value: String) -> Result<Self> {
        Version::from_str(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.raw
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::from_str(s).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(v("1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("5.2.8"), Version::new(5, 2, 8));
        assert_eq!(v("1.6.0_10"), Version::new(1, 6, 0).with_revision(10));
        assert_eq!(v("1.2.3.4").revision(), 4);
        assert_eq!(v(" 4.16.0 ").to_string(), "4.16.0");
    }

    #[test]
    fn test_invalid_versions() {
        assert!(Version::from_str("").is_err());
        assert!(Version::from_str("1").is_err());
        assert!(Version::from_str("1.2").is_err());
        assert!(Version::from_str("1.x.3").is_err());
        assert!(Version::from_str("a.2.3").is_err());
        assert!(Version::from_str("1.2.beta").is_err());
        assert!(Version::from_str("1.2.").is_err());
    }

    #[test]
    fn test_revision_is_lenient() {
        // Unparsable revisions quietly become zero
        assert_eq!(v("4.9.33beta").revision(), 0);
        assert_eq!(v("4.9.33_").revision(), 0);
        assert_eq!(v("4.9.33_x7").revision(), 0);
        assert_eq!(v("4.9.33-7jum").revision(), 7);
        // Only one separator character is skipped
        assert_eq!(v("1.2.3__5").revision(), 0);
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.2.3") < v("1.2.4"));
        assert!(v("1.2.4") < v("1.3.0"));
        assert!(v("1.3.0") < v("2.0.0"));
        assert!(v("1.2.3_5") > v("1.2.3_4"));
        assert!(v("1.2.10") > v("1.2.9"));
    }

    #[test]
    fn test_comparison_is_antisymmetric() {
        let versions = [
            "0.0.0", "1.2.3", "1.2.3_4", "1.2.3_5", "1.2.4", "1.3.0", "2.0.0", "10.0.0",
        ];
        for a in versions {
            for b in versions {
                assert_eq!(v(a).cmp(&v(b)), v(b).cmp(&v(a)).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_equality_ignores_spelling() {
        assert_eq!(v("1.2.3"), v("1.2.3_0"));
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert_eq!(v("1.2.3_0").to_string(), "1.2.3_0");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.6.0_10")).unwrap();
        assert_eq!(json, "\"1.6.0_10\"");

        let parsed: Version = serde_json::from_str("\"4.16.6\"").unwrap();
        assert_eq!(parsed, Version::new(4, 16, 6));
        assert!(serde_json::from_str::<Version>("\"4\"").is_err());
    }
}
