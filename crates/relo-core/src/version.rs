//! Release version parsing and the tracker-style short form

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReleaseError, Result};

/// A build version as published by CI, e.g. `11.44.2.12345`: dotted
/// numerals, at least two components. Parsed once per run and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseVersion {
    full: String,
    components: Vec<u64>,
}

impl ReleaseVersion {
    pub fn parse(input: &str) -> Result<Self> {
        let components: Vec<u64> = input
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| ReleaseError::InvalidVersion(input.to_string()))?;
        if components.len() < 2 {
            return Err(ReleaseError::InvalidVersion(input.to_string()));
        }
        Ok(ReleaseVersion {
            full: input.to_string(),
            components,
        })
    }

    /// The full dotted string, used as release tag and artifact version.
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Tracker-style version name: the first three components, with a
    /// single trailing `.0` stripped. `1.2.3.45` -> `1.2.3`,
    /// `2.1.0.12` -> `2.1`, `3.4.5` -> `3.4.5`.
    pub fn short(&self) -> String {
        let mut parts: Vec<u64> = self.components.iter().take(3).copied().collect();
        if parts.len() > 1 && parts.last() == Some(&0) {
            parts.pop();
        }
        parts
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_version_formatting() {
        assert_eq!(ReleaseVersion::parse("1.2.3.45").unwrap().short(), "1.2.3");
        assert_eq!(ReleaseVersion::parse("2.1.0.12").unwrap().short(), "2.1");
        assert_eq!(ReleaseVersion::parse("3.4.5").unwrap().short(), "3.4.5");
    }

    #[test]
    fn test_short_version_of_two_components() {
        assert_eq!(ReleaseVersion::parse("11.44").unwrap().short(), "11.44");
        assert_eq!(ReleaseVersion::parse("11.0").unwrap().short(), "11");
    }

    #[test]
    fn test_full_round_trips_the_input() {
        let version = ReleaseVersion::parse("11.44.2.12345").unwrap();
        assert_eq!(version.full(), "11.44.2.12345");
        assert_eq!(version.to_string(), "11.44.2.12345");
    }

    #[test]
    fn test_rejects_non_numeric_and_single_component() {
        assert!(ReleaseVersion::parse("11.x.2").is_err());
        assert!(ReleaseVersion::parse("11").is_err());
        assert!(ReleaseVersion::parse("").is_err());
        assert!(ReleaseVersion::parse("1..2").is_err());
    }
}
