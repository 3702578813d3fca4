//! Integration targets: the products that consume a released analyzer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReleaseError;

/// The closed set of downstream products an analyzer integrates into.
/// Everything target-specific (tracker project, downstream repository,
/// output key) dispatches on this enum; project-key prefixes are parsed
/// once at the edge and never re-inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationTarget {
    SonarQubeServer,
    SonarQubeCloud,
}

impl IntegrationTarget {
    /// Tracker project hosting this target's integration tickets.
    pub fn project_key(&self) -> &'static str {
        match self {
            IntegrationTarget::SonarQubeServer => "SONAR",
            IntegrationTarget::SonarQubeCloud => "SC",
        }
    }

    /// Human-readable product name.
    pub fn product_name(&self) -> &'static str {
        match self {
            IntegrationTarget::SonarQubeServer => "SonarQube Server",
            IntegrationTarget::SonarQubeCloud => "SonarQube Cloud",
        }
    }

    /// Repository whose update workflow bumps the analyzer version.
    pub fn downstream_repository(&self) -> &'static str {
        match self {
            IntegrationTarget::SonarQubeServer => "SonarSource/sonarqube",
            IntegrationTarget::SonarQubeCloud => "SonarSource/sonarcloud-core",
        }
    }

    /// Prefix for this target's `key=value` run outputs.
    pub fn output_prefix(&self) -> &'static str {
        match self {
            IntegrationTarget::SonarQubeServer => "sqs",
            IntegrationTarget::SonarQubeCloud => "sc",
        }
    }

    /// Classify a ticket key (`SONAR-123`, `SC-42`) by its project prefix.
    pub fn from_ticket_key(key: &str) -> Option<Self> {
        let project = key.split('-').next().unwrap_or_default();
        match project {
            "SONAR" => Some(IntegrationTarget::SonarQubeServer),
            "SC" => Some(IntegrationTarget::SonarQubeCloud),
            _ => None,
        }
    }
}

impl fmt::Display for IntegrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.product_name())
    }
}

impl FromStr for IntegrationTarget {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "server" | "sonarqube-server" | "sqs" => Ok(IntegrationTarget::SonarQubeServer),
            "cloud" | "sonarqube-cloud" | "sc" => Ok(IntegrationTarget::SonarQubeCloud),
            _ => Err(ReleaseError::MissingInput(
                "integration target must be sonarqube-server or sonarqube-cloud",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_keys() {
        assert_eq!(IntegrationTarget::SonarQubeServer.project_key(), "SONAR");
        assert_eq!(IntegrationTarget::SonarQubeCloud.project_key(), "SC");
    }

    #[test]
    fn test_from_ticket_key_prefix() {
        assert_eq!(
            IntegrationTarget::from_ticket_key("SONAR-26125"),
            Some(IntegrationTarget::SonarQubeServer)
        );
        assert_eq!(
            IntegrationTarget::from_ticket_key("SC-42"),
            Some(IntegrationTarget::SonarQubeCloud)
        );
        assert_eq!(IntegrationTarget::from_ticket_key("REL-100"), None);
    }

    #[test]
    fn test_parse_accepts_both_spellings() {
        assert_eq!(
            "sonarqube-server".parse::<IntegrationTarget>().unwrap(),
            IntegrationTarget::SonarQubeServer
        );
        assert_eq!(
            "cloud".parse::<IntegrationTarget>().unwrap(),
            IntegrationTarget::SonarQubeCloud
        );
        assert!("desktop".parse::<IntegrationTarget>().is_err());
    }
}
