//! `fleet.toml` profile parser.
//!
//! A profile names the collaborators the caller has already provisioned
//! with the provider (network, identity, default bucket and queue prefix)
//! plus optional defaults for node launches and fleet requests. This layer
//! never creates any of them.
//!
//! ```toml
//! [store]
//! bucket = "lc-results"
//!
//! [queue]
//! prefix = "lcfleet-queue"
//!
//! [network]
//! subnet_id = "subnet-01"
//! security_group_id = "sg-01"
//!
//! [identity]
//! keypair_name = "lcfleet-keys"
//! instance_profile_arn = "arn:iam::profile/lcfleet-worker"
//! fleet_role = "arn:iam::role/lcfleet-fleet"
//!
//! [fleet]
//! target_capacity = 20
//! price_ceiling = 0.4
//! instance_types = ["m5.xlarge", "c5.xlarge"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("could not read profile {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse profile: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetProfile {
    pub store: Option<StoreProfile>,
    pub queue: Option<QueueProfile>,
    pub network: NetworkProfile,
    pub identity: IdentityProfile,
    pub nodes: Option<NodeDefaults>,
    pub fleet: Option<FleetDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProfile {
    /// Default bucket for job outputs.
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueProfile {
    /// Prefix for conventional per-action queue names.
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub subnet_id: String,
    pub security_group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub keypair_name: String,
    /// Instance-profile ARN attached to every launched instance.
    pub instance_profile_arn: String,
    /// Role the fleet manager assumes; only needed for fleet requests.
    pub fleet_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefaults {
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
    pub storage_optimized: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetDefaults {
    pub target_capacity: Option<u32>,
    pub price_ceiling: Option<f64>,
    pub expires_days: Option<u32>,
    pub allocation_strategy: Option<String>,
    pub instance_types: Option<Vec<String>>,
    pub instance_weights: Option<Vec<f64>>,
    pub image_id: Option<String>,
}

impl FleetProfile {
    /// Load and parse a profile from a `fleet.toml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Parse a profile from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self, ProfileError> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
[store]
bucket = "lc-results"

[queue]
prefix = "lcfleet-queue"

[network]
subnet_id = "subnet-01"
security_group_id = "sg-01"

[identity]
keypair_name = "lcfleet-keys"
instance_profile_arn = "arn:iam::profile/lcfleet-worker"
fleet_role = "arn:iam::role/lcfleet-fleet"

[fleet]
target_capacity = 20
price_ceiling = 0.4
instance_types = ["m5.xlarge", "c5.xlarge"]
instance_weights = [1.0, 2.0]
"#;

    #[test]
    fn parses_a_full_profile() {
        let profile = FleetProfile::from_toml(PROFILE).unwrap();
        assert_eq!(profile.network.subnet_id, "subnet-01");
        assert_eq!(profile.identity.keypair_name, "lcfleet-keys");
        let fleet = profile.fleet.unwrap();
        assert_eq!(fleet.target_capacity, Some(20));
        assert_eq!(fleet.instance_types.unwrap().len(), 2);
    }

    #[test]
    fn minimal_profile_needs_only_network_and_identity() {
        let profile = FleetProfile::from_toml(
            r#"
[network]
subnet_id = "subnet-01"
security_group_id = "sg-01"

[identity]
keypair_name = "k"
instance_profile_arn = "arn"
"#,
        )
        .unwrap();
        assert!(profile.fleet.is_none());
        assert!(profile.identity.fleet_role.is_none());
    }

    #[test]
    fn garbage_profile_is_a_parse_error() {
        assert!(matches!(
            FleetProfile::from_toml("network = 3"),
            Err(ProfileError::Parse(_))
        ));
    }
}
