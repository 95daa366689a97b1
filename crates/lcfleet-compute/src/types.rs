//! Domain types for node launches and fleet requests.
//!
//! The shared-template rule applies throughout: [`LaunchTemplate`] and
//! [`FleetSpec`] are immutable value objects, and every composed
//! [`FleetConfig`] deep-clones from them — nothing is patched in place
//! and reused across calls.

use std::collections::HashMap;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use lcfleet_core::FleetProfile;

use crate::error::ComputeError;

/// Instance types a fleet request spreads over when the caller does not
/// choose its own mix.
pub const DEFAULT_FLEET_INSTANCE_TYPES: &[&str] = &[
    "m5.xlarge",
    "m5.2xlarge",
    "c5.xlarge",
    "c5.2xlarge",
    "c5.4xlarge",
];

// ── Instances ──────────────────────────────────────────────────────

/// Lifecycle state of one instance, as observed through describe calls.
///
/// Transitions are monotonic in this order; an instance never reverses
/// from a later state to an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
}

impl InstanceState {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::ShuttingDown => 2,
            Self::Terminated => 3,
        }
    }
}

/// One provisioned virtual machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub instance_type: String,
    pub launched_at: DateTime<Utc>,
    pub state: InstanceState,
    /// Assigned once the instance is running.
    pub ip: Option<String>,
}

impl Instance {
    /// Fold in a newly observed state, keeping transitions monotonic: a
    /// stale observation of an earlier state is discarded.
    pub fn observe(&mut self, state: InstanceState, ip: Option<String>) {
        if state.rank() >= self.state.rank() {
            self.state = state;
            if ip.is_some() {
                self.ip = ip;
            }
        }
    }
}

// ── User data ──────────────────────────────────────────────────────

/// The boot script handed to launched instances.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserData {
    /// Literal inline script text.
    Inline(String),
    /// Read the script from a local file.
    File(PathBuf),
    /// A generated stub that logs the UTC launch time.
    #[default]
    Default,
}

impl UserData {
    /// Resolve to raw script text. The fixed-node launch path submits
    /// this as-is; the fleet path base64-encodes it (see
    /// [`FleetSpec::compose`]) — an intentional asymmetry of the wire
    /// formats, preserved exactly.
    pub async fn resolve_raw(&self) -> Result<String, ComputeError> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ComputeError::UserData {
                        path: path.display().to_string(),
                        source,
                    })
            }
            Self::Default => Ok(format!(
                "#!/bin/bash\necho \"No user data provided. Launched instance at: {} UTC\"",
                Utc::now().format("%Y-%m-%dT%H:%M:%S")
            )),
        }
    }
}

// ── Node launches ──────────────────────────────────────────────────

/// Everything a fixed-node batch launch needs: one image, one type, and
/// the pre-provisioned network/identity collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub ami: String,
    pub instance_type: String,
    pub security_group_id: String,
    pub subnet_id: String,
    pub keypair_name: String,
    pub iam_profile_arn: String,
    pub storage_optimized: bool,
    pub user_data: UserData,
}

impl NodeSpec {
    /// Build a node spec from a profile, falling back to a small general
    /// purpose instance where the profile is silent.
    pub fn from_profile(profile: &FleetProfile) -> Self {
        let nodes = profile.nodes.as_ref();
        Self {
            ami: nodes
                .and_then(|n| n.image_id.clone())
                .unwrap_or_default(),
            instance_type: nodes
                .and_then(|n| n.instance_type.clone())
                .unwrap_or_else(|| "t3.micro".to_string()),
            security_group_id: profile.network.security_group_id.clone(),
            subnet_id: profile.network.subnet_id.clone(),
            keypair_name: profile.identity.keypair_name.clone(),
            iam_profile_arn: profile.identity.instance_profile_arn.clone(),
            storage_optimized: nodes.and_then(|n| n.storage_optimized).unwrap_or(true),
            user_data: UserData::Default,
        }
    }
}

// ── Fleet requests ─────────────────────────────────────────────────

/// How the provider spreads capacity across the launch specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocationStrategy {
    #[default]
    LowestPrice,
    Diversified,
}

impl AllocationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LowestPrice => "lowestPrice",
            Self::Diversified => "diversified",
        }
    }
}

impl std::str::FromStr for AllocationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lowestPrice" | "lowest-price" => Ok(Self::LowestPrice),
            "diversified" => Ok(Self::Diversified),
            other => Err(format!("unknown allocation strategy: {other}")),
        }
    }
}

/// Per-instance-type configuration within a fleet request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub instance_type: String,
    /// Relative weight toward the capacity target; positional from the
    /// caller's weights sequence.
    pub weight: Option<f64>,
    pub ami: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub keypair_name: String,
    pub iam_profile_arn: String,
    /// Base64-encoded boot script (raw on the fixed-node path).
    pub user_data: String,
    pub storage_optimized: bool,
}

/// The fields every launch spec in one fleet request shares. Cloned per
/// instance type, never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchTemplate {
    pub ami: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub keypair_name: String,
    pub iam_profile_arn: String,
    /// Already base64-encoded.
    pub user_data: String,
    pub storage_optimized: bool,
}

impl LaunchTemplate {
    /// Stamp out the launch spec for one instance type.
    pub fn for_type(&self, instance_type: &str, weight: Option<f64>) -> LaunchSpec {
        LaunchSpec {
            instance_type: instance_type.to_string(),
            weight,
            ami: self.ami.clone(),
            subnet_id: self.subnet_id.clone(),
            security_group_id: self.security_group_id.clone(),
            keypair_name: self.keypair_name.clone(),
            iam_profile_arn: self.iam_profile_arn.clone(),
            user_data: self.user_data.clone(),
            storage_optimized: self.storage_optimized,
        }
    }
}

/// Caller-facing description of a fleet request.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSpec {
    pub security_group_id: String,
    pub subnet_id: String,
    pub keypair_name: String,
    pub iam_profile_arn: String,
    /// Role the provider's fleet manager assumes to maintain capacity.
    pub fleet_role: String,
    pub target_capacity: u32,
    /// Hourly price ceiling per capacity unit, in account currency.
    pub price_ceiling: f64,
    /// The request self-terminates this many days after submission.
    pub expires_days: u32,
    pub allocation_strategy: AllocationStrategy,
    pub instance_types: Vec<String>,
    /// Positional weights for `instance_types`; `None` leaves weighting
    /// to the provider.
    pub instance_weights: Option<Vec<f64>>,
    pub ami: String,
    pub user_data: UserData,
    pub storage_optimized: bool,
}

impl FleetSpec {
    /// A spec with the default capacity/price/mix, ready for the caller
    /// to adjust.
    pub fn new(
        security_group_id: impl Into<String>,
        subnet_id: impl Into<String>,
        keypair_name: impl Into<String>,
        iam_profile_arn: impl Into<String>,
        fleet_role: impl Into<String>,
    ) -> Self {
        Self {
            security_group_id: security_group_id.into(),
            subnet_id: subnet_id.into(),
            keypair_name: keypair_name.into(),
            iam_profile_arn: iam_profile_arn.into(),
            fleet_role: fleet_role.into(),
            target_capacity: 20,
            price_ceiling: 0.4,
            expires_days: 7,
            allocation_strategy: AllocationStrategy::default(),
            instance_types: DEFAULT_FLEET_INSTANCE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            instance_weights: None,
            ami: String::new(),
            user_data: UserData::Default,
            storage_optimized: true,
        }
    }

    /// Build a spec from a profile; `None` if the profile has no fleet
    /// role (fleet requests cannot be made without one).
    pub fn from_profile(profile: &FleetProfile) -> Option<Self> {
        let fleet_role = profile.identity.fleet_role.clone()?;
        let mut spec = Self::new(
            profile.network.security_group_id.clone(),
            profile.network.subnet_id.clone(),
            profile.identity.keypair_name.clone(),
            profile.identity.instance_profile_arn.clone(),
            fleet_role,
        );
        if let Some(defaults) = &profile.fleet {
            if let Some(capacity) = defaults.target_capacity {
                spec.target_capacity = capacity;
            }
            if let Some(price) = defaults.price_ceiling {
                spec.price_ceiling = price;
            }
            if let Some(days) = defaults.expires_days {
                spec.expires_days = days;
            }
            if let Some(strategy) = &defaults.allocation_strategy {
                if let Ok(parsed) = strategy.parse() {
                    spec.allocation_strategy = parsed;
                }
            }
            if let Some(types) = &defaults.instance_types {
                spec.instance_types = types.clone();
            }
            spec.instance_weights = defaults.instance_weights.clone();
            if let Some(ami) = &defaults.image_id {
                spec.ami = ami.clone();
            }
        }
        Some(spec)
    }

    /// Compose the provider-facing fleet configuration: the fleet-level
    /// fields plus one launch spec per instance type, each cloned from a
    /// fresh template. The boot script is base64-encoded here and only
    /// here; weights are taken positionally.
    pub async fn compose(&self) -> Result<FleetConfig, ComputeError> {
        let raw = self.user_data.resolve_raw().await?;
        let template = LaunchTemplate {
            ami: self.ami.clone(),
            subnet_id: self.subnet_id.clone(),
            security_group_id: self.security_group_id.clone(),
            keypair_name: self.keypair_name.clone(),
            iam_profile_arn: self.iam_profile_arn.clone(),
            user_data: BASE64.encode(raw.as_bytes()),
            storage_optimized: self.storage_optimized,
        };

        let launch_specs = self
            .instance_types
            .iter()
            .enumerate()
            .map(|(i, itype)| {
                let weight = self
                    .instance_weights
                    .as_ref()
                    .and_then(|w| w.get(i).copied());
                template.for_type(itype, weight)
            })
            .collect();

        let valid_until = (Utc::now() + ChronoDuration::days(i64::from(self.expires_days)))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        Ok(FleetConfig {
            fleet_role: self.fleet_role.clone(),
            allocation_strategy: self.allocation_strategy,
            target_capacity: self.target_capacity,
            price_ceiling: format!("{}", self.price_ceiling),
            valid_until,
            mode: "maintain".to_string(),
            replace_unhealthy: true,
            terminate_with_expiration: true,
            launch_specs,
        })
    }
}

/// The fully composed, provider-facing request configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    pub fleet_role: String,
    pub allocation_strategy: AllocationStrategy,
    pub target_capacity: u32,
    /// Decimal string, as the wire format requires.
    pub price_ceiling: String,
    /// ISO-8601 UTC expiry, submission time + `expires_days`.
    pub valid_until: String,
    /// Always `maintain`: the provider keeps the capacity target filled.
    pub mode: String,
    pub replace_unhealthy: bool,
    pub terminate_with_expiration: bool,
    pub launch_specs: Vec<LaunchSpec>,
}

/// Lifecycle state of a fleet request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetState {
    Submitted,
    Active,
    Cancelled,
}

/// A fleet request as observed from the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetRequest {
    pub id: String,
    pub state: FleetState,
    pub target_capacity: u32,
    pub price_ceiling: String,
    pub valid_until: String,
    pub launch_specs: Vec<LaunchSpec>,
}

/// Instances grouped by id, as returned from a batch launch.
pub type InstanceMap = HashMap<String, Instance>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_states_never_reverse() {
        let mut inst = Instance {
            id: "i-01".to_string(),
            instance_type: "t3.micro".to_string(),
            launched_at: Utc::now(),
            state: InstanceState::Running,
            ip: Some("10.0.0.1".to_string()),
        };

        inst.observe(InstanceState::Pending, None);
        assert_eq!(inst.state, InstanceState::Running);
        assert_eq!(inst.ip.as_deref(), Some("10.0.0.1"));

        inst.observe(InstanceState::ShuttingDown, None);
        assert_eq!(inst.state, InstanceState::ShuttingDown);
        inst.observe(InstanceState::Terminated, None);
        inst.observe(InstanceState::Running, None);
        assert_eq!(inst.state, InstanceState::Terminated);
    }

    #[tokio::test]
    async fn default_user_data_is_a_stub_with_the_launch_time() {
        let script = UserData::Default.resolve_raw().await.unwrap();
        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains("No user data provided."));
        assert!(script.ends_with("UTC\""));
    }

    #[tokio::test]
    async fn file_user_data_reads_the_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boot.sh");
        tokio::fs::write(&path, "#!/bin/bash\nstart-worker\n")
            .await
            .unwrap();

        let script = UserData::File(path).resolve_raw().await.unwrap();
        assert_eq!(script, "#!/bin/bash\nstart-worker\n");
    }

    #[tokio::test]
    async fn missing_user_data_file_is_a_typed_error() {
        let err = UserData::File(PathBuf::from("/nonexistent/boot.sh"))
            .resolve_raw()
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::UserData { .. }));
    }

    fn two_type_spec() -> FleetSpec {
        let mut spec = FleetSpec::new("sg-01", "subnet-01", "keys", "arn:profile", "arn:fleet");
        spec.ami = "ami-01".to_string();
        spec.instance_types = vec!["m5.xlarge".to_string(), "c5.2xlarge".to_string()];
        spec.instance_weights = Some(vec![1.0, 2.0]);
        spec.user_data = UserData::Inline("#!/bin/bash\ntrue\n".to_string());
        spec
    }

    #[tokio::test]
    async fn compose_builds_one_spec_per_type_with_positional_weights() {
        let config = two_type_spec().compose().await.unwrap();

        assert_eq!(config.launch_specs.len(), 2);
        assert_eq!(config.launch_specs[0].instance_type, "m5.xlarge");
        assert_eq!(config.launch_specs[0].weight, Some(1.0));
        assert_eq!(config.launch_specs[1].instance_type, "c5.2xlarge");
        assert_eq!(config.launch_specs[1].weight, Some(2.0));

        // The shared identity/network fields are cloned into every spec.
        for spec in &config.launch_specs {
            assert_eq!(spec.ami, "ami-01");
            assert_eq!(spec.subnet_id, "subnet-01");
            assert_eq!(spec.security_group_id, "sg-01");
            assert_eq!(spec.keypair_name, "keys");
            assert_eq!(spec.iam_profile_arn, "arn:profile");
            assert!(spec.storage_optimized);
        }
    }

    #[tokio::test]
    async fn compose_base64_encodes_the_boot_script() {
        let config = two_type_spec().compose().await.unwrap();
        let decoded = BASE64
            .decode(config.launch_specs[0].user_data.as_bytes())
            .unwrap();
        assert_eq!(decoded, b"#!/bin/bash\ntrue\n");
    }

    #[tokio::test]
    async fn compose_fleet_level_fields() {
        let config = two_type_spec().compose().await.unwrap();
        assert_eq!(config.price_ceiling, "0.4");
        assert_eq!(config.mode, "maintain");
        assert!(config.replace_unhealthy);
        assert!(config.terminate_with_expiration);
        assert_eq!(config.target_capacity, 20);
        // Expiry is submission time + 7 days, ISO-8601 UTC.
        let expiry =
            chrono::NaiveDateTime::parse_from_str(&config.valid_until, "%Y-%m-%dT%H:%M:%SZ")
                .unwrap()
                .and_utc();
        let days = (expiry - Utc::now()).num_days();
        assert!((6..=7).contains(&days));
    }

    #[tokio::test]
    async fn compose_without_weights_leaves_them_unset() {
        let mut spec = two_type_spec();
        spec.instance_weights = None;
        let config = spec.compose().await.unwrap();
        assert!(config.launch_specs.iter().all(|s| s.weight.is_none()));
    }

    #[tokio::test]
    async fn templates_are_cloned_per_call_never_accumulated() {
        let spec = two_type_spec();
        let first = spec.compose().await.unwrap();
        let second = spec.compose().await.unwrap();
        assert_eq!(first.launch_specs.len(), 2);
        assert_eq!(second.launch_specs.len(), 2);
    }

    #[test]
    fn allocation_strategy_wire_names() {
        assert_eq!(AllocationStrategy::LowestPrice.as_str(), "lowestPrice");
        assert_eq!(AllocationStrategy::Diversified.as_str(), "diversified");
        assert_eq!(
            "diversified".parse::<AllocationStrategy>().unwrap(),
            AllocationStrategy::Diversified
        );
        assert!("spotty".parse::<AllocationStrategy>().is_err());
    }
}
