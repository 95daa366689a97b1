//! lcfleet-core — shared domain types for the lcfleet orchestration layer.
//!
//! Everything the other lcfleet crates have in common lives here:
//!
//! - [`JobDescriptor`] and its canonical queue encoding
//! - [`ObjectLocator`] (`store://bucket/key`) addressing
//! - [`ProviderError`] / [`FailMode`] — the two-tier soft/hard failure policy
//! - [`PollPolicy`] and the bounded poll helpers used by readiness loops
//! - [`FleetProfile`] — TOML profile naming the pre-provisioned collaborators
//!   (subnet, security group, keypair, IAM identifiers) and fleet defaults

pub mod config;
pub mod error;
pub mod poll;
pub mod types;

pub use config::FleetProfile;
pub use error::{FailMode, ProviderError};
pub use poll::{poll_until, poll_until_grace, PollOutcome, PollPolicy};
pub use types::{queue_name_for_action, JobDescriptor, LocatorError, ObjectLocator};
