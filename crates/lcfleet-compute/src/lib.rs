//! lcfleet-compute — provisioning primitives for the worker fleet.
//!
//! Two lifecycle managers over one pluggable [`ComputeBackend`]:
//!
//! - [`NodeManager`] — launch a fixed count of homogeneous instances and
//!   poll them to readiness (`Requested → Running → Terminated`, observed
//!   through describe calls, never reversed)
//! - [`FleetManager`] — request an elastic, weighted, multi-type fleet
//!   with a capacity target and price ceiling; cancellation always
//!   terminates every instance the request owns
//!
//! Neither manager decides *when* to grow or shrink capacity — they are
//! the primitives an autoscaling policy would call. Maintaining the
//! target capacity after a fleet goes active is the provider's job.
//!
//! [`SimCompute`] is the scripted in-memory provider used by the tests.

pub mod backend;
pub mod error;
pub mod fleet;
pub mod node;
pub mod sim;
pub mod types;

pub use backend::{CancelAck, ComputeBackend, InstanceStateChange, TerminateAck};
pub use error::{ComputeError, ComputeResult};
pub use fleet::FleetManager;
pub use node::NodeManager;
pub use sim::{SimCompute, Transition};
pub use types::{
    AllocationStrategy, FleetConfig, FleetRequest, FleetSpec, FleetState, Instance, InstanceState,
    LaunchSpec, LaunchTemplate, NodeSpec, UserData,
};
