//! Compute backend contract — injected for testability.

use lcfleet_core::ProviderError;

use crate::types::{FleetConfig, FleetRequest, FleetState, Instance, InstanceState, NodeSpec};

/// One instance's state transition as reported by a terminate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStateChange {
    pub id: String,
    pub previous: InstanceState,
    pub current: InstanceState,
}

/// Raw acknowledgment of a batch terminate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminateAck {
    pub changes: Vec<InstanceStateChange>,
}

/// Raw acknowledgment of a fleet cancellation. The provider contract is
/// that cancellation terminates every instance the request owns; there
/// is no cancel-without-terminate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAck {
    pub request_id: String,
    pub state: FleetState,
    /// Instances the provider started terminating as part of the cancel.
    pub terminated: Vec<String>,
}

/// The raw provisioning primitives of a compute provider.
///
/// All state transitions are provider-driven and partially observable:
/// the managers learn about them only through the describe calls.
pub trait ComputeBackend: Send + Sync {
    /// Submit one batch request for `count` homogeneous instances.
    /// `user_data` is the raw boot-script text.
    fn run_instances(
        &self,
        spec: &NodeSpec,
        count: u32,
        user_data: &str,
    ) -> impl Future<Output = Result<Vec<Instance>, ProviderError>> + Send;

    /// Report the current state of the given instances.
    fn describe_instances(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<Vec<Instance>, ProviderError>> + Send;

    /// Begin terminating the given instances.
    fn terminate_instances(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<TerminateAck, ProviderError>> + Send;

    /// Submit a fleet request; returns the request id.
    fn request_fleet(
        &self,
        config: &FleetConfig,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    /// Report the current record of a fleet request.
    fn describe_fleet(
        &self,
        request_id: &str,
    ) -> impl Future<Output = Result<FleetRequest, ProviderError>> + Send;

    /// Cancel a fleet request and terminate every instance it owns, in
    /// one atomic provider call.
    fn cancel_fleet(
        &self,
        request_id: &str,
    ) -> impl Future<Output = Result<CancelAck, ProviderError>> + Send;
}
