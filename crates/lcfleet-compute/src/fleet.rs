//! Elastic fleet lifecycle: weighted multi-type request, activation
//! poll, cancel-with-terminate.

use tracing::{error, info, warn};

use lcfleet_core::poll::{poll_until, PollOutcome, PollPolicy};
use lcfleet_core::FailMode;

use crate::backend::{CancelAck, ComputeBackend};
use crate::error::{ComputeError, ComputeResult};
use crate::types::{FleetSpec, FleetState};

/// Manager for elastic, weighted, multi-instance-type fleets.
///
/// A request goes `Submitted → Active` under the provider's control;
/// once active, the provider maintains the capacity target on its own.
/// Cancellation is always paired with termination of every owned
/// instance — there is no way to leave orphaned capacity behind.
#[derive(Debug, Clone)]
pub struct FleetManager<B> {
    backend: B,
    fail_mode: FailMode,
    activation: PollPolicy,
}

impl<B: ComputeBackend> FleetManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            fail_mode: FailMode::Soft,
            activation: PollPolicy::fleet_active(),
        }
    }

    pub fn with_fail_mode(mut self, fail_mode: FailMode) -> Self {
        self.fail_mode = fail_mode;
        self
    }

    pub fn with_activation_policy(mut self, policy: PollPolicy) -> Self {
        self.activation = policy;
        self
    }

    /// Compose and submit a fleet request.
    ///
    /// With `wait_until_active` the request state is polled under the
    /// activation policy; the request id is returned either way — a poll
    /// budget that runs out is logged, never raised, and a caller that
    /// needs certainty must re-verify the state itself.
    pub async fn request_fleet(
        &self,
        spec: &FleetSpec,
        wait_until_active: bool,
    ) -> ComputeResult<Option<String>> {
        let config = spec.compose().await?;

        let request_id = match self.backend.request_fleet(&config).await {
            Ok(id) => id,
            Err(e) if e.is_rejection() => return Err(ComputeError::FleetRequest(e)),
            Err(e) => {
                error!(
                    target_capacity = config.target_capacity,
                    types = config.launch_specs.len(),
                    error = %e,
                    "fleet request failed"
                );
                return match self.fail_mode {
                    FailMode::Hard => Err(ComputeError::FleetRequest(e)),
                    FailMode::Soft => Ok(None),
                };
            }
        };

        info!(
            %request_id,
            target_capacity = config.target_capacity,
            types = config.launch_specs.len(),
            "fleet requested"
        );

        if wait_until_active {
            self.wait_until_active(&request_id).await;
        }

        Ok(Some(request_id))
    }

    /// Cancel a fleet request. One atomic provider call that also
    /// terminates every instance the request launched; the raw
    /// acknowledgment is returned and failures propagate to the caller.
    pub async fn cancel_fleet(&self, request_id: &str) -> ComputeResult<CancelAck> {
        let ack = self
            .backend
            .cancel_fleet(request_id)
            .await
            .map_err(|source| ComputeError::FleetCancel {
                id: request_id.to_string(),
                source,
            })?;
        info!(
            %request_id,
            terminated = ack.terminated.len(),
            "fleet cancelled and instances terminated"
        );
        Ok(ack)
    }

    async fn wait_until_active(&self, request_id: &str) {
        let backend = &self.backend;
        let outcome = poll_until(self.activation, |attempt| async move {
            match backend.describe_fleet(request_id).await {
                Ok(request) if request.state == FleetState::Active => true,
                Ok(request) => {
                    info!(%request_id, attempt, state = ?request.state, "fleet not yet active");
                    false
                }
                Err(e) => {
                    warn!(%request_id, attempt, error = %e, "could not describe fleet");
                    false
                }
            }
        })
        .await;

        match outcome {
            PollOutcome::Satisfied { .. } => info!(%request_id, "fleet is now active"),
            PollOutcome::Exhausted { polls } => {
                warn!(%request_id, polls, "fleet did not become active within the poll budget")
            }
        }
    }
}
