//! Fixed-node lifecycle: batch launch, poll to readiness, terminate.

use std::cell::RefCell;

use tracing::{debug, error, info, warn};

use lcfleet_core::poll::{poll_until_grace, PollOutcome, PollPolicy};
use lcfleet_core::FailMode;

use crate::backend::{ComputeBackend, TerminateAck};
use crate::error::{ComputeError, ComputeResult};
use crate::types::{InstanceMap, InstanceState, NodeSpec};

/// Manager for fixed counts of homogeneous worker nodes.
///
/// Per instance the observed state machine is
/// `Requested → Running → Terminated`, with no reverse edges; readiness
/// is learned by polling, and partial readiness on budget exhaustion is
/// a warning, never an error.
#[derive(Debug, Clone)]
pub struct NodeManager<B> {
    backend: B,
    fail_mode: FailMode,
    readiness: PollPolicy,
}

impl<B: ComputeBackend> NodeManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            fail_mode: FailMode::Soft,
            readiness: PollPolicy::node_readiness(),
        }
    }

    pub fn with_fail_mode(mut self, fail_mode: FailMode) -> Self {
        self.fail_mode = fail_mode;
        self
    }

    pub fn with_readiness_policy(mut self, policy: PollPolicy) -> Self {
        self.readiness = policy;
        self
    }

    /// Launch `count` instances from `spec` in one batch request.
    ///
    /// The boot script is submitted as raw text (the fleet path encodes
    /// it; this one does not). With `wait_until_running` the manager
    /// polls the provider under the readiness policy — the continuation
    /// condition is an inclusive-or of "attempts remain" and "not all
    /// running", so a never-ready provider is described exactly
    /// `attempts + 1` times — and returns whatever states were achieved.
    pub async fn launch(
        &self,
        spec: &NodeSpec,
        count: u32,
        wait_until_running: bool,
    ) -> ComputeResult<Option<InstanceMap>> {
        let user_data = spec.user_data.resolve_raw().await?;

        let launched = match self.backend.run_instances(spec, count, &user_data).await {
            Ok(launched) => launched,
            Err(e) if e.is_rejection() => return Err(ComputeError::Launch(e)),
            Err(e) => {
                error!(
                    instance_type = %spec.instance_type,
                    count,
                    error = %e,
                    "could not launch requested instances"
                );
                return match self.fail_mode {
                    FailMode::Hard => Err(ComputeError::Launch(e)),
                    FailMode::Soft => Ok(None),
                };
            }
        };

        let mut instances = InstanceMap::new();
        for inst in launched {
            info!(
                id = %inst.id,
                instance_type = %inst.instance_type,
                launched_at = %inst.launched_at,
                state = ?inst.state,
                "launched instance"
            );
            instances.insert(inst.id.clone(), inst);
        }

        if wait_until_running && !instances.is_empty() {
            info!("waiting until launched instances are running");
            self.wait_until_running(&mut instances).await;
        }

        Ok(Some(instances))
    }

    /// Begin terminating the given instances. Fire-and-forget: the raw
    /// acknowledgment is returned without polling for completion, and
    /// failures propagate to the caller.
    pub async fn terminate(&self, ids: &[String]) -> ComputeResult<TerminateAck> {
        let ack = self
            .backend
            .terminate_instances(ids)
            .await
            .map_err(ComputeError::Terminate)?;
        for change in &ack.changes {
            info!(
                id = %change.id,
                previous = ?change.previous,
                current = ?change.current,
                "terminating instance"
            );
        }
        Ok(ack)
    }

    async fn wait_until_running(&self, instances: &mut InstanceMap) {
        let ids: Vec<String> = instances.keys().cloned().collect();
        let total = ids.len();
        let observed = RefCell::new(instances);
        let backend = &self.backend;

        let outcome = poll_until_grace(self.readiness, |attempt| {
            let ids = &ids;
            let observed = &observed;
            async move {
                match backend.describe_instances(ids).await {
                    Ok(reported) => {
                        let mut map = observed.borrow_mut();
                        for inst in reported {
                            if let Some(known) = map.get_mut(&inst.id) {
                                known.observe(inst.state, inst.ip);
                            }
                        }
                        let running = count_running(&map);
                        debug!(attempt, running, total, "instance readiness poll");
                        running == total
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "could not describe instances during readiness poll");
                        false
                    }
                }
            }
        })
        .await;

        match outcome {
            PollOutcome::Satisfied { .. } => info!("all instances now running"),
            PollOutcome::Exhausted { polls } => warn!(
                polls,
                "reached readiness attempt cap; not all instances may be running"
            ),
        }
    }
}

fn count_running(instances: &InstanceMap) -> usize {
    instances
        .values()
        .filter(|i| i.state == InstanceState::Running)
        .count()
}
