//! Scripted in-memory compute provider for tests and local development.
//!
//! The simulator owns the provider-driven side of the state machines:
//! instances flip `Pending → Running` and fleets `Submitted → Active`
//! according to a [`Transition`] script, observable only through the
//! describe calls — exactly the partial visibility the managers must
//! cope with.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use lcfleet_core::ProviderError;

use crate::backend::{CancelAck, ComputeBackend, InstanceStateChange, TerminateAck};
use crate::types::{FleetConfig, FleetRequest, FleetState, Instance, InstanceState, NodeSpec};

/// When a scripted state transition becomes visible to describe calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    /// Visible from the first describe onward.
    #[default]
    Immediate,
    /// Never happens.
    Never,
    /// Visible from the nth describe call onward (1-based).
    After(u32),
}

impl Transition {
    fn reached(self, observations: u32) -> bool {
        match self {
            Self::Immediate => true,
            Self::Never => false,
            Self::After(n) => observations >= n,
        }
    }
}

#[derive(Debug)]
struct SimFleet {
    state: FleetState,
    describes: u32,
    owned: Vec<String>,
    config: FleetConfig,
}

#[derive(Debug, Default)]
struct SimState {
    readiness: Transition,
    activation: Transition,
    instances: HashMap<String, Instance>,
    fleets: HashMap<String, SimFleet>,
    describe_instance_calls: u32,
    next_instance: u32,
    next_fleet: u32,
    reject_next: Option<(String, String)>,
    last_user_data: Option<String>,
}

/// A compute provider held entirely in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimCompute {
    inner: Arc<Mutex<SimState>>,
}

impl SimCompute {
    /// A provider whose instances and fleets are ready on first describe.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readiness(self, readiness: Transition) -> Self {
        self.inner.lock().expect("sim poisoned").readiness = readiness;
        self
    }

    pub fn with_activation(self, activation: Transition) -> Self {
        self.inner.lock().expect("sim poisoned").activation = activation;
        self
    }

    /// Make the next submit call fail with a provider rejection.
    pub fn reject_next(&self, code: &str, message: &str) {
        self.inner.lock().expect("sim poisoned").reject_next =
            Some((code.to_string(), message.to_string()));
    }

    pub fn describe_instance_calls(&self) -> u32 {
        self.inner.lock().expect("sim poisoned").describe_instance_calls
    }

    pub fn fleet_describes(&self, request_id: &str) -> u32 {
        self.inner
            .lock()
            .expect("sim poisoned")
            .fleets
            .get(request_id)
            .map(|f| f.describes)
            .unwrap_or(0)
    }

    pub fn fleet_state(&self, request_id: &str) -> Option<FleetState> {
        self.inner
            .lock()
            .expect("sim poisoned")
            .fleets
            .get(request_id)
            .map(|f| f.state)
    }

    pub fn fleet_config(&self, request_id: &str) -> Option<FleetConfig> {
        self.inner
            .lock()
            .expect("sim poisoned")
            .fleets
            .get(request_id)
            .map(|f| f.config.clone())
    }

    /// Ids of the instances a fleet request launched.
    pub fn fleet_instances(&self, request_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .expect("sim poisoned")
            .fleets
            .get(request_id)
            .map(|f| f.owned.clone())
            .unwrap_or_default()
    }

    pub fn instance(&self, id: &str) -> Option<Instance> {
        self.inner
            .lock()
            .expect("sim poisoned")
            .instances
            .get(id)
            .cloned()
    }

    /// The raw boot script submitted with the last instance launch.
    pub fn last_user_data(&self) -> Option<String> {
        self.inner.lock().expect("sim poisoned").last_user_data.clone()
    }
}

fn take_rejection(state: &mut SimState) -> Option<ProviderError> {
    state
        .reject_next
        .take()
        .map(|(code, message)| ProviderError::Rejected { code, message })
}

impl ComputeBackend for SimCompute {
    async fn run_instances(
        &self,
        spec: &NodeSpec,
        count: u32,
        user_data: &str,
    ) -> Result<Vec<Instance>, ProviderError> {
        let mut state = self.inner.lock().expect("sim poisoned");
        if let Some(err) = take_rejection(&mut state) {
            return Err(err);
        }
        state.last_user_data = Some(user_data.to_string());

        let mut launched = Vec::with_capacity(count as usize);
        for _ in 0..count {
            state.next_instance += 1;
            let inst = Instance {
                id: format!("i-{:04}", state.next_instance),
                instance_type: spec.instance_type.clone(),
                launched_at: Utc::now(),
                state: InstanceState::Pending,
                ip: None,
            };
            state.instances.insert(inst.id.clone(), inst.clone());
            launched.push(inst);
        }
        Ok(launched)
    }

    async fn describe_instances(&self, ids: &[String]) -> Result<Vec<Instance>, ProviderError> {
        let mut state = self.inner.lock().expect("sim poisoned");
        state.describe_instance_calls += 1;
        let observations = state.describe_instance_calls;

        let flip = state.readiness.reached(observations);
        let mut observed = Vec::new();
        for id in ids {
            let Some(inst) = state.instances.get_mut(id) else {
                continue;
            };
            if flip && inst.state == InstanceState::Pending {
                let ip = format!("10.0.0.{}", observed.len() + 1);
                inst.observe(InstanceState::Running, Some(ip));
            }
            observed.push(inst.clone());
        }
        Ok(observed)
    }

    async fn terminate_instances(&self, ids: &[String]) -> Result<TerminateAck, ProviderError> {
        let mut state = self.inner.lock().expect("sim poisoned");
        let mut changes = Vec::with_capacity(ids.len());
        for id in ids {
            let inst = state
                .instances
                .get_mut(id)
                .ok_or_else(|| ProviderError::NotFound(id.clone()))?;
            let previous = inst.state;
            inst.observe(InstanceState::ShuttingDown, None);
            changes.push(InstanceStateChange {
                id: id.clone(),
                previous,
                current: inst.state,
            });
        }
        Ok(TerminateAck { changes })
    }

    async fn request_fleet(&self, config: &FleetConfig) -> Result<String, ProviderError> {
        let mut state = self.inner.lock().expect("sim poisoned");
        if let Some(err) = take_rejection(&mut state) {
            return Err(err);
        }

        state.next_fleet += 1;
        let request_id = format!("fleet-{:04}", state.next_fleet);

        // One instance per launch spec stands in for the fleet's capacity.
        let mut owned = Vec::new();
        for spec in &config.launch_specs {
            state.next_instance += 1;
            let inst = Instance {
                id: format!("i-{:04}", state.next_instance),
                instance_type: spec.instance_type.clone(),
                launched_at: Utc::now(),
                state: InstanceState::Pending,
                ip: None,
            };
            owned.push(inst.id.clone());
            state.instances.insert(inst.id.clone(), inst);
        }

        state.fleets.insert(
            request_id.clone(),
            SimFleet {
                state: FleetState::Submitted,
                describes: 0,
                owned,
                config: config.clone(),
            },
        );
        Ok(request_id)
    }

    async fn describe_fleet(&self, request_id: &str) -> Result<FleetRequest, ProviderError> {
        let mut state = self.inner.lock().expect("sim poisoned");
        let activation = state.activation;
        let fleet = state
            .fleets
            .get_mut(request_id)
            .ok_or_else(|| ProviderError::NotFound(request_id.to_string()))?;

        fleet.describes += 1;
        if fleet.state == FleetState::Submitted && activation.reached(fleet.describes) {
            fleet.state = FleetState::Active;
        }
        Ok(FleetRequest {
            id: request_id.to_string(),
            state: fleet.state,
            target_capacity: fleet.config.target_capacity,
            price_ceiling: fleet.config.price_ceiling.clone(),
            valid_until: fleet.config.valid_until.clone(),
            launch_specs: fleet.config.launch_specs.clone(),
        })
    }

    async fn cancel_fleet(&self, request_id: &str) -> Result<CancelAck, ProviderError> {
        let mut state = self.inner.lock().expect("sim poisoned");
        let fleet = state
            .fleets
            .get_mut(request_id)
            .ok_or_else(|| ProviderError::NotFound(request_id.to_string()))?;

        fleet.state = FleetState::Cancelled;
        let owned = fleet.owned.clone();
        for id in &owned {
            if let Some(inst) = state.instances.get_mut(id) {
                inst.observe(InstanceState::Terminated, None);
            }
        }
        Ok(CancelAck {
            request_id: request_id.to_string(),
            state: FleetState::Cancelled,
            terminated: owned,
        })
    }
}
