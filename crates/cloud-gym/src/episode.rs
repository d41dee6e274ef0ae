//! Episode control of a single session.

use serde::Serialize;
use serde_json::json;

use crate::core::config::SimulationSettings;
use crate::core::history::EpisodeHistory;
use crate::core::job::{ingest_jobs, JobDescriptor};
use crate::core::metrics::{to_dot, tree_array, MetricsStorage, ObservationEncoder};
use crate::core::reward::{unutilized_vm_core_ratio, Reward, RewardCalculator};
use crate::core::vm::VmSize;
use crate::error::{Error, Result};
use crate::simulation::CloudSimulation;

/// State of an episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EpisodeState {
    Uninitialized,
    Ready,
    Stepping,
    Terminated,
}

/// Decoded agent action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Noop,
    CreateVm { host_id: i64, size_index: i64 },
    DestroyVm { index: i64 },
    Unknown(i64),
}

impl Action {
    /// Decodes `[action type, host id, VM index, VM type index]`, missing values are zeros.
    pub fn from_slice(action: &[i64]) -> Self {
        let value = |i: usize| action.get(i).copied().unwrap_or(0);
        match value(0) {
            0 => Action::Noop,
            1 => Action::CreateVm {
                host_id: value(1),
                size_index: value(3),
            },
            2 => Action::DestroyVm { index: value(2) },
            code => Action::Unknown(code),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Action::Noop => 0,
            Action::CreateVm { .. } => 1,
            Action::DestroyVm { .. } => 2,
            Action::Unknown(code) => *code,
        }
    }
}

/// Diagnostic information returned with every observation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StepInfo {
    pub job_wait_reward: f64,
    pub running_vm_cores_reward: f64,
    pub unutilized_vm_cores_reward: f64,
    pub invalid_reward: f64,
    pub is_valid: bool,
    pub host_metrics: Vec<Vec<f64>>,
    pub vm_metrics: Vec<Vec<f64>>,
    pub job_metrics: Vec<Vec<f64>>,
    /// Wait times of jobs which started running during the step.
    pub job_wait_time: Vec<f64>,
    pub unutilized_vm_core_ratio: f64,
    pub dot_string: String,
    pub peak_waiting_jobs: usize,
    pub peak_running_vms: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepResult {
    pub observation: Vec<Vec<f64>>,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResetResult {
    pub observation: Vec<Vec<f64>>,
    pub info: StepInfo,
}

/// Single simulation session driven by an agent through reset and step calls.
pub struct Episode {
    id: String,
    settings: SimulationSettings,
    jobs: Vec<JobDescriptor>,
    state: EpisodeState,
    simulation: Option<CloudSimulation>,
    encoder: ObservationEncoder,
    rewards: RewardCalculator,
    history: EpisodeHistory,
    steps: u64,
    peak_waiting_jobs: usize,
    peak_running_vms: usize,
}

impl Episode {
    /// Creates an uninitialized episode, jobs are ingested according to the settings.
    pub fn new(id: &str, settings: SimulationSettings, jobs: &[JobDescriptor]) -> Self {
        Self {
            id: id.to_string(),
            jobs: ingest_jobs(jobs, &settings),
            state: EpisodeState::Uninitialized,
            simulation: None,
            encoder: ObservationEncoder::new(&settings),
            rewards: RewardCalculator::new(&settings),
            history: EpisodeHistory::new(),
            steps: 0,
            peak_waiting_jobs: 0,
            peak_running_vms: 0,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Jobs after ingestion.
    pub fn jobs(&self) -> &[JobDescriptor] {
        &self.jobs
    }

    /// Number of steps performed in the current episode.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn simulation(&self) -> Option<&CloudSimulation> {
        self.simulation.as_ref()
    }

    pub fn metrics(&self) -> &MetricsStorage {
        self.encoder.storage()
    }

    pub fn history(&self) -> &EpisodeHistory {
        &self.history
    }

    /// Rebuilds the simulation from the initial jobs and returns the initial observation.
    ///
    /// The seed is accepted for interface compatibility, the simulation is deterministic.
    pub fn reset(&mut self, seed: u64) -> ResetResult {
        log::info!("{}: reset (seed {})", self.id, seed);
        let simulation = CloudSimulation::new(self.settings.clone(), &self.jobs);
        self.encoder.clear();
        self.history.reset();
        self.steps = 0;
        self.peak_waiting_jobs = 0;
        self.peak_running_vms = 0;
        self.encoder
            .sample(simulation.datacenter(), simulation.ledger(), simulation.clock());
        let info = self.info(&simulation, &Reward::default(), true, Vec::new());
        self.simulation = Some(simulation);
        self.state = EpisodeState::Ready;
        ResetResult {
            observation: self.encoder.observation(),
            info,
        }
    }

    /// Applies the action, advances the simulation by one timestep and returns the new observation.
    pub fn step(&mut self, action: &[i64]) -> Result<StepResult> {
        match self.state {
            EpisodeState::Uninitialized => return Err(Error::NotReset(self.id.clone())),
            EpisodeState::Terminated => return Err(Error::EpisodeOver(self.id.clone())),
            EpisodeState::Ready | EpisodeState::Stepping => {}
        }
        let Some(simulation) = self.simulation.as_mut() else {
            return Err(Error::NotReset(self.id.clone()));
        };

        let action = Action::from_slice(action);
        let is_valid = apply_action(&self.id, simulation, action);
        simulation.advance(self.settings.timestep_interval)?;
        self.steps += 1;

        self.encoder
            .sample(simulation.datacenter(), simulation.ledger(), simulation.clock());
        let reward = self
            .rewards
            .compute(simulation.datacenter(), simulation.ledger(), is_valid);
        let wait_times = simulation.take_wait_times();
        self.peak_waiting_jobs = self.peak_waiting_jobs.max(simulation.ledger().waiting_count());
        self.peak_running_vms = self
            .peak_running_vms
            .max(simulation.datacenter().running_vms().count());
        let running_cost = simulation.running_cost();

        let counter = simulation.lifecycle().counter();
        self.history.record("action", action.code() as f64);
        self.history.record("reward", reward.total);
        self.history.record("running_cost", running_cost);
        self.history.record("small_vms", counter.started_vms(VmSize::Small) as f64);
        self.history.record("medium_vms", counter.started_vms(VmSize::Medium) as f64);
        self.history.record("large_vms", counter.started_vms(VmSize::Large) as f64);
        self.history.record("job_wait_reward", reward.job_wait);
        self.history.record("running_vm_cores_reward", reward.running_vm_cores);
        self.history.record("unutilized_vm_cores_reward", reward.unutilized_vm_cores);
        self.history.record("invalid_reward", reward.invalid);

        let terminated = !simulation.is_running();
        let truncated = self.steps >= self.settings.max_episode_length;
        if terminated || truncated {
            log::info!(
                "{}: episode over after {} steps at {:.3} (terminated: {}, truncated: {})",
                self.id,
                self.steps,
                simulation.clock(),
                terminated,
                truncated
            );
            simulation.log_job_stats();
            self.history.log_history(&self.id);
            self.history.reset();
            self.state = EpisodeState::Terminated;
        } else {
            self.state = EpisodeState::Stepping;
        }

        let Some(simulation) = self.simulation.as_ref() else {
            return Err(Error::NotReset(self.id.clone()));
        };
        Ok(StepResult {
            observation: self.encoder.observation(),
            reward: reward.total,
            terminated,
            truncated,
            info: self.info(simulation, &reward, is_valid, wait_times),
        })
    }

    fn info(&self, simulation: &CloudSimulation, reward: &Reward, is_valid: bool, wait_times: Vec<f64>) -> StepInfo {
        let metrics = self.encoder.storage();
        StepInfo {
            job_wait_reward: reward.job_wait,
            running_vm_cores_reward: reward.running_vm_cores,
            unutilized_vm_cores_reward: reward.unutilized_vm_cores,
            invalid_reward: reward.invalid,
            is_valid,
            host_metrics: metrics.hosts.clone(),
            vm_metrics: metrics.vms.clone(),
            job_metrics: metrics.jobs.clone(),
            job_wait_time: wait_times,
            unutilized_vm_core_ratio: unutilized_vm_core_ratio(simulation.datacenter()),
            dot_string: to_dot(&tree_array(simulation.datacenter())),
            peak_waiting_jobs: self.peak_waiting_jobs,
            peak_running_vms: self.peak_running_vms,
        }
    }

    /// Returns a JSON document with the clock, the last datacenter metrics and the tree encoding.
    pub fn render(&self) -> Result<String> {
        let simulation = self.simulation.as_ref().ok_or_else(|| Error::NotReset(self.id.clone()))?;
        let document = json!({
            "clock": simulation.clock(),
            "datacenter_metrics": self.encoder.storage().datacenter,
            "tree": tree_array(simulation.datacenter()),
        });
        Ok(document.to_string())
    }

    /// Current simulation time, zero before the first reset.
    pub fn clock(&self) -> f64 {
        self.simulation.as_ref().map(|simulation| simulation.clock()).unwrap_or(0.)
    }

    /// Releases the simulation.
    pub fn close(&mut self) {
        self.simulation = None;
        self.state = EpisodeState::Uninitialized;
        log::info!("{}: closed", self.id);
    }
}

/// Applies the action to the simulation, returns whether it was valid.
fn apply_action(session_id: &str, simulation: &mut CloudSimulation, action: Action) -> bool {
    match action {
        Action::Noop => true,
        Action::CreateVm { host_id, size_index } => {
            let Some(size) = VmSize::from_index(size_index) else {
                log::debug!("{}: invalid vm type index {}", session_id, size_index);
                return false;
            };
            let Ok(host_id) = u32::try_from(host_id) else {
                log::debug!("{}: invalid host id {}", session_id, host_id);
                return false;
            };
            match simulation.create_vm(size, host_id) {
                Ok(_) => true,
                Err(verdict) => {
                    log::debug!(
                        "{}: can't create vm of size {} on host {}: {:?}",
                        session_id,
                        size,
                        host_id,
                        verdict
                    );
                    false
                }
            }
        }
        Action::DestroyVm { index } => {
            let destroyed = usize::try_from(index)
                .ok()
                .and_then(|index| simulation.destroy_vm(index));
            if destroyed.is_none() {
                log::debug!("{}: no running vm with index {}", session_id, index);
            }
            destroyed.is_some()
        }
        Action::Unknown(code) => {
            log::debug!("{}: unknown action type {}", session_id, code);
            false
        }
    }
}
