//! Timestep orchestration: admission and bounded clock advancement.

use std::collections::HashMap;

use itertools::Itertools;

use simcore::{log_debug, log_info, EventId, Id, Simulation};

use crate::core::admission::AdmissionController;
use crate::core::components::CloudComponents;
use crate::core::config::{SimulationSettings, MIN_TIME_BETWEEN_EVENTS};
use crate::core::events::CloudEvent;
use crate::error::{Error, Result};

/// Period (in simulated time) of duplicate keep-alive cleanup.
const CLEANUP_PERIOD: f64 = 100.;
/// Upper bound on kernel runs within a single timestep.
const MAX_RUNS_PER_TIMESTEP: usize = 10000;

/// Advances the simulation by timesteps.
///
/// Each timestep starts with admission of jobs due by the end of the step. The kernel is then run until its clock
/// reaches the end of the step. While unfinished jobs remain, a keep-alive event guarantees that the kernel does
/// not run out of events before that.
pub struct TimestepOrchestrator {
    id: Id,
    admission: Box<dyn AdmissionController>,
    keep_created_job_list: bool,
    job_stats_period: u64,
    iterations: u64,
    last_cleanup: f64,
}

impl TimestepOrchestrator {
    pub fn new(id: Id, admission: Box<dyn AdmissionController>, settings: &SimulationSettings) -> Self {
        Self {
            id,
            admission,
            keep_created_job_list: settings.keep_created_job_list,
            job_stats_period: settings.job_stats_period.max(1),
            iterations: 0,
            last_cleanup: 0.,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Number of timesteps performed.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Advances the simulation by the given interval and returns the resulting clock.
    pub fn advance(
        &mut self,
        interval: f64,
        sim: &mut Simulation<CloudEvent>,
        components: &mut CloudComponents,
    ) -> Result<f64> {
        let clock = sim.time();
        let target = clock + interval;

        let admitted = self
            .admission
            .admit(target, clock, &mut components.ledger, &components.datacenter);
        let broker_id = components.broker.id();
        let mut ctx = sim.context(self.id);
        for admission in admitted.iter() {
            ctx.emit(
                CloudEvent::JobArrival {
                    job_id: admission.job_id,
                },
                broker_id,
                admission.delay,
            );
        }
        if !admitted.is_empty() {
            log_debug!(ctx, "admitted {} jobs", admitted.len());
        }
        self.keep_alive(target, sim, components);

        let mut duration = target - sim.time();
        let mut runs = 0;
        while sim.run_for(duration, components) < target {
            if !sim.is_running() {
                break;
            }
            runs += 1;
            if runs >= MAX_RUNS_PER_TIMESTEP {
                return Err(Error::ClockStalled {
                    target,
                    clock: sim.time(),
                });
            }
            duration = target - sim.time();
            if duration <= 0. {
                duration = MIN_TIME_BETWEEN_EVENTS;
            }
        }

        if !self.keep_created_job_list {
            components.broker.clear_created();
        }
        if sim.time() - self.last_cleanup >= CLEANUP_PERIOD {
            self.last_cleanup = sim.time();
            self.cancel_duplicate_keep_alives(sim);
        }
        self.iterations += 1;
        if self.iterations % self.job_stats_period == 0 {
            self.log_job_stats(sim, components);
        }
        Ok(sim.time())
    }

    /// Emits a keep-alive event at the target time if unfinished jobs remain and nothing else is scheduled by then.
    fn keep_alive(&self, target: f64, sim: &mut Simulation<CloudEvent>, components: &CloudComponents) {
        if components.ledger.all_finished() {
            return;
        }
        if sim.pending_events().any(|event| event.time >= target) {
            return;
        }
        let delay = (target - sim.time()).max(0.);
        let datacenter_id = components.datacenter.id();
        sim.context(self.id).emit(CloudEvent::KeepAlive, datacenter_id, delay);
    }

    /// Cancels keep-alive events scheduled at the same instant, keeping the earliest created one.
    fn cancel_duplicate_keep_alives(&self, sim: &mut Simulation<CloudEvent>) {
        let mut kept: HashMap<u64, EventId> = HashMap::new();
        let mut duplicates = Vec::new();
        for event in sim.pending_events().filter(|event| event.data == CloudEvent::KeepAlive) {
            match kept.get_mut(&event.time.to_bits()) {
                Some(id) => {
                    duplicates.push((*id).max(event.id));
                    *id = (*id).min(event.id);
                }
                None => {
                    kept.insert(event.time.to_bits(), event.id);
                }
            }
        }
        for id in duplicates.iter() {
            sim.cancel_event(*id);
        }
        if !duplicates.is_empty() {
            let ctx = sim.context(self.id);
            log_debug!(ctx, "canceled {} duplicate keep-alive events", duplicates.len());
        }
    }

    /// Logs the number of jobs per status.
    pub fn log_job_stats(&self, sim: &mut Simulation<CloudEvent>, components: &CloudComponents) {
        let stats = components
            .ledger
            .status_histogram()
            .into_iter()
            .map(|(status, count)| format!("{}: {}", status, count))
            .join(", ");
        let ctx = sim.context(self.id);
        log_info!(
            ctx,
            "jobs after {} iterations: {} (waiting in broker: {})",
            self.iterations,
            stats,
            components.broker.waiting_count()
        );
    }
}
