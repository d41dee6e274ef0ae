//! Kernel-backed simulation of a single datacenter.

use simcore::{log_warn, Simulation};

use crate::core::admission::{AdmissionController, CapacityAdmission};
use crate::core::broker::Broker;
use crate::core::common::AllocationVerdict;
use crate::core::components::CloudComponents;
use crate::core::config::{SimulationSettings, MIN_TIME_BETWEEN_EVENTS};
use crate::core::datacenter::Datacenter;
use crate::core::events::CloudEvent;
use crate::core::job::JobDescriptor;
use crate::core::job_ledger::JobLedger;
use crate::core::orchestrator::TimestepOrchestrator;
use crate::core::placement::{PlacementPolicy, StickyNextFit};
use crate::core::vm::VmSize;
use crate::core::vm_lifecycle::VmLifecycleManager;
use crate::error::Result;

/// Delay after a job's nominal arrival at which its keep-alive event fires.
const JOB_KEEP_ALIVE_DELAY: f64 = 1.0;

/// Datacenter simulation advanced by timesteps.
///
/// Owns the kernel together with all components. Construction creates the initial VM fleet and runs the kernel
/// until these VMs are started, so jobs can be placed from the first timestep on.
pub struct CloudSimulation {
    sim: Simulation<CloudEvent>,
    components: CloudComponents,
    lifecycle: VmLifecycleManager,
    orchestrator: TimestepOrchestrator,
    settings: SimulationSettings,
}

impl CloudSimulation {
    /// Creates simulation of already ingested jobs with the sticky next-fit placement and capacity-based admission.
    pub fn new(settings: SimulationSettings, jobs: &[JobDescriptor]) -> Self {
        Self::with_strategies(
            settings,
            jobs,
            Box::new(StickyNextFit::new()),
            Box::new(CapacityAdmission::new()),
        )
    }

    pub fn with_strategies(
        settings: SimulationSettings,
        jobs: &[JobDescriptor],
        policy: Box<dyn PlacementPolicy>,
        admission: Box<dyn AdmissionController>,
    ) -> Self {
        let mut sim = Simulation::new();
        let datacenter_id = sim.register("datacenter");
        let broker_id = sim.register("broker");
        let orchestrator_id = sim.register("orchestrator");

        let components = CloudComponents {
            datacenter: Datacenter::new(datacenter_id, broker_id, &settings),
            broker: Broker::new(broker_id, datacenter_id, policy),
            ledger: JobLedger::new(jobs),
        };
        let mut simulation = Self {
            sim,
            components,
            lifecycle: VmLifecycleManager::new(&settings),
            orchestrator: TimestepOrchestrator::new(orchestrator_id, admission, &settings),
            settings,
        };

        let mut ctx = simulation.sim.context(orchestrator_id);
        for job in simulation.components.ledger.jobs() {
            ctx.emit(
                CloudEvent::KeepAlive,
                datacenter_id,
                job.submission_delay + JOB_KEEP_ALIVE_DELAY,
            );
        }
        simulation.create_initial_vms();
        simulation
            .sim
            .run_for(MIN_TIME_BETWEEN_EVENTS, &mut simulation.components);
        simulation
    }

    fn create_initial_vms(&mut self) {
        let counts = [
            (VmSize::Small, self.settings.initial_s_vm_count),
            (VmSize::Medium, self.settings.initial_m_vm_count),
            (VmSize::Large, self.settings.initial_l_vm_count),
        ];
        for (size, count) in counts {
            for _ in 0..count {
                let created =
                    self.lifecycle
                        .create_vm_first_fit(size, &mut self.components.datacenter, &mut self.sim);
                if created.is_none() {
                    let ctx = self.sim.context(self.components.datacenter.id());
                    log_warn!(ctx, "no host can take initial vm of size {}", size);
                }
            }
        }
    }

    /// Current simulation time.
    pub fn clock(&self) -> f64 {
        self.sim.time()
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Creates a VM of the given size on the given host.
    pub fn create_vm(&mut self, size: VmSize, host_id: u32) -> std::result::Result<u32, AllocationVerdict> {
        self.lifecycle
            .create_vm(size, host_id, &mut self.components.datacenter, &mut self.sim)
    }

    /// Destroys the running VM at the given index, returns the number of jobs returned to pending.
    pub fn destroy_vm(&mut self, index: usize) -> Option<usize> {
        self.lifecycle.destroy_vm(
            index,
            &mut self.components.datacenter,
            &mut self.components.ledger,
            &mut self.sim,
        )
    }

    /// Forces the job to be placed on the given VM.
    pub fn bind_job(&mut self, job_id: u64, vm_id: u32) {
        self.components.ledger.bind(job_id, vm_id);
    }

    /// Advances the simulation by one timestep of the given length, returns the new clock.
    pub fn advance(&mut self, interval: f64) -> Result<f64> {
        self.orchestrator
            .advance(interval, &mut self.sim, &mut self.components)
    }

    /// Returns `true` while some jobs are not finished.
    pub fn is_running(&self) -> bool {
        !self.components.ledger.all_finished()
    }

    pub fn datacenter(&self) -> &Datacenter {
        &self.components.datacenter
    }

    pub fn broker(&self) -> &Broker {
        &self.components.broker
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.components.ledger
    }

    /// Returns wait times of jobs started since the previous call.
    pub fn take_wait_times(&mut self) -> Vec<f64> {
        self.components.ledger.take_wait_times()
    }

    pub fn lifecycle(&self) -> &VmLifecycleManager {
        &self.lifecycle
    }

    /// Cost of one iteration at the current time.
    pub fn running_cost(&mut self) -> f64 {
        let time = self.sim.time();
        self.lifecycle.running_cost(time)
    }

    pub fn log_job_stats(&mut self) {
        self.orchestrator.log_job_stats(&mut self.sim, &self.components);
    }
}
