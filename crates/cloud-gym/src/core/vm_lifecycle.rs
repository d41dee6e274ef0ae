//! VM lifecycle: creation and destruction of VMs requested by the agent.

use simcore::{log_debug, log_info, Simulation};

use crate::core::common::AllocationVerdict;
use crate::core::config::SimulationSettings;
use crate::core::cost::CostLedger;
use crate::core::datacenter::Datacenter;
use crate::core::events::CloudEvent;
use crate::core::job_ledger::JobLedger;
use crate::core::vm::{VirtualMachine, VmSize, VmSpec};
use crate::core::vm_counter::VmCounter;

/// Creates and destroys VMs, keeping the cost ledger and per-size counters in sync with the datacenter.
///
/// VM identifiers grow monotonically and are never reused within an episode.
pub struct VmLifecycleManager {
    next_vm_id: u32,
    startup_delay: f64,
    shutdown_delay: f64,
    settings: SimulationSettings,
    cost: CostLedger,
    counter: VmCounter,
}

impl VmLifecycleManager {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            next_vm_id: 0,
            startup_delay: settings.vm_startup_delay.max(0.),
            shutdown_delay: settings.vm_shutdown_delay.max(0.),
            settings: settings.clone(),
            cost: CostLedger::new(
                settings.vm_hourly_cost,
                settings.simulation_speedup,
                settings.paying_for_the_full_hour,
            ),
            counter: VmCounter::new(),
        }
    }

    pub fn cost(&self) -> &CostLedger {
        &self.cost
    }

    pub fn counter(&self) -> &VmCounter {
        &self.counter
    }

    /// Creates a VM of the given size on the given host.
    ///
    /// Returns the ID of the new VM, or the verdict explaining why the host can't take it. A failed creation does
    /// not change any state. The VM becomes schedulable after the startup delay.
    pub fn create_vm(
        &mut self,
        size: VmSize,
        host_id: u32,
        datacenter: &mut Datacenter,
        sim: &mut Simulation<CloudEvent>,
    ) -> Result<u32, AllocationVerdict> {
        let time = sim.time();
        let spec = VmSpec::for_size(size, &self.settings);
        let vm = VirtualMachine::new(self.next_vm_id, size, spec, host_id, time);
        let verdict = datacenter.place_vm(vm, host_id, time);
        if verdict != AllocationVerdict::Success {
            return Err(verdict);
        }
        let vm_id = self.next_vm_id;
        self.next_vm_id += 1;
        self.cost.add_vm(vm_id, self.settings.size_multiplier(size), time);
        self.counter.record_new_vm(size);

        let mut ctx = sim.context(datacenter.id());
        ctx.emit_self(CloudEvent::VmStarted { vm_id }, self.startup_delay);
        log_debug!(ctx, "created vm {} ({}) on host {}", vm_id, size, host_id);
        Ok(vm_id)
    }

    /// Creates a VM of the given size on the first host which can take it.
    pub fn create_vm_first_fit(
        &mut self,
        size: VmSize,
        datacenter: &mut Datacenter,
        sim: &mut Simulation<CloudEvent>,
    ) -> Option<u32> {
        let spec = VmSpec::for_size(size, &self.settings);
        let host_id = datacenter
            .hosts()
            .iter()
            .find(|host| host.can_host(&spec) == AllocationVerdict::Success)
            .map(|host| host.id)?;
        self.create_vm(size, host_id, datacenter, sim).ok()
    }

    /// Destroys the running VM at the given position in the list of running VMs ordered by ID.
    ///
    /// Every job running, waiting or on its way to the VM goes back to the pending queue with zero delay. Returns
    /// the number of rescued jobs, or `None` if the index is out of range.
    pub fn destroy_vm(
        &mut self,
        index: usize,
        datacenter: &mut Datacenter,
        ledger: &mut JobLedger,
        sim: &mut Simulation<CloudEvent>,
    ) -> Option<usize> {
        let vm_id = datacenter.running_vms().nth(index)?.id;
        let (vm, jobs) = datacenter.remove_vm(vm_id)?;
        sim.cancel_events(|event| match event.data {
            CloudEvent::JobSubmit { vm_id: id, .. } | CloudEvent::UpdateProcessing { vm_id: id } => id == vm_id,
            CloudEvent::VmStarted { vm_id: id } => id == vm_id,
            _ => false,
        });
        for job_id in jobs.iter() {
            ledger.return_to_pending(*job_id);
        }
        let time = sim.time();
        self.cost.stop_vm(vm_id, time + self.shutdown_delay);
        self.counter.record_removed_vm(vm.size);

        let ctx = sim.context(datacenter.id());
        log_info!(
            ctx,
            "destroyed vm {} ({}), {} jobs returned to pending",
            vm_id,
            vm.size,
            jobs.len()
        );
        Some(jobs.len())
    }

    /// Cost of one iteration at the current time.
    pub fn running_cost(&mut self, time: f64) -> f64 {
        self.cost.running_cost(time)
    }
}
