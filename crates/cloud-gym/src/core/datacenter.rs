//! Datacenter: hosts, VMs and job execution driven by the simulation kernel.

use std::collections::{BTreeMap, HashMap};

use simcore::{log_debug, log_trace, log_warn, EventId, Id, SimulationContext, EPSILON};

use crate::core::common::AllocationVerdict;
use crate::core::config::{SimulationSettings, MIN_TIME_BETWEEN_EVENTS};
use crate::core::events::CloudEvent;
use crate::core::host::Host;
use crate::core::job_ledger::JobLedger;
use crate::core::job_scheduler::JobScheduler;
use crate::core::placement::VmCandidate;
use crate::core::vm::{VirtualMachine, VmStatus};

/// Physical side of the simulation: host capacity bookkeeping and per-VM job execution.
pub struct Datacenter {
    id: Id,
    broker_id: Id,
    hosts: Vec<Host>,
    vms: BTreeMap<u32, VirtualMachine>,
    schedulers: BTreeMap<u32, JobScheduler>,
    scheduled_updates: HashMap<u32, (f64, EventId)>,
}

impl Datacenter {
    pub fn new(id: Id, broker_id: Id, settings: &SimulationSettings) -> Self {
        Self {
            id,
            broker_id,
            hosts: (0..settings.hosts_count).map(|i| Host::new(i, settings)).collect(),
            vms: BTreeMap::new(),
            schedulers: BTreeMap::new(),
            scheduled_updates: HashMap::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(host_id as usize)
    }

    /// Checks whether the VM fits on the host.
    pub fn can_place(&self, vm: &VirtualMachine, host_id: u32) -> AllocationVerdict {
        match self.host(host_id) {
            Some(host) => host.can_host(&vm.spec),
            None => AllocationVerdict::HostNotFound,
        }
    }

    /// Places the VM on the host if it fits.
    pub fn place_vm(&mut self, vm: VirtualMachine, host_id: u32, time: f64) -> AllocationVerdict {
        let verdict = self.can_place(&vm, host_id);
        if verdict == AllocationVerdict::Success {
            let mips = self.hosts[host_id as usize].mips;
            self.hosts[host_id as usize].allocate(vm.id, &vm.spec);
            self.schedulers
                .insert(vm.id, JobScheduler::new(vm.spec.cores, mips, time));
            self.vms.insert(vm.id, vm);
        }
        verdict
    }

    /// Removes the VM from its host and returns it together with IDs of all jobs assigned to it.
    pub fn remove_vm(&mut self, vm_id: u32) -> Option<(VirtualMachine, Vec<u64>)> {
        let mut vm = self.vms.remove(&vm_id)?;
        if let Some(host_id) = vm.host_id.take() {
            self.hosts[host_id as usize].release(vm_id, &vm.spec);
        }
        vm.status = VmStatus::Destroyed;
        let jobs = self
            .schedulers
            .remove(&vm_id)
            .map(|mut scheduler| scheduler.clear())
            .unwrap_or_default();
        self.scheduled_updates.remove(&vm_id);
        Some((vm, jobs))
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    /// Iterates over existing (starting or running) VMs in ascending ID order.
    pub fn vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.values()
    }

    /// Iterates over running VMs in ascending ID order.
    pub fn running_vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.values().filter(|vm| vm.is_running())
    }

    pub fn scheduler(&self, vm_id: u32) -> Option<&JobScheduler> {
        self.schedulers.get(&vm_id)
    }

    /// Running VMs with their expected free cores, in ascending ID order.
    pub fn placement_candidates(&self) -> Vec<VmCandidate> {
        self.running_vms()
            .filter_map(|vm| {
                self.schedulers.get(&vm.id).map(|scheduler| VmCandidate {
                    vm_id: vm.id,
                    free_cores: scheduler.expected_free_cores(),
                })
            })
            .collect()
    }

    /// Reserves VM cores for a job placed by the broker.
    pub fn reserve(&mut self, vm_id: u32, job_id: u64, cores: u32, work_length: u64) -> bool {
        match self.schedulers.get_mut(&vm_id) {
            Some(scheduler) => {
                scheduler.reserve(job_id, cores, work_length);
                true
            }
            None => false,
        }
    }

    /// Total cores of all existing VMs.
    pub fn allocated_cores(&self) -> u64 {
        self.vms.values().map(|vm| vm.spec.cores as u64).sum()
    }

    /// Total cores of running VMs.
    pub fn running_vm_cores(&self) -> u64 {
        self.running_vms().map(|vm| vm.spec.cores as u64).sum()
    }

    /// Cores of running VMs not used by running jobs.
    pub fn free_running_vm_cores(&self) -> u64 {
        self.running_vms()
            .filter_map(|vm| self.schedulers.get(&vm.id))
            .map(|scheduler| scheduler.free_cores() as u64)
            .sum()
    }

    // Event handlers ------------------------------------------------------------------------------

    pub(crate) fn on_vm_started(&mut self, vm_id: u32, ctx: &mut SimulationContext<'_, CloudEvent>) {
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.status = VmStatus::Running;
            vm.started_at = Some(ctx.time());
            log_debug!(ctx, "vm {} ({}) started on host {:?}", vm_id, vm.size, vm.host_id);
            ctx.emit_now(CloudEvent::VmCreated { vm_id }, self.broker_id);
        }
    }

    pub(crate) fn on_job_submit(
        &mut self,
        job_id: u64,
        vm_id: u32,
        ledger: &mut JobLedger,
        ctx: &mut SimulationContext<'_, CloudEvent>,
    ) {
        let accepted = self
            .schedulers
            .get_mut(&vm_id)
            .map(|scheduler| scheduler.submit(job_id, ctx.time()))
            .unwrap_or(false);
        if accepted {
            self.process(vm_id, ledger, ctx);
        } else {
            log_warn!(ctx, "job {} arrived at missing vm {}, returning it to broker", job_id, vm_id);
            ledger.unassign(job_id);
            ctx.emit_now(CloudEvent::JobArrival { job_id }, self.broker_id);
        }
    }

    pub(crate) fn on_update_processing(
        &mut self,
        vm_id: u32,
        event_id: EventId,
        ledger: &mut JobLedger,
        ctx: &mut SimulationContext<'_, CloudEvent>,
    ) {
        if matches!(self.scheduled_updates.get(&vm_id), Some((_, id)) if *id == event_id) {
            self.scheduled_updates.remove(&vm_id);
        }
        if self.schedulers.contains_key(&vm_id) {
            self.process(vm_id, ledger, ctx);
        }
    }

    fn process(&mut self, vm_id: u32, ledger: &mut JobLedger, ctx: &mut SimulationContext<'_, CloudEvent>) {
        let time = ctx.time();
        let Some(scheduler) = self.schedulers.get_mut(&vm_id) else {
            return;
        };
        let outcome = scheduler.update(time);
        let next_completion = scheduler.next_completion_time();
        for job_id in outcome.finished {
            log_trace!(ctx, "job {} finished on vm {}", job_id, vm_id);
            ledger.record_completion(job_id, time);
            ctx.emit(CloudEvent::JobReturn { job_id, vm_id }, self.broker_id, MIN_TIME_BETWEEN_EVENTS);
        }
        for job_id in outcome.started {
            log_trace!(ctx, "job {} started on vm {}", job_id, vm_id);
            ledger.mark_running(job_id, time);
        }
        if let Some(next_time) = next_completion {
            self.schedule_update(vm_id, next_time, ctx);
        }
    }

    /// Keeps at most one pending processing update per VM, at its nearest job completion.
    fn schedule_update(&mut self, vm_id: u32, time: f64, ctx: &mut SimulationContext<'_, CloudEvent>) {
        if let Some((scheduled_time, event_id)) = self.scheduled_updates.get(&vm_id).copied() {
            if (scheduled_time - time).abs() < EPSILON {
                return;
            }
            ctx.cancel_event(event_id);
        }
        let delay = (time - ctx.time()).max(0.);
        let event_id = ctx.emit_self(CloudEvent::UpdateProcessing { vm_id }, delay);
        self.scheduled_updates.insert(vm_id, (time, event_id));
    }
}
