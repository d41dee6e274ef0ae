//! Broker: places submitted jobs onto running VMs.

use std::collections::VecDeque;

use serde::Serialize;

use simcore::{log_debug, Id, SimulationContext};

use crate::core::config::MIN_TIME_BETWEEN_EVENTS;
use crate::core::datacenter::Datacenter;
use crate::core::events::CloudEvent;
use crate::core::job_ledger::JobLedger;
use crate::core::placement::PlacementPolicy;

/// Record of a placement decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementRecord {
    pub job_id: u64,
    pub vm_id: u32,
    pub time: f64,
}

/// Receives admitted jobs, asks the placement policy for a VM and forwards jobs to the datacenter.
///
/// Jobs for which no VM is found wait in the broker queue and are retried whenever a VM is created or a job
/// completes.
pub struct Broker {
    id: Id,
    datacenter_id: Id,
    policy: Box<dyn PlacementPolicy>,
    waiting: VecDeque<u64>,
    created: Vec<PlacementRecord>,
}

impl Broker {
    pub fn new(id: Id, datacenter_id: Id, policy: Box<dyn PlacementPolicy>) -> Self {
        Self {
            id,
            datacenter_id,
            policy,
            waiting: VecDeque::new(),
            created: Vec::new(),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Number of jobs waiting in the broker for a suitable VM.
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Placement history since the last pruning.
    pub fn created(&self) -> &[PlacementRecord] {
        &self.created
    }

    pub fn clear_created(&mut self) {
        self.created.clear();
    }

    fn try_place(
        &mut self,
        job_id: u64,
        ledger: &mut JobLedger,
        datacenter: &mut Datacenter,
        ctx: &mut SimulationContext<'_, CloudEvent>,
    ) -> bool {
        let Some(job) = ledger.job(job_id) else {
            return true;
        };
        let candidates = datacenter.placement_candidates();
        match self.policy.select_vm(job, &candidates) {
            Some(vm_id) => {
                let (cores, work_length) = (job.cores, job.work_length);
                if !datacenter.reserve(vm_id, job_id, cores, work_length) {
                    return false;
                }
                ledger.assign(job_id, vm_id);
                ctx.emit(
                    CloudEvent::JobSubmit { job_id, vm_id },
                    self.datacenter_id,
                    MIN_TIME_BETWEEN_EVENTS,
                );
                self.created.push(PlacementRecord {
                    job_id,
                    vm_id,
                    time: ctx.time(),
                });
                true
            }
            None => false,
        }
    }

    fn retry_waiting(
        &mut self,
        ledger: &mut JobLedger,
        datacenter: &mut Datacenter,
        ctx: &mut SimulationContext<'_, CloudEvent>,
    ) {
        for _ in 0..self.waiting.len() {
            if let Some(job_id) = self.waiting.pop_front() {
                if !self.try_place(job_id, ledger, datacenter, ctx) {
                    self.waiting.push_back(job_id);
                }
            }
        }
    }

    // Event handlers ------------------------------------------------------------------------------

    pub(crate) fn on_job_arrival(
        &mut self,
        job_id: u64,
        ledger: &mut JobLedger,
        datacenter: &mut Datacenter,
        ctx: &mut SimulationContext<'_, CloudEvent>,
    ) {
        if !self.try_place(job_id, ledger, datacenter, ctx) {
            log_debug!(ctx, "no vm for job {}, waiting", job_id);
            self.waiting.push_back(job_id);
        }
    }

    pub(crate) fn on_vm_created(
        &mut self,
        ledger: &mut JobLedger,
        datacenter: &mut Datacenter,
        ctx: &mut SimulationContext<'_, CloudEvent>,
    ) {
        self.retry_waiting(ledger, datacenter, ctx);
    }

    pub(crate) fn on_job_return(
        &mut self,
        job_id: u64,
        ledger: &mut JobLedger,
        datacenter: &mut Datacenter,
        ctx: &mut SimulationContext<'_, CloudEvent>,
    ) {
        ledger.mark_finished(job_id, ctx.time());
        self.retry_waiting(ledger, datacenter, ctx);
    }
}
