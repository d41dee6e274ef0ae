//! Components receiving kernel events.

use simcore::{log_trace, Event, EventHandler, SimulationContext};

use crate::core::broker::Broker;
use crate::core::datacenter::Datacenter;
use crate::core::events::CloudEvent;
use crate::core::job_ledger::JobLedger;

/// State touched by event processing: the datacenter, the broker and the job ledger.
///
/// Passed to the kernel as the event handler, so that every event mutates it without shared ownership.
pub struct CloudComponents {
    pub datacenter: Datacenter,
    pub broker: Broker,
    pub ledger: JobLedger,
}

impl EventHandler<CloudEvent> for CloudComponents {
    fn on(&mut self, event: Event<CloudEvent>, ctx: &mut SimulationContext<'_, CloudEvent>) {
        match event.data {
            CloudEvent::JobArrival { job_id } => {
                self.broker
                    .on_job_arrival(job_id, &mut self.ledger, &mut self.datacenter, ctx);
            }
            CloudEvent::VmCreated { .. } => {
                self.broker.on_vm_created(&mut self.ledger, &mut self.datacenter, ctx);
            }
            CloudEvent::JobReturn { job_id, .. } => {
                self.broker
                    .on_job_return(job_id, &mut self.ledger, &mut self.datacenter, ctx);
            }
            CloudEvent::JobSubmit { job_id, vm_id } => {
                self.datacenter.on_job_submit(job_id, vm_id, &mut self.ledger, ctx);
            }
            CloudEvent::VmStarted { vm_id } => {
                self.datacenter.on_vm_started(vm_id, ctx);
            }
            CloudEvent::UpdateProcessing { vm_id } => {
                self.datacenter
                    .on_update_processing(vm_id, event.id, &mut self.ledger, ctx);
            }
            CloudEvent::KeepAlive => {
                log_trace!(ctx, "keep-alive");
            }
        }
    }
}
