//! Simulation events.

use serde::Serialize;

/// Events exchanged between the orchestrator, the broker and the datacenter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CloudEvent {
    // JOB EVENTS //////////////////////////////////////////////////////////////////////////////////
    /// Admitted job reaches the broker.
    JobArrival { job_id: u64 },
    /// Broker hands a placed job to the datacenter.
    JobSubmit { job_id: u64, vm_id: u32 },
    /// Datacenter reports a completed job to the broker.
    JobReturn { job_id: u64, vm_id: u32 },

    // VM EVENTS ///////////////////////////////////////////////////////////////////////////////////
    /// VM startup delay has elapsed.
    VmStarted { vm_id: u32 },
    /// Datacenter notifies the broker that a VM accepts jobs.
    VmCreated { vm_id: u32 },
    /// Progress jobs of a VM up to the current time.
    UpdateProcessing { vm_id: u32 },

    /// No-op event keeping the future-event queue non-empty.
    KeepAlive,
}
