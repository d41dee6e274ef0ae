//! Job admission: decides which arrived jobs are handed to the broker.

use crate::core::datacenter::Datacenter;
use crate::core::job_ledger::JobLedger;

/// Job admitted to the broker together with the delay its arrival is sent with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Admission {
    pub job_id: u64,
    pub delay: f64,
}

/// Trait for implementation of admission strategies.
///
/// Called once per timestep before the clock is advanced to `target_time`. An implementation marks due jobs as
/// arrived in the ledger, submits the ones it admits and returns them. Jobs which are not admitted stay pending and
/// are offered again at the next timestep.
pub trait AdmissionController: Send {
    fn admit(&mut self, target_time: f64, clock: f64, ledger: &mut JobLedger, datacenter: &Datacenter)
        -> Vec<Admission>;
}

/// Admits a due job if at least one running VM currently has enough free cores for it.
///
/// The delay of an admitted job is recomputed relative to the current clock, so a job admitted after its nominal
/// arrival is submitted immediately.
#[derive(Debug, Default)]
pub struct CapacityAdmission;

impl CapacityAdmission {
    pub fn new() -> Self {
        Self
    }
}

impl AdmissionController for CapacityAdmission {
    fn admit(
        &mut self,
        target_time: f64,
        clock: f64,
        ledger: &mut JobLedger,
        datacenter: &Datacenter,
    ) -> Vec<Admission> {
        let candidates = datacenter.placement_candidates();
        let mut admitted = Vec::new();
        for job_id in ledger.due_jobs(target_time) {
            ledger.mark_arrived(job_id);
            let Some(job) = ledger.job(job_id) else {
                continue;
            };
            if candidates.iter().any(|candidate| candidate.free_cores >= job.cores) {
                let delay = (job.submission_delay - clock).max(0.);
                ledger.submit(job_id, delay);
                admitted.push(Admission { job_id, delay });
            }
        }
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationSettings;
    use crate::core::job::{JobDescriptor, JobStatus};
    use crate::core::vm::{VirtualMachine, VmSize, VmSpec, VmStatus};

    fn datacenter_with_small_vm(settings: &SimulationSettings) -> Datacenter {
        let mut datacenter = Datacenter::new(0, 1, settings);
        let spec = VmSpec::for_size(VmSize::Small, settings);
        let mut vm = VirtualMachine::new(0, VmSize::Small, spec, 0, 0.);
        vm.status = VmStatus::Running;
        datacenter.place_vm(vm, 0, 0.);
        datacenter
    }

    #[test]
    fn test_jobs_without_capacity_stay_pending() {
        let settings = SimulationSettings::default();
        let datacenter = datacenter_with_small_vm(&settings);
        let mut ledger = JobLedger::new(&[
            JobDescriptor::new(0, 0.5, 100, 1),
            JobDescriptor::new(1, 1.5, 100, 8),
            JobDescriptor::new(2, 7.0, 100, 1),
        ]);

        let admitted = CapacityAdmission::new().admit(3., 2., &mut ledger, &datacenter);

        assert_eq!(admitted, vec![Admission { job_id: 0, delay: 0. }]);
        assert!(ledger.is_arrived(1));
        assert!(!ledger.is_arrived(2));
        assert_eq!(ledger.job(0).unwrap().status, JobStatus::Queued);
        assert_eq!(ledger.job(1).unwrap().status, JobStatus::Pending);
        assert_eq!(ledger.due_jobs(3.), vec![1]);
    }
}
