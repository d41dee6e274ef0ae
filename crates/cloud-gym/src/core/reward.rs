//! Reward calculation.

use serde::Serialize;

use crate::core::config::SimulationSettings;
use crate::core::datacenter::Datacenter;
use crate::core::job_ledger::JobLedger;

/// Reward of a single step with its components.
///
/// `total` is the sum of the three utilization terms. The invalid action penalty is reported separately and is
/// not included in `total`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Reward {
    pub total: f64,
    pub job_wait: f64,
    pub running_vm_cores: f64,
    pub unutilized_vm_cores: f64,
    pub invalid: f64,
}

/// Computes rewards from the current datacenter and job state.
#[derive(Clone, Debug)]
pub struct RewardCalculator {
    job_wait_coef: f64,
    running_vm_cores_coef: f64,
    unutilized_vm_cores_coef: f64,
    invalid_coef: f64,
    datacenter_cores: f64,
}

impl RewardCalculator {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            job_wait_coef: settings.reward_job_wait_coef,
            running_vm_cores_coef: settings.reward_running_vm_cores_coef,
            unutilized_vm_cores_coef: settings.reward_unutilized_vm_cores_coef,
            invalid_coef: settings.reward_invalid_coef,
            datacenter_cores: settings.datacenter_cores() as f64,
        }
    }

    pub fn compute(&self, datacenter: &Datacenter, ledger: &JobLedger, is_valid: bool) -> Reward {
        let job_wait = -self.job_wait_coef * job_wait_ratio(ledger);
        let running_vm_cores =
            -self.running_vm_cores_coef * ratio(datacenter.allocated_cores() as f64, self.datacenter_cores);
        let unutilized_vm_cores = -self.unutilized_vm_cores_coef * unutilized_vm_core_ratio(datacenter);
        let invalid = if is_valid { 0. } else { -self.invalid_coef };
        Reward {
            total: job_wait + running_vm_cores + unutilized_vm_cores,
            job_wait,
            running_vm_cores,
            unutilized_vm_cores,
            invalid,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0. {
        numerator / denominator
    } else {
        0.
    }
}

/// Ratio of arrived jobs which are not running yet.
pub fn job_wait_ratio(ledger: &JobLedger) -> f64 {
    ratio(ledger.waiting_count() as f64, ledger.arrived_count() as f64)
}

/// Ratio of free cores of running VMs to all their cores.
pub fn unutilized_vm_core_ratio(datacenter: &Datacenter) -> f64 {
    ratio(
        datacenter.free_running_vm_cores() as f64,
        datacenter.running_vm_cores() as f64,
    )
}
