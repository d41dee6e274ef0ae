//! Cost ledger of running VMs.

use std::collections::BTreeMap;

use serde::Serialize;

/// Share of the hourly price charged per second.
const HOURLY_TO_SECOND_RATE: f64 = 0.00028;

#[derive(Clone, Debug, Serialize)]
struct CostEntry {
    multiplier: f64,
    started_at: f64,
    finished_at: Option<f64>,
}

/// Tracks VMs which currently incur cost.
///
/// A VM costs `per_iteration_cost × size_multiplier` per iteration while it exists. With full-hour billing a
/// stopped VM keeps costing until one billing hour (expressed in iterations) has passed since its finish time,
/// the boundary itself included. Entries outside their billing window are pruned.
#[derive(Clone, Debug)]
pub struct CostLedger {
    per_iteration_cost: f64,
    iterations_in_hour: f64,
    pay_full_hour: bool,
    entries: BTreeMap<u32, CostEntry>,
}

impl CostLedger {
    /// `seconds_per_iteration` is the simulation speedup.
    pub fn new(hourly_cost: f64, seconds_per_iteration: f64, pay_full_hour: bool) -> Self {
        Self {
            per_iteration_cost: hourly_cost * HOURLY_TO_SECOND_RATE * seconds_per_iteration,
            iterations_in_hour: 3600. / seconds_per_iteration,
            pay_full_hour,
            entries: BTreeMap::new(),
        }
    }

    pub fn per_iteration_cost(&self) -> f64 {
        self.per_iteration_cost
    }

    pub fn iterations_in_hour(&self) -> f64 {
        self.iterations_in_hour
    }

    pub fn add_vm(&mut self, vm_id: u32, multiplier: u32, time: f64) {
        self.entries.insert(
            vm_id,
            CostEntry {
                multiplier: multiplier as f64,
                started_at: time,
                finished_at: None,
            },
        );
    }

    pub fn stop_vm(&mut self, vm_id: u32, time: f64) {
        if let Some(entry) = self.entries.get_mut(&vm_id) {
            entry.finished_at = Some(time);
        }
    }

    fn is_billed(&self, entry: &CostEntry, time: f64) -> bool {
        match entry.finished_at {
            None => true,
            Some(finished_at) if time <= finished_at => true,
            Some(finished_at) => self.pay_full_hour && time - finished_at <= self.iterations_in_hour,
        }
    }

    /// Prunes entries outside their billing window and returns the cost of one iteration at the given time.
    pub fn running_cost(&mut self, time: f64) -> f64 {
        let expired: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, entry)| !self.is_billed(entry, time))
            .map(|(id, _)| *id)
            .collect();
        for vm_id in expired {
            self.entries.remove(&vm_id);
        }
        self.entries
            .values()
            .map(|entry| self.per_iteration_cost * entry.multiplier)
            .sum()
    }

    /// Number of entries currently kept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, vm_id: u32) -> bool {
        self.entries.contains_key(&vm_id)
    }

    /// Time when the VM started incurring cost.
    pub fn started_at(&self, vm_id: u32) -> Option<f64> {
        self.entries.get(&vm_id).map(|entry| entry.started_at)
    }
}
