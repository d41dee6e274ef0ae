//! Per-episode history of step values.

use indexmap::IndexMap;

/// Keys recorded for every step.
pub const HISTORY_KEYS: [&str; 10] = [
    "action",
    "reward",
    "running_cost",
    "small_vms",
    "medium_vms",
    "large_vms",
    "job_wait_reward",
    "running_vm_cores_reward",
    "unutilized_vm_cores_reward",
    "invalid_reward",
];

/// Values recorded at every step of an episode, logged once the episode ends.
#[derive(Clone, Debug, Default)]
pub struct EpisodeHistory {
    values: IndexMap<String, Vec<f64>>,
}

impl EpisodeHistory {
    pub fn new() -> Self {
        Self {
            values: HISTORY_KEYS.iter().map(|key| (key.to_string(), Vec::new())).collect(),
        }
    }

    pub fn record(&mut self, key: &str, value: f64) {
        self.values.entry(key.to_string()).or_default().push(value);
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.values.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn log_history(&self, session_id: &str) {
        for (key, values) in self.values.iter() {
            log::info!("{} episode history {}: {:?}", session_id, key, values);
        }
    }

    pub fn reset(&mut self) {
        for values in self.values.values_mut() {
            values.clear();
        }
    }
}
