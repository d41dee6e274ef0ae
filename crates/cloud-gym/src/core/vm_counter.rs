use serde::Serialize;

use crate::core::vm::VmSize;

/// Number of existing VMs per size class.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VmCounter {
    counts: [u64; 3],
}

impl VmCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_new_vm(&mut self, size: VmSize) {
        self.counts[size.index()] += 1;
    }

    pub fn record_removed_vm(&mut self, size: VmSize) {
        let count = &mut self.counts[size.index()];
        *count = count.saturating_sub(1);
    }

    pub fn started_vms(&self, size: VmSize) -> u64 {
        self.counts[size.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}
