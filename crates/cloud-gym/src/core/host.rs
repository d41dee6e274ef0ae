//! Physical host.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::common::AllocationVerdict;
use crate::core::config::SimulationSettings;
use crate::core::vm::VmSpec;

/// Stores host capacity and the resources currently allocated to resident VMs.
#[derive(Clone, Debug, Serialize)]
pub struct Host {
    pub id: u32,
    pub cores: u32,
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,

    cores_allocated: u32,
    ram_allocated: u64,
    bw_allocated: u64,
    storage_allocated: u64,

    vms: BTreeSet<u32>,
}

impl Host {
    pub fn new(id: u32, settings: &SimulationSettings) -> Self {
        Self {
            id,
            cores: settings.host_pes,
            mips: settings.host_pe_mips,
            ram: settings.host_ram,
            bw: settings.host_bw,
            storage: settings.host_storage,
            cores_allocated: 0,
            ram_allocated: 0,
            bw_allocated: 0,
            storage_allocated: 0,
            vms: BTreeSet::new(),
        }
    }

    /// Checks if a VM with the given spec currently fits on the host.
    pub fn can_host(&self, spec: &VmSpec) -> AllocationVerdict {
        if self.cores - self.cores_allocated < spec.cores {
            return AllocationVerdict::NotEnoughCores;
        }
        if self.ram - self.ram_allocated < spec.ram {
            return AllocationVerdict::NotEnoughRam;
        }
        if self.bw - self.bw_allocated < spec.bw {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if self.storage - self.storage_allocated < spec.storage {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    pub(crate) fn allocate(&mut self, vm_id: u32, spec: &VmSpec) {
        if self.vms.insert(vm_id) {
            self.cores_allocated += spec.cores;
            self.ram_allocated += spec.ram;
            self.bw_allocated += spec.bw;
            self.storage_allocated += spec.storage;
        }
    }

    pub(crate) fn release(&mut self, vm_id: u32, spec: &VmSpec) {
        if self.vms.remove(&vm_id) {
            self.cores_allocated -= spec.cores;
            self.ram_allocated -= spec.ram;
            self.bw_allocated -= spec.bw;
            self.storage_allocated -= spec.storage;
        }
    }

    pub fn cores_allocated(&self) -> u32 {
        self.cores_allocated
    }

    pub fn ram_allocated(&self) -> u64 {
        self.ram_allocated
    }

    pub fn bw_allocated(&self) -> u64 {
        self.bw_allocated
    }

    pub fn free_cores(&self) -> u32 {
        self.cores - self.cores_allocated
    }

    /// Returns IDs of resident VMs in ascending order.
    pub fn vms(&self) -> impl Iterator<Item = u32> + '_ {
        self.vms.iter().copied()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }
}
