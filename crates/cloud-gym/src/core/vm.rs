//! Representations of virtual machine, its size class and status.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationSettings;

/// Size class of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VmSize {
    Small,
    Medium,
    Large,
}

impl VmSize {
    pub const ALL: [VmSize; 3] = [VmSize::Small, VmSize::Medium, VmSize::Large];

    /// Decodes the VM type index of an agent action.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(VmSize::Small),
            1 => Some(VmSize::Medium),
            2 => Some(VmSize::Large),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            VmSize::Small => 0,
            VmSize::Medium => 1,
            VmSize::Large => 2,
        }
    }
}

impl Display for VmSize {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmSize::Small => write!(f, "S"),
            VmSize::Medium => write!(f, "M"),
            VmSize::Large => write!(f, "L"),
        }
    }
}

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Starting,
    Running,
    Destroyed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Starting => write!(f, "starting"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Resources requested by a VM from its host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VmSpec {
    pub cores: u32,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
}

impl VmSpec {
    /// Returns the resources of a VM of the given size: the small VM resources times the size multiplier.
    pub fn for_size(size: VmSize, settings: &SimulationSettings) -> Self {
        let multiplier = settings.size_multiplier(size);
        Self {
            cores: settings.small_vm_pes * multiplier,
            ram: settings.small_vm_ram * multiplier as u64,
            bw: settings.small_vm_bw * multiplier as u64,
            storage: settings.small_vm_storage * multiplier as u64,
        }
    }
}

/// Represents virtual machine (VM).
#[derive(Clone, Debug, Serialize)]
pub struct VirtualMachine {
    pub id: u32,
    pub size: VmSize,
    pub spec: VmSpec,
    /// Host the VM is placed on, cleared when the VM is destroyed.
    pub host_id: Option<u32>,
    pub status: VmStatus,
    pub created_at: f64,
    pub started_at: Option<f64>,
    pub finished_at: Option<f64>,
}

impl VirtualMachine {
    pub fn new(id: u32, size: VmSize, spec: VmSpec, host_id: u32, created_at: f64) -> Self {
        Self {
            id,
            size,
            spec,
            host_id: Some(host_id),
            status: VmStatus::Starting,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == VmStatus::Running
    }
}
