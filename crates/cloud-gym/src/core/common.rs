use serde::Serialize;

/// Result of checking whether a host can accommodate a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AllocationVerdict {
    NotEnoughCores,
    NotEnoughRam,
    NotEnoughBandwidth,
    NotEnoughStorage,
    Success,
    HostNotFound,
}
