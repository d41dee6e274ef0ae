//! Job placement policies.

use serde::Serialize;

use crate::core::job::Job;

/// Running VM as seen by a placement policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VmCandidate {
    pub vm_id: u32,
    /// Cores left after all jobs already assigned to the VM get theirs.
    pub free_cores: u32,
}

/// Trait for implementation of job placement policies.
///
/// The policy is a function of the job and the list of currently running VMs (ordered by VM id), which returns an
/// ID of VM selected for the job or `None` if there is no suitable VM. Policies may keep state between calls.
pub trait PlacementPolicy: Send {
    fn select_vm(&mut self, job: &Job, candidates: &[VmCandidate]) -> Option<u32>;
}

////////////////////////////////////////////////////////////////////////////////

/// Next-fit policy which resumes the search from the VM selected last time.
///
/// The cursor is wrapped modulo the current number of VMs before every search, since VMs may have been destroyed
/// in between. If no VM fits, the cursor stays where it was.
#[derive(Debug, Default)]
pub struct StickyNextFit {
    cursor: usize,
}

impl StickyNextFit {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl PlacementPolicy for StickyNextFit {
    fn select_vm(&mut self, job: &Job, candidates: &[VmCandidate]) -> Option<u32> {
        if let Some(vm_id) = job.bound_vm {
            // a job bound to a VM which is not running waits for it
            return candidates.iter().any(|c| c.vm_id == vm_id).then_some(vm_id);
        }
        if candidates.is_empty() {
            return None;
        }
        self.cursor %= candidates.len();
        for _ in 0..candidates.len() {
            let candidate = &candidates[self.cursor];
            if candidate.free_cores >= job.cores {
                return Some(candidate.vm_id);
            }
            self.cursor = (self.cursor + 1) % candidates.len();
        }
        None
    }
}
