//! Job ledger: all jobs of an episode and their lifecycle.

use std::collections::HashSet;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::core::job::{Job, JobDescriptor, JobStatus};

/// Holds every job of an episode, the set of arrived jobs and the queue of jobs not submitted yet.
///
/// Pending jobs are kept ordered by nominal arrival time, so admission only looks at a prefix of the queue.
pub struct JobLedger {
    jobs: IndexMap<u64, Job>,
    pending: Vec<u64>,
    arrived: HashSet<u64>,
    finished_count: usize,
    wait_times: Vec<f64>,
}

impl JobLedger {
    pub fn new(descriptors: &[JobDescriptor]) -> Self {
        let mut jobs = IndexMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if jobs.insert(descriptor.id, Job::from_descriptor(descriptor)).is_some() {
                log::warn!("Duplicate job id {}, keeping the last descriptor", descriptor.id);
            }
        }
        jobs.sort_by(|_, a, _, b| {
            a.submission_delay
                .total_cmp(&b.submission_delay)
                .then_with(|| a.id.cmp(&b.id))
        });
        let pending = jobs.keys().copied().collect();
        Self {
            jobs,
            pending,
            arrived: HashSet::new(),
            finished_count: 0,
            wait_times: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job(&self, job_id: u64) -> Option<&Job> {
        self.jobs.get(&job_id)
    }

    /// Iterates over jobs in the order of their nominal arrival.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Returns pending jobs whose nominal arrival is not later than `target_time`.
    pub fn due_jobs(&self, target_time: f64) -> Vec<u64> {
        let end = self
            .pending
            .partition_point(|id| self.jobs[id].submission_delay <= target_time);
        self.pending[..end].to_vec()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn mark_arrived(&mut self, job_id: u64) {
        self.arrived.insert(job_id);
    }

    pub fn is_arrived(&self, job_id: u64) -> bool {
        self.arrived.contains(&job_id)
    }

    /// Moves a pending job to the broker queue.
    pub fn submit(&mut self, job_id: u64, effective_delay: f64) {
        self.pending.retain(|id| *id != job_id);
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.status = JobStatus::Queued;
            job.effective_delay = effective_delay;
        }
    }

    /// Forces the job to be placed on the given VM.
    pub fn bind(&mut self, job_id: u64, vm_id: u32) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.bound_vm = Some(vm_id);
        }
    }

    pub fn assign(&mut self, job_id: u64, vm_id: u32) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.vm_id = Some(vm_id);
        }
    }

    pub fn unassign(&mut self, job_id: u64) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.vm_id = None;
        }
    }

    pub fn mark_running(&mut self, job_id: u64, time: f64) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.status = JobStatus::Running;
            job.started_at = Some(time);
            self.wait_times.push(time - job.submission_delay);
        }
    }

    /// Records the moment a job completed its execution on a VM.
    pub fn record_completion(&mut self, job_id: u64, time: f64) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.finished_at = Some(time);
        }
    }

    pub fn mark_finished(&mut self, job_id: u64, time: f64) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            if job.status != JobStatus::Finished {
                job.status = JobStatus::Finished;
                job.finished_at.get_or_insert(time);
                self.finished_count += 1;
            }
        }
    }

    /// Returns a job rescued from a destroyed VM to the pending queue with zero remaining delay.
    pub fn return_to_pending(&mut self, job_id: u64) {
        let delay = match self.jobs.get_mut(&job_id) {
            Some(job) if job.status != JobStatus::Finished => {
                job.status = JobStatus::Pending;
                job.vm_id = None;
                job.bound_vm = None;
                job.effective_delay = 0.;
                job.started_at = None;
                job.finished_at = None;
                job.submission_delay
            }
            _ => return,
        };
        if self.pending.contains(&job_id) {
            return;
        }
        let jobs = &self.jobs;
        let pos = self.pending.partition_point(|id| {
            let other = &jobs[id];
            other.submission_delay < delay || (other.submission_delay == delay && other.id < job_id)
        });
        self.pending.insert(pos, job_id);
    }

    pub fn arrived_count(&self) -> usize {
        self.arrived.len()
    }

    /// Number of arrived jobs which are not running yet.
    pub fn waiting_count(&self) -> usize {
        self.arrived
            .iter()
            .filter(|id| matches!(self.jobs[*id].status, JobStatus::Pending | JobStatus::Queued))
            .count()
    }

    pub fn finished_count(&self) -> usize {
        self.finished_count
    }

    pub fn all_finished(&self) -> bool {
        self.finished_count == self.jobs.len()
    }

    pub fn unfinished_count(&self) -> usize {
        self.jobs.len() - self.finished_count
    }

    /// Number of jobs per status, in status order.
    pub fn status_histogram(&self) -> Vec<(JobStatus, usize)> {
        self.jobs
            .values()
            .map(|job| job.status)
            .counts()
            .into_iter()
            .sorted()
            .collect()
    }

    /// Returns wait times of jobs started since the previous call.
    pub fn take_wait_times(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.wait_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> JobLedger {
        JobLedger::new(&[
            JobDescriptor::new(0, 5., 10, 1),
            JobDescriptor::new(1, 1., 10, 2),
            JobDescriptor::new(2, 3., 10, 1),
        ])
    }

    #[test]
    fn test_due_jobs_follow_arrival_order() {
        let ledger = ledger();
        assert_eq!(ledger.due_jobs(0.5), Vec::<u64>::new());
        assert_eq!(ledger.due_jobs(3.), vec![1, 2]);
        assert_eq!(ledger.due_jobs(10.), vec![1, 2, 0]);
    }

    #[test]
    fn test_rescued_job_returns_to_its_place() {
        let mut ledger = ledger();
        ledger.mark_arrived(1);
        ledger.submit(1, 0.);
        ledger.assign(1, 4);
        ledger.mark_running(1, 1.1);
        assert_eq!(ledger.due_jobs(10.), vec![2, 0]);

        ledger.return_to_pending(1);
        let job = ledger.job(1).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.vm_id, None);
        assert_eq!(job.effective_delay, 0.);
        assert_eq!(ledger.due_jobs(10.), vec![1, 2, 0]);
        assert_eq!(ledger.waiting_count(), 1);
    }

    #[test]
    fn test_finished_count_is_monotonic() {
        let mut ledger = ledger();
        ledger.mark_finished(2, 4.);
        ledger.mark_finished(2, 5.);
        ledger.return_to_pending(2);
        assert_eq!(ledger.finished_count(), 1);
        assert_eq!(ledger.job(2).unwrap().status, JobStatus::Finished);
        assert_eq!(ledger.unfinished_count(), 2);
        assert_eq!(
            ledger.status_histogram(),
            vec![(JobStatus::Pending, 2), (JobStatus::Finished, 1)]
        );
    }
}
