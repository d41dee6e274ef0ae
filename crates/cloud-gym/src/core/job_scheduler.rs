//! Space-shared job scheduler of a single VM.

use std::collections::VecDeque;

use serde::Serialize;

/// A job whose remaining execution time is below this value is considered complete.
const FINISH_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, Serialize)]
pub struct JobExecution {
    pub job_id: u64,
    pub cores: u32,
    pub total: f64,
    pub remaining: f64,
}

impl JobExecution {
    fn new(job_id: u64, cores: u32, work_length: u64) -> Self {
        let total = work_length as f64 * cores as f64;
        Self {
            job_id,
            cores,
            total,
            remaining: total,
        }
    }
}

/// Jobs finished and started by a scheduler update.
#[derive(Debug, Default, PartialEq)]
pub struct UpdateOutcome {
    pub finished: Vec<u64>,
    pub started: Vec<u64>,
}

/// Executes jobs of a VM, giving each running job exclusive use of its cores.
///
/// Each core runs at `mips` instructions per time unit. Jobs not fitting into free cores wait in FIFO order. Jobs
/// assigned by the broker but not delivered yet are kept as reservations, so that the free core estimate used by
/// placement accounts for them.
#[derive(Clone, Debug)]
pub struct JobScheduler {
    vm_cores: u32,
    mips: f64,
    reserved: Vec<JobExecution>,
    running: Vec<JobExecution>,
    waiting: VecDeque<JobExecution>,
    last_update: f64,
}

impl JobScheduler {
    pub fn new(vm_cores: u32, mips: f64, time: f64) -> Self {
        Self {
            vm_cores,
            mips,
            reserved: Vec::new(),
            running: Vec::new(),
            waiting: VecDeque::new(),
            last_update: time,
        }
    }

    /// Reserves cores for a job which is on its way to the VM.
    pub fn reserve(&mut self, job_id: u64, cores: u32, work_length: u64) {
        self.reserved.push(JobExecution::new(job_id, cores, work_length));
    }

    /// Accepts a previously reserved job. Returns `false` if there is no such reservation.
    pub fn submit(&mut self, job_id: u64, time: f64) -> bool {
        match self.reserved.iter().position(|job| job.job_id == job_id) {
            Some(pos) => {
                self.advance(time);
                let job = self.reserved.remove(pos);
                self.waiting.push_back(job);
                true
            }
            None => false,
        }
    }

    /// Advances job execution to the given time, completes finished jobs and starts waiting ones.
    pub fn update(&mut self, time: f64) -> UpdateOutcome {
        self.advance(time);
        let mips = self.mips;
        let mut outcome = UpdateOutcome::default();
        self.running.retain(|job| {
            if job.remaining / (job.cores as f64 * mips) <= FINISH_TOLERANCE {
                outcome.finished.push(job.job_id);
                false
            } else {
                true
            }
        });
        let mut still_waiting = VecDeque::with_capacity(self.waiting.len());
        while let Some(job) = self.waiting.pop_front() {
            if job.cores <= self.free_cores() {
                outcome.started.push(job.job_id);
                self.running.push(job);
            } else {
                still_waiting.push_back(job);
            }
        }
        self.waiting = still_waiting;
        outcome
    }

    fn advance(&mut self, time: f64) {
        let elapsed = time - self.last_update;
        if elapsed > 0. {
            for job in self.running.iter_mut() {
                job.remaining = (job.remaining - elapsed * job.cores as f64 * self.mips).max(0.);
            }
        }
        self.last_update = self.last_update.max(time);
    }

    /// Returns the time when the next running job completes.
    pub fn next_completion_time(&self) -> Option<f64> {
        self.running
            .iter()
            .map(|job| self.last_update + job.remaining / (job.cores as f64 * self.mips))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Progress of a running job extrapolated to the given time.
    pub fn progress_at(&self, execution: &JobExecution, time: f64) -> f64 {
        let elapsed = (time - self.last_update).max(0.);
        let remaining = (execution.remaining - elapsed * execution.cores as f64 * self.mips).max(0.);
        1. - remaining / execution.total
    }

    pub fn vm_cores(&self) -> u32 {
        self.vm_cores
    }

    /// Cores occupied by running jobs.
    pub fn busy_cores(&self) -> u32 {
        self.running.iter().map(|job| job.cores).sum()
    }

    pub fn free_cores(&self) -> u32 {
        self.vm_cores.saturating_sub(self.busy_cores())
    }

    /// Cores requested by waiting and reserved jobs.
    pub fn queued_cores(&self) -> u32 {
        self.waiting.iter().chain(self.reserved.iter()).map(|job| job.cores).sum()
    }

    /// Free cores left after all running, waiting and reserved jobs get theirs.
    pub fn expected_free_cores(&self) -> u32 {
        self.free_cores().saturating_sub(self.queued_cores())
    }

    pub fn running_jobs(&self) -> &[JobExecution] {
        &self.running
    }

    pub fn waiting_jobs(&self) -> impl Iterator<Item = &JobExecution> {
        self.waiting.iter()
    }

    /// Number of jobs running or waiting on the VM.
    pub fn job_count(&self) -> usize {
        self.running.len() + self.waiting.len()
    }

    /// Removes every job from the scheduler and returns their IDs.
    pub fn clear(&mut self) -> Vec<u64> {
        self.running
            .drain(..)
            .chain(self.waiting.drain(..))
            .chain(self.reserved.drain(..))
            .map(|job| job.job_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_waits_until_cores_are_released() {
        let mut scheduler = JobScheduler::new(4, 10., 0.);
        scheduler.reserve(1, 3, 100);
        scheduler.reserve(2, 2, 50);
        assert_eq!(scheduler.expected_free_cores(), 0);
        assert!(scheduler.submit(1, 0.));
        assert!(scheduler.submit(2, 0.));
        assert!(!scheduler.submit(3, 0.));

        let outcome = scheduler.update(0.);
        assert_eq!(outcome.started, vec![1]);
        assert_eq!(scheduler.busy_cores(), 3);
        assert_eq!(scheduler.next_completion_time(), Some(10.));

        let outcome = scheduler.update(10.);
        assert_eq!(outcome.finished, vec![1]);
        assert_eq!(outcome.started, vec![2]);
        assert_eq!(scheduler.next_completion_time(), Some(15.));
    }

    #[test]
    fn test_clear_returns_every_job() {
        let mut scheduler = JobScheduler::new(2, 10., 0.);
        scheduler.reserve(1, 2, 100);
        scheduler.reserve(2, 2, 100);
        scheduler.reserve(3, 1, 100);
        scheduler.submit(1, 0.);
        scheduler.submit(2, 0.);
        scheduler.update(0.);
        let mut ids = scheduler.clear();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(scheduler.job_count(), 0);
        assert_eq!(scheduler.expected_free_cores(), 2);
    }
}
