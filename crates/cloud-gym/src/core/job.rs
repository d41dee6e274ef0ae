//! Jobs, their descriptors and ingestion rules.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationSettings;
use crate::error::Result;

/// Lifecycle status of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum JobStatus {
    /// Not submitted yet: either not arrived or waiting for capacity.
    Pending,
    /// Submitted to the broker, not running yet.
    Queued,
    Running,
    Finished,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Job as supplied by the caller.
///
/// Field names of agent-side traces (`jobId`, `mi`, `numberOfCores`) are accepted as aliases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    #[serde(alias = "jobId")]
    pub id: u64,
    pub submission_delay: f64,
    #[serde(alias = "mi")]
    pub work_length: i64,
    #[serde(alias = "numberOfCores")]
    pub core_count: i64,
}

impl JobDescriptor {
    pub fn new(id: u64, submission_delay: f64, work_length: i64, core_count: i64) -> Self {
        Self {
            id,
            submission_delay,
            work_length,
            core_count,
        }
    }

    /// Returns a copy with values clamped to their minima and the delay scaled by the simulation speedup.
    pub fn clamped(&self, speedup: f64) -> Self {
        let delay = if speedup > 0. {
            self.submission_delay / speedup
        } else {
            self.submission_delay
        };
        Self {
            id: self.id,
            submission_delay: delay.max(0.),
            work_length: self.work_length.max(1),
            core_count: self.core_count.max(1),
        }
    }
}

/// Parses a JSON array of job descriptors.
pub fn parse_jobs(json: &str) -> Result<Vec<JobDescriptor>> {
    Ok(serde_json::from_str(json)?)
}

/// Splits jobs requiring more than `max_pes` cores into sub-jobs.
///
/// A job with `C` cores and `W` total instructions is split into `k = ceil(C / max_pes)` parts. All parts but the
/// last get `C / k` cores and `W / k` instructions, the last one gets the remainders. The work length of a part is
/// stored per core. Parts are renumbered sequentially starting from 0.
pub fn split_large_jobs(jobs: &[JobDescriptor], max_pes: u32) -> Vec<JobDescriptor> {
    let max_pes = max_pes.max(1) as i64;
    let mut result = Vec::with_capacity(jobs.len());
    let mut next_id = 0;
    for job in jobs {
        let split_count = ((job.core_count + max_pes - 1) / max_pes).max(1);
        let part_cores = job.core_count / split_count;
        let part_length = job.work_length / split_count;
        for i in 0..split_count {
            let (length, cores) = if i < split_count - 1 {
                (part_length, part_cores)
            } else {
                (
                    job.work_length - part_length * (split_count - 1),
                    job.core_count - part_cores * (split_count - 1),
                )
            };
            result.push(JobDescriptor::new(
                next_id,
                job.submission_delay,
                (length / cores).max(1),
                cores,
            ));
            next_id += 1;
        }
    }
    result
}

/// Applies ingestion rules: clamping, speedup and (optionally) splitting.
pub fn ingest_jobs(jobs: &[JobDescriptor], settings: &SimulationSettings) -> Vec<JobDescriptor> {
    let clamped: Vec<JobDescriptor> = jobs.iter().map(|job| job.clamped(settings.simulation_speedup)).collect();
    if settings.split_large_jobs {
        let split = split_large_jobs(&clamped, settings.max_job_pes);
        log::info!("Split {} jobs into {}", clamped.len(), split.len());
        split
    } else {
        clamped
    }
}

/// Represents a job tracked by the job ledger.
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    pub id: u64,
    /// Nominal arrival time.
    pub submission_delay: f64,
    /// Instructions per core.
    pub work_length: u64,
    pub cores: u32,
    pub status: JobStatus,
    /// VM the job is assigned to by the broker.
    pub vm_id: Option<u32>,
    /// VM the job must run on, if any.
    pub bound_vm: Option<u32>,
    /// Delay used at the last submission to the broker.
    pub effective_delay: f64,
    pub started_at: Option<f64>,
    pub finished_at: Option<f64>,
}

impl Job {
    pub fn from_descriptor(descriptor: &JobDescriptor) -> Self {
        Self {
            id: descriptor.id,
            submission_delay: descriptor.submission_delay,
            work_length: descriptor.work_length.max(1) as u64,
            cores: descriptor.core_count.clamp(1, u32::MAX as i64) as u32,
            status: JobStatus::Pending,
            vm_id: None,
            bound_vm: None,
            effective_delay: descriptor.submission_delay,
            started_at: None,
            finished_at: None,
        }
    }

    /// Total number of instructions over all cores.
    pub fn total_instructions(&self) -> f64 {
        self.work_length as f64 * self.cores as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_total_cores() {
        let jobs = vec![JobDescriptor::new(7, 5., 1000, 7)];
        let split = split_large_jobs(&jobs, 3);
        let cores: Vec<i64> = split.iter().map(|j| j.core_count).collect();
        assert_eq!(cores, vec![2, 2, 3]);
        let ids: Vec<u64> = split.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        // 1000 / 3 = 333 per part, the last one gets 334
        assert_eq!(split[0].work_length, 333 / 2);
        assert_eq!(split[2].work_length, 334 / 3);
        assert!(split.iter().all(|j| j.submission_delay == 5.));
    }

    #[test]
    fn test_split_small_job_is_renumbered_only() {
        let jobs = vec![JobDescriptor::new(42, 0., 500, 1), JobDescriptor::new(43, 1., 600, 1)];
        let split = split_large_jobs(&jobs, 4);
        assert_eq!(split, vec![JobDescriptor::new(0, 0., 500, 1), JobDescriptor::new(1, 1., 600, 1)]);
    }

    #[test]
    fn test_clamped_descriptor() {
        let job = JobDescriptor::new(1, -3., -778, 0).clamped(1.);
        assert_eq!(job, JobDescriptor::new(1, 0., 1, 1));
        let job = JobDescriptor::new(1, 60., 10, 2).clamped(10.);
        assert_eq!(job.submission_delay, 6.);
    }

    #[test]
    fn test_descriptor_aliases() {
        let jobs = parse_jobs(r#"[{"jobId": 3, "submissionDelay": 10, "mi": 100, "numberOfCores": 2}]"#).unwrap();
        assert_eq!(jobs, vec![JobDescriptor::new(3, 10., 100, 2)]);
    }
}
