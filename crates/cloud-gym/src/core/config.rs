//! Simulation settings.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::vm::VmSize;
use crate::error::{Error, Result};

/// Minimal spacing between dependent events, also used as broker-datacenter message delay.
pub const MIN_TIME_BETWEEN_EVENTS: f64 = 0.1;

/// Holds raw settings parsed from YAML file or from a string map.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationSettings {
    pub timestep_interval: Option<f64>,
    pub initial_s_vm_count: Option<u32>,
    pub initial_m_vm_count: Option<u32>,
    pub initial_l_vm_count: Option<u32>,
    pub split_large_jobs: Option<bool>,
    pub max_job_pes: Option<u32>,
    pub simulation_speedup: Option<f64>,
    pub vm_hourly_cost: Option<f64>,
    pub hosts_count: Option<u32>,
    pub host_pe_mips: Option<f64>,
    pub host_pes: Option<u32>,
    pub host_ram: Option<u64>,
    pub host_storage: Option<u64>,
    pub host_bw: Option<u64>,
    pub small_vm_pes: Option<u32>,
    pub small_vm_ram: Option<u64>,
    pub small_vm_storage: Option<u64>,
    pub small_vm_bw: Option<u64>,
    pub medium_vm_multiplier: Option<u32>,
    pub large_vm_multiplier: Option<u32>,
    pub vm_startup_delay: Option<f64>,
    pub vm_shutdown_delay: Option<f64>,
    pub paying_for_the_full_hour: Option<bool>,
    pub keep_created_job_list: Option<bool>,
    pub reward_job_wait_coef: Option<f64>,
    pub reward_running_vm_cores_coef: Option<f64>,
    pub reward_unutilized_vm_cores_coef: Option<f64>,
    pub reward_invalid_coef: Option<f64>,
    pub max_episode_length: Option<u64>,
    pub job_stats_period: Option<u64>,
}

/// Looks up option by its snake-case name or by the upper-case name used by agent-side environments.
fn lookup<'a>(options: &'a HashMap<String, String>, key: &str) -> Option<&'a String> {
    options.get(key).or_else(|| options.get(&key.to_uppercase()))
}

fn parse_value<T: FromStr>(options: &HashMap<String, String>, key: &str) -> Result<Option<T>> {
    match lookup(options, key) {
        None => Ok(None),
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| Error::InvalidConfig {
            key: key.to_string(),
            value: value.clone(),
        }),
    }
}

fn parse_flag(options: &HashMap<String, String>, key: &str) -> Result<Option<bool>> {
    match lookup(options, key) {
        None => Ok(None),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(Error::InvalidConfig {
                key: key.to_string(),
                value: value.clone(),
            }),
        },
    }
}

impl RawSimulationSettings {
    fn from_map(options: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            timestep_interval: parse_value(options, "timestep_interval")?,
            initial_s_vm_count: parse_value(options, "initial_s_vm_count")?,
            initial_m_vm_count: parse_value(options, "initial_m_vm_count")?,
            initial_l_vm_count: parse_value(options, "initial_l_vm_count")?,
            split_large_jobs: parse_flag(options, "split_large_jobs")?,
            max_job_pes: parse_value(options, "max_job_pes")?,
            simulation_speedup: parse_value(options, "simulation_speedup")?,
            vm_hourly_cost: parse_value(options, "vm_hourly_cost")?,
            hosts_count: parse_value(options, "hosts_count")?,
            host_pe_mips: parse_value(options, "host_pe_mips")?,
            host_pes: parse_value(options, "host_pes")?,
            host_ram: parse_value(options, "host_ram")?,
            host_storage: parse_value(options, "host_storage")?,
            host_bw: parse_value(options, "host_bw")?,
            small_vm_pes: parse_value(options, "small_vm_pes")?,
            small_vm_ram: parse_value(options, "small_vm_ram")?,
            small_vm_storage: parse_value(options, "small_vm_storage")?,
            small_vm_bw: parse_value(options, "small_vm_bw")?,
            medium_vm_multiplier: parse_value(options, "medium_vm_multiplier")?,
            large_vm_multiplier: parse_value(options, "large_vm_multiplier")?,
            vm_startup_delay: parse_value(options, "vm_startup_delay")?,
            vm_shutdown_delay: parse_value(options, "vm_shutdown_delay")?,
            paying_for_the_full_hour: parse_flag(options, "paying_for_the_full_hour")?,
            keep_created_job_list: parse_flag(options, "keep_created_job_list")?,
            reward_job_wait_coef: parse_value(options, "reward_job_wait_coef")?,
            reward_running_vm_cores_coef: parse_value(options, "reward_running_vm_cores_coef")?,
            reward_unutilized_vm_cores_coef: parse_value(options, "reward_unutilized_vm_cores_coef")?,
            reward_invalid_coef: parse_value(options, "reward_invalid_coef")?,
            max_episode_length: parse_value(options, "max_episode_length")?,
            job_stats_period: parse_value(options, "job_stats_period")?,
        })
    }

    /// Rejects values which would stall or rewind the simulation clock.
    fn validate(self) -> Result<Self> {
        for (key, value) in [
            ("timestep_interval", self.timestep_interval),
            ("simulation_speedup", self.simulation_speedup),
        ] {
            if let Some(value) = value {
                // also rejects NaN
                if !(value > 0.) {
                    return Err(Error::InvalidConfig {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(self)
    }
}

/// Represents simulation settings of a single session.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationSettings {
    /// Simulated time advanced by a single agent step.
    pub timestep_interval: f64,
    /// Number of small VMs created at reset.
    pub initial_s_vm_count: u32,
    /// Number of medium VMs created at reset.
    pub initial_m_vm_count: u32,
    /// Number of large VMs created at reset.
    pub initial_l_vm_count: u32,
    /// Whether jobs requiring more than `max_job_pes` cores are split into sub-jobs.
    pub split_large_jobs: bool,
    /// Maximal number of cores of a single (sub-)job when splitting is enabled.
    pub max_job_pes: u32,
    /// Submission delays are divided by this factor; also the number of seconds per iteration for billing.
    pub simulation_speedup: f64,
    /// Price of running a small VM for one hour.
    pub vm_hourly_cost: f64,
    /// Number of (identical) hosts in the datacenter.
    pub hosts_count: u32,
    /// Speed of a single host core in instructions per time unit.
    pub host_pe_mips: f64,
    /// Number of cores of a host.
    pub host_pes: u32,
    pub host_ram: u64,
    pub host_storage: u64,
    pub host_bw: u64,
    /// Number of cores of a small VM. Medium and large VMs are multiples of the small one.
    pub small_vm_pes: u32,
    pub small_vm_ram: u64,
    pub small_vm_storage: u64,
    pub small_vm_bw: u64,
    pub medium_vm_multiplier: u32,
    pub large_vm_multiplier: u32,
    /// Time between VM creation and the moment it can receive jobs.
    pub vm_startup_delay: f64,
    /// Time a destroyed VM is still billed for.
    pub vm_shutdown_delay: f64,
    /// Whether a stopped VM is billed until one billing hour (inclusive) has elapsed since it stopped.
    pub paying_for_the_full_hour: bool,
    /// Whether broker placement history is kept instead of being cleared every timestep.
    pub keep_created_job_list: bool,
    pub reward_job_wait_coef: f64,
    pub reward_running_vm_cores_coef: f64,
    pub reward_unutilized_vm_cores_coef: f64,
    pub reward_invalid_coef: f64,
    /// Step budget of an episode, the episode is truncated when it is reached.
    pub max_episode_length: u64,
    /// Period (in timesteps) of the job status histogram logging.
    pub job_stats_period: u64,
}

impl From<RawSimulationSettings> for SimulationSettings {
    fn from(raw: RawSimulationSettings) -> Self {
        Self {
            timestep_interval: raw.timestep_interval.unwrap_or(1.0),
            initial_s_vm_count: raw.initial_s_vm_count.unwrap_or(1),
            initial_m_vm_count: raw.initial_m_vm_count.unwrap_or(1),
            initial_l_vm_count: raw.initial_l_vm_count.unwrap_or(1),
            split_large_jobs: raw.split_large_jobs.unwrap_or(true),
            max_job_pes: raw.max_job_pes.unwrap_or(1).max(1),
            simulation_speedup: raw.simulation_speedup.unwrap_or(1.0),
            vm_hourly_cost: raw.vm_hourly_cost.unwrap_or(0.2),
            hosts_count: raw.hosts_count.unwrap_or(10),
            host_pe_mips: raw.host_pe_mips.unwrap_or(10000.),
            host_pes: raw.host_pes.unwrap_or(14),
            host_ram: raw.host_ram.unwrap_or(65536),
            host_storage: raw.host_storage.unwrap_or(100000),
            host_bw: raw.host_bw.unwrap_or(50000),
            small_vm_pes: raw.small_vm_pes.unwrap_or(2).max(1),
            small_vm_ram: raw.small_vm_ram.unwrap_or(8192),
            small_vm_storage: raw.small_vm_storage.unwrap_or(4000),
            small_vm_bw: raw.small_vm_bw.unwrap_or(1000),
            medium_vm_multiplier: raw.medium_vm_multiplier.unwrap_or(2),
            large_vm_multiplier: raw.large_vm_multiplier.unwrap_or(4),
            vm_startup_delay: raw.vm_startup_delay.unwrap_or(0.),
            vm_shutdown_delay: raw.vm_shutdown_delay.unwrap_or(0.),
            paying_for_the_full_hour: raw.paying_for_the_full_hour.unwrap_or(false),
            keep_created_job_list: raw.keep_created_job_list.unwrap_or(false),
            reward_job_wait_coef: raw.reward_job_wait_coef.unwrap_or(0.3),
            reward_running_vm_cores_coef: raw.reward_running_vm_cores_coef.unwrap_or(0.3),
            reward_unutilized_vm_cores_coef: raw.reward_unutilized_vm_cores_coef.unwrap_or(0.3),
            reward_invalid_coef: raw.reward_invalid_coef.unwrap_or(0.1),
            max_episode_length: raw.max_episode_length.unwrap_or(1000),
            job_stats_period: raw.job_stats_period.unwrap_or(1000).max(1),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        RawSimulationSettings::default().into()
    }
}

impl SimulationSettings {
    /// Creates settings from session options (uses default values for absent options).
    pub fn from_map(options: &HashMap<String, String>) -> Result<Self> {
        Ok(RawSimulationSettings::from_map(options)?.validate()?.into())
    }

    /// Creates settings by reading option values from YAML file
    /// (uses default values if some options are absent).
    pub fn from_file(file_name: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(file_name).map_err(|e| Error::ConfigFile {
            path: file_name.to_string(),
            message: e.to_string(),
        })?;
        let raw: RawSimulationSettings = serde_yaml::from_str(&contents).map_err(|e| Error::ConfigFile {
            path: file_name.to_string(),
            message: e.to_string(),
        })?;
        Ok(raw.validate()?.into())
    }

    /// Total number of host cores in the datacenter.
    pub fn datacenter_cores(&self) -> u64 {
        self.hosts_count as u64 * self.host_pes as u64
    }

    /// Cores multiplier of the given VM size class relative to the small VM.
    pub fn size_multiplier(&self, size: VmSize) -> u32 {
        match size {
            VmSize::Small => 1,
            VmSize::Medium => self.medium_vm_multiplier,
            VmSize::Large => self.large_vm_multiplier,
        }
    }

    /// Upper bound on the number of simultaneously existing VMs (all of them small).
    pub fn max_vms(&self) -> usize {
        (self.datacenter_cores() / self.small_vm_pes as u64) as usize
    }

    /// Upper bound on the number of simultaneously running jobs (one core each).
    pub fn max_jobs(&self) -> usize {
        self.max_vms() * self.small_vm_pes as usize
    }

    /// Upper bound on the number of VMs on a single host.
    pub fn max_vms_per_host(&self) -> usize {
        (self.host_pes / self.small_vm_pes).max(1) as usize
    }
}
