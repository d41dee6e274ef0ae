//! Metrics sampling and observation encoding.

use serde::Serialize;

use crate::core::config::SimulationSettings;
use crate::core::datacenter::Datacenter;
use crate::core::job_ledger::JobLedger;
use crate::core::vm::VmSize;

/// Number of values per observation row.
pub const METRICS_COLUMNS: usize = 4;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0. {
        numerator / denominator
    } else {
        0.
    }
}

/// Last sampled metrics of the datacenter, its hosts, VMs and running jobs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MetricsStorage {
    pub datacenter: Vec<f64>,
    pub hosts: Vec<Vec<f64>>,
    pub vms: Vec<Vec<f64>>,
    pub jobs: Vec<Vec<f64>>,
}

impl MetricsStorage {
    /// Zero-fills the datacenter metrics and forgets per-entity ones.
    pub fn clear(&mut self) {
        self.datacenter = vec![0.; METRICS_COLUMNS];
        self.hosts.clear();
        self.vms.clear();
        self.jobs.clear();
    }
}

/// Encodes the datacenter state as a fixed-shape matrix.
///
/// The matrix has one datacenter row, then one row per host, then `max_vms` VM rows and `max_jobs` job rows.
/// Rows of absent entities are zero-filled, so the shape depends only on the settings.
///
/// Datacenter row: cores allocated to VMs / datacenter cores, running VMs / `max_vms`, not running arrived jobs /
/// arrived jobs, free cores of running VMs / cores of running VMs.
///
/// Host row: allocated cores, RAM and bandwidth ratios, resident VMs / maximal number of VMs on a host.
///
/// VM row: VM cores / largest VM cores, busy cores ratio, queued cores / VM cores (capped by 1),
/// (host id + 1) / hosts count.
///
/// Job row (running jobs only): job cores / VM cores, progress, (VM position + 1) / `max_vms`, 1.
pub struct ObservationEncoder {
    hosts_count: usize,
    max_vms: usize,
    max_jobs: usize,
    max_vms_per_host: usize,
    datacenter_cores: f64,
    largest_vm_cores: f64,
    storage: MetricsStorage,
}

impl ObservationEncoder {
    pub fn new(settings: &SimulationSettings) -> Self {
        let largest_vm_cores = VmSize::ALL
            .iter()
            .map(|size| settings.small_vm_pes * settings.size_multiplier(*size))
            .max()
            .unwrap_or(1);
        let mut storage = MetricsStorage::default();
        storage.clear();
        Self {
            hosts_count: settings.hosts_count as usize,
            max_vms: settings.max_vms(),
            max_jobs: settings.max_jobs(),
            max_vms_per_host: settings.max_vms_per_host(),
            datacenter_cores: settings.datacenter_cores() as f64,
            largest_vm_cores: largest_vm_cores as f64,
            storage,
        }
    }

    /// Returns the number of rows and columns of the observation.
    pub fn shape(&self) -> (usize, usize) {
        (1 + self.hosts_count + self.max_vms + self.max_jobs, METRICS_COLUMNS)
    }

    pub fn storage(&self) -> &MetricsStorage {
        &self.storage
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// Samples metrics at the given time into the storage.
    pub fn sample(&mut self, datacenter: &Datacenter, ledger: &JobLedger, time: f64) {
        let running_vms = datacenter.running_vms().count();
        self.storage.datacenter = vec![
            ratio(datacenter.allocated_cores() as f64, self.datacenter_cores),
            ratio(running_vms as f64, self.max_vms as f64),
            ratio(ledger.waiting_count() as f64, ledger.arrived_count() as f64),
            ratio(
                datacenter.free_running_vm_cores() as f64,
                datacenter.running_vm_cores() as f64,
            ),
        ];

        self.storage.hosts = datacenter
            .hosts()
            .iter()
            .map(|host| {
                vec![
                    ratio(host.cores_allocated() as f64, host.cores as f64),
                    ratio(host.ram_allocated() as f64, host.ram as f64),
                    ratio(host.bw_allocated() as f64, host.bw as f64),
                    ratio(host.vm_count() as f64, self.max_vms_per_host as f64),
                ]
            })
            .collect();

        let mut vms = Vec::new();
        let mut jobs = Vec::new();
        for (position, vm) in datacenter.vms().enumerate() {
            let cores = vm.spec.cores as f64;
            let (busy, queued) = datacenter
                .scheduler(vm.id)
                .map(|scheduler| (scheduler.busy_cores() as f64, scheduler.queued_cores() as f64))
                .unwrap_or((0., 0.));
            vms.push(vec![
                ratio(cores, self.largest_vm_cores),
                ratio(busy, cores),
                ratio(queued, cores).min(1.),
                ratio(
                    vm.host_id.map(|id| id as f64 + 1.).unwrap_or(0.),
                    self.hosts_count as f64,
                ),
            ]);
            if let Some(scheduler) = datacenter.scheduler(vm.id) {
                for execution in scheduler.running_jobs() {
                    jobs.push(vec![
                        ratio(execution.cores as f64, cores),
                        scheduler.progress_at(execution, time),
                        ratio(position as f64 + 1., self.max_vms as f64),
                        1.,
                    ]);
                }
            }
        }
        self.storage.vms = vms;
        self.storage.jobs = jobs;
    }

    /// Builds the observation matrix from the last sample.
    pub fn observation(&self) -> Vec<Vec<f64>> {
        let (rows, _) = self.shape();
        let mut observation = Vec::with_capacity(rows);
        observation.push(self.storage.datacenter.clone());
        push_padded(&mut observation, &self.storage.hosts, self.hosts_count);
        push_padded(&mut observation, &self.storage.vms, self.max_vms);
        push_padded(&mut observation, &self.storage.jobs, self.max_jobs);
        observation
    }
}

fn push_padded(observation: &mut Vec<Vec<f64>>, rows: &[Vec<f64>], capacity: usize) {
    observation.extend(rows.iter().take(capacity).cloned());
    for _ in rows.len().min(capacity)..capacity {
        observation.push(vec![0.; METRICS_COLUMNS]);
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Encodes the datacenter hierarchy as a flat array.
///
/// Layout: datacenter cores, hosts count, then for every host its cores and VMs count followed by its VMs. Every
/// VM is its cores and jobs count followed by its jobs, every job is its cores and a terminating zero. Jobs are the
/// running and waiting jobs of a VM.
pub fn tree_array(datacenter: &Datacenter) -> Vec<i64> {
    let hosts = datacenter.hosts();
    let mut tree = vec![
        hosts.iter().map(|host| host.cores as i64).sum(),
        hosts.len() as i64,
    ];
    for host in hosts {
        tree.push(host.cores as i64);
        tree.push(host.vm_count() as i64);
        for vm_id in host.vms() {
            let Some(vm) = datacenter.vm(vm_id) else {
                continue;
            };
            tree.push(vm.spec.cores as i64);
            match datacenter.scheduler(vm_id) {
                Some(scheduler) => {
                    tree.push(scheduler.job_count() as i64);
                    for execution in scheduler.running_jobs().iter().chain(scheduler.waiting_jobs()) {
                        tree.push(execution.cores as i64);
                        tree.push(0);
                    }
                }
                None => tree.push(0),
            }
        }
    }
    tree
}

/// Renders the tree encoding in Graphviz DOT format.
///
/// Nodes are named `d0`, `h{i}`, `h{i}v{j}` and `h{i}v{j}j{k}` and labelled with core counts. Truncated input is
/// rendered up to the last complete node.
pub fn to_dot(tree: &[i64]) -> String {
    let mut dot = String::from("graph {\n");
    let mut values = tree.iter().copied();
    let (Some(datacenter_cores), Some(hosts_count)) = (values.next(), values.next()) else {
        dot.push('}');
        return dot;
    };
    dot.push_str(&format!("d0 [label={}]\n", datacenter_cores));
    'hosts: for i in 0..hosts_count.max(0) {
        let (Some(host_cores), Some(vms_count)) = (values.next(), values.next()) else {
            break;
        };
        let host = format!("h{}", i);
        dot.push_str(&format!("{} [label={}]\n", host, host_cores));
        dot.push_str(&format!("d0 -- {}\n", host));
        for j in 0..vms_count.max(0) {
            let (Some(vm_cores), Some(jobs_count)) = (values.next(), values.next()) else {
                break 'hosts;
            };
            let vm = format!("{}v{}", host, j);
            dot.push_str(&format!("{} [label={}]\n", vm, vm_cores));
            dot.push_str(&format!("{} -- {}\n", host, vm));
            for k in 0..jobs_count.max(0) {
                let (Some(job_cores), Some(_)) = (values.next(), values.next()) else {
                    break 'hosts;
                };
                let job = format!("{}j{}", vm, k);
                dot.push_str(&format!("{} [label={}]\n", job, job_cores));
                dot.push_str(&format!("{} -- {}\n", vm, job));
            }
        }
    }
    dot.push('}');
    dot
}
