#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;

use env_logger::Builder;

use cloud_gym::{JobDescriptor, SimulationSettings};

pub fn init_logger() {
    let _ = Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .is_test(true)
        .try_init();
}

pub fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn settings(pairs: &[(&str, &str)]) -> SimulationSettings {
    SimulationSettings::from_map(&options(pairs)).unwrap()
}

pub fn job(id: u64, delay: f64, work_length: i64, cores: i64) -> JobDescriptor {
    JobDescriptor::new(id, delay, work_length, cores)
}

pub const NOOP: [i64; 4] = [0, 0, 0, 0];

pub fn config_path(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}
