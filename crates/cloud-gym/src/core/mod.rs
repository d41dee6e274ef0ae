pub mod admission;
pub mod broker;
pub mod common;
pub mod components;
pub mod config;
pub mod cost;
pub mod datacenter;
pub mod events;
pub mod history;
pub mod host;
pub mod job;
pub mod job_ledger;
pub mod job_scheduler;
pub mod metrics;
pub mod orchestrator;
pub mod placement;
pub mod reward;
pub mod vm;
pub mod vm_counter;
pub mod vm_lifecycle;
