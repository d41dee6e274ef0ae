//! Elastic cloud datacenter simulation driven by a provisioning agent.
//!
//! An agent creates and destroys VMs of three size classes while a stream of jobs arrives. Each step advances a
//! discrete-event simulation by a fixed timestep and returns a fixed-shape observation with a reward that
//! penalizes job waiting and idle capacity.

pub mod core;
pub mod episode;
pub mod error;
pub mod registry;
pub mod simulation;

pub use crate::core::config::SimulationSettings;
pub use crate::core::job::JobDescriptor;
pub use episode::{Action, Episode, EpisodeState, ResetResult, StepInfo, StepResult};
pub use error::{Error, Result};
pub use registry::SessionRegistry;
pub use simulation::CloudSimulation;
