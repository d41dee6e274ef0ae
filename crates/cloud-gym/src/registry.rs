//! Registry of concurrently existing sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::core::config::SimulationSettings;
use crate::core::job::parse_jobs;
use crate::episode::{Episode, ResetResult, StepResult};
use crate::error::{Error, Result};

/// Maps session identifiers to episodes.
///
/// The registry itself may be shared between threads. Calls for different sessions do not block each other, calls
/// for the same session are serialized by its lock.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Episode>>>>,
    created: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session from config options and a JSON array of jobs, returns its identifier.
    pub fn create(&self, config: &HashMap<String, String>, jobs: &str) -> Result<String> {
        let settings = SimulationSettings::from_map(config)?;
        let jobs = parse_jobs(jobs)?;
        let id = format!("Sim{}", self.created.fetch_add(1, Ordering::SeqCst));
        log::info!("{}: created with {} jobs, settings: {:?}", id, jobs.len(), settings);
        let episode = Episode::new(&id, settings, &jobs);
        self.sessions.write().insert(id.clone(), Arc::new(Mutex::new(episode)));
        Ok(id)
    }

    fn session(&self, id: &str) -> Result<Arc<Mutex<Episode>>> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    pub fn reset(&self, id: &str, seed: u64) -> Result<ResetResult> {
        Ok(self.session(id)?.lock().reset(seed))
    }

    pub fn step(&self, id: &str, action: &[i64]) -> Result<StepResult> {
        self.session(id)?.lock().step(action)
    }

    pub fn render(&self, id: &str) -> Result<String> {
        self.session(id)?.lock().render()
    }

    pub fn clock(&self, id: &str) -> Result<f64> {
        Ok(self.session(id)?.lock().clock())
    }

    /// Releases the session and removes it from the registry.
    pub fn close(&self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        session.lock().close();
        Ok(())
    }

    /// Runs a closure on the episode of the session.
    pub fn with_episode<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Episode) -> T,
    {
        let session = self.session(id)?;
        let mut episode = session.lock();
        Ok(f(&mut episode))
    }

    /// Identifiers of existing sessions in creation order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort_by_key(|id| id.trim_start_matches("Sim").parse::<u64>().unwrap_or(u64::MAX));
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
