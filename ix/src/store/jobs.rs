//! Durable registry of named jobs

use keystore::KeyValueStore;
use tracing::{debug, info};

use super::StoreError;
use crate::domain::{Idea, Job};

/// Durable key holding all jobs as a JSON array
pub const JOBS_KEY: &str = "jobs";

/// Jobs keyed by name, persisted on every mutation
pub struct JobRegistry {
    kv: Box<dyn KeyValueStore>,
}

impl JobRegistry {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn load(&self) -> Result<Vec<Job>, StoreError> {
        match self.kv.get(JOBS_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
                key: JOBS_KEY.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, jobs: &[Job]) -> Result<(), StoreError> {
        debug!(count = jobs.len(), "JobRegistry::save: called");
        let json = serde_json::to_string(jobs).map_err(|source| StoreError::Encode {
            key: JOBS_KEY.to_string(),
            source,
        })?;
        self.kv.set(JOBS_KEY, &json)?;
        Ok(())
    }

    fn modify<F>(&mut self, name: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.load()?;
        let job = jobs
            .iter_mut()
            .find(|j| j.name == name)
            .ok_or_else(|| StoreError::JobNotFound(name.to_string()))?;
        f(job);
        self.save(&jobs)
    }

    /// Insert a job, replacing any job with the same name
    pub fn upsert(&mut self, job: Job) -> Result<(), StoreError> {
        debug!(name = %job.name, "JobRegistry::upsert: called");
        let mut jobs = self.load()?;
        match jobs.iter_mut().find(|j| j.name == job.name) {
            Some(existing) => {
                debug!("JobRegistry::upsert: replacing existing job");
                *existing = job;
            }
            None => {
                info!(name = %job.name, "Created job");
                jobs.push(job);
            }
        }
        self.save(&jobs)
    }

    pub fn get(&self, name: &str) -> Result<Option<Job>, StoreError> {
        debug!(%name, "JobRegistry::get: called");
        Ok(self.load()?.into_iter().find(|j| j.name == name))
    }

    /// Jobs newest first; archived jobs only when asked for
    pub fn list(&self, include_archived: bool) -> Result<Vec<Job>, StoreError> {
        debug!(%include_archived, "JobRegistry::list: called");
        let mut jobs: Vec<Job> = self
            .load()?
            .into_iter()
            .filter(|j| include_archived || !j.archived)
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    pub fn set_ideas(&mut self, name: &str, ideas: Vec<Idea>) -> Result<(), StoreError> {
        debug!(%name, count = ideas.len(), "JobRegistry::set_ideas: called");
        self.modify(name, |job| job.ideas = ideas)
    }

    pub fn archive(&mut self, name: &str, archived: bool) -> Result<(), StoreError> {
        debug!(%name, %archived, "JobRegistry::archive: called");
        self.modify(name, |job| job.archived = archived)
    }

    /// Delete a job; returns whether it existed
    pub fn delete(&mut self, name: &str) -> Result<bool, StoreError> {
        debug!(%name, "JobRegistry::delete: called");
        let mut jobs = self.load()?;
        let before = jobs.len();
        jobs.retain(|j| j.name != name);
        if jobs.len() == before {
            return Ok(false);
        }
        self.save(&jobs)?;
        info!(%name, "Deleted job");
        Ok(true)
    }
}
