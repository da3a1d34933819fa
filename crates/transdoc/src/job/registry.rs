//! Job registry: the single source of truth for known translation jobs.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::RegistryError;
use crate::job::model::{JobPatch, JobStatus, TranslationJob};

/// A job taken out of the registry, kept so the removal can be undone.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedJob {
    pub job: TranslationJob,
    /// Index the job occupied before removal.
    pub position: usize,
}

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn in_flight(&self) -> usize {
        self.pending + self.processing
    }
}

/// Ordered collection of jobs, most recent first. Ids are unique.
#[derive(Debug, Default, Clone)]
pub struct JobRegistry {
    jobs: Vec<TranslationJob>,
    ids: HashSet<String>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job at the head.
    ///
    /// Status updates for known jobs go through [`JobRegistry::upsert`].
    pub fn insert(&mut self, job: TranslationJob) -> Result<(), RegistryError> {
        if self.ids.contains(&job.id) {
            return Err(RegistryError::DuplicateId(job.id));
        }
        self.ids.insert(job.id.clone());
        self.jobs.insert(0, job);
        Ok(())
    }

    /// Merges `patch` into the job with `id` and returns its previous status.
    pub fn upsert(&mut self, id: &str, patch: &JobPatch) -> Result<JobStatus, RegistryError> {
        let job = self
            .jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let previous = job.status();
        job.apply(patch);
        Ok(previous)
    }

    /// Deletes the job with `id`.
    pub fn remove(&mut self, id: &str) -> Result<RemovedJob, RegistryError> {
        let position = self
            .jobs
            .iter()
            .position(|job| job.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let job = self.jobs.remove(position);
        self.ids.remove(&job.id);
        Ok(RemovedJob { job, position })
    }

    /// Puts a removed job back where it was (rollback of an optimistic removal).
    pub fn restore(&mut self, removed: RemovedJob) -> Result<(), RegistryError> {
        if self.ids.contains(&removed.job.id) {
            return Err(RegistryError::DuplicateId(removed.job.id));
        }
        let position = removed.position.min(self.jobs.len());
        self.ids.insert(removed.job.id.clone());
        self.jobs.insert(position, removed.job);
        Ok(())
    }

    /// Returns a lazy view over the jobs matching `predicate`.
    pub fn filter<P>(&self, predicate: P) -> JobView<'_, P>
    where
        P: Fn(&TranslationJob) -> bool,
    {
        JobView {
            jobs: &self.jobs,
            predicate,
        }
    }

    pub fn get(&self, id: &str) -> Option<&TranslationJob> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranslationJob> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Ids and statuses of jobs that still need polling.
    pub fn non_terminal(&self) -> Vec<(String, JobStatus)> {
        self.jobs
            .iter()
            .filter(|job| !job.is_finished())
            .map(|job| (job.id.clone(), job.status()))
            .collect()
    }

    pub fn has_non_terminal(&self) -> bool {
        self.jobs.iter().any(|job| !job.is_finished())
    }

    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for job in &self.jobs {
            match job.status() {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
        self.ids.clear();
    }
}

/// Restartable, read-only view over a filtered registry.
pub struct JobView<'a, P> {
    jobs: &'a [TranslationJob],
    predicate: P,
}

impl<'a, P> JobView<'a, P>
where
    P: Fn(&TranslationJob) -> bool,
{
    /// Starts a fresh pass over the matching jobs.
    pub fn iter(&self) -> impl Iterator<Item = &'a TranslationJob> + '_ {
        self.jobs.iter().filter(move |job| (self.predicate)(*job))
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<TranslationJob> {
        self.iter().cloned().collect()
    }
}

/// Registry shared between the coordinator, the poller and the client state.
///
/// Guards are never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<JobRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, JobRegistry> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, JobRegistry> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn insert(&self, job: TranslationJob) -> Result<(), RegistryError> {
        self.write().insert(job)
    }

    pub fn upsert(&self, id: &str, patch: &JobPatch) -> Result<JobStatus, RegistryError> {
        self.write().upsert(id, patch)
    }

    pub fn remove(&self, id: &str) -> Result<RemovedJob, RegistryError> {
        self.write().remove(id)
    }

    pub fn restore(&self, removed: RemovedJob) -> Result<(), RegistryError> {
        self.write().restore(removed)
    }

    pub fn get(&self, id: &str) -> Option<TranslationJob> {
        self.read().get(id).cloned()
    }

    /// Snapshot of all jobs, most recent first.
    pub fn snapshot(&self) -> Vec<TranslationJob> {
        self.read().iter().cloned().collect()
    }

    pub fn non_terminal(&self) -> Vec<(String, JobStatus)> {
        self.read().non_terminal()
    }

    pub fn has_non_terminal(&self) -> bool {
        self.read().has_non_terminal()
    }

    pub fn counts(&self) -> JobCounts {
        self.read().counts()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}
