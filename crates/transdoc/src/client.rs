//! Application state container.
//!
//! [`ClientState`] owns every piece of client state (session, draft, job
//! registry, poller) and exposes the operations a presentation layer calls.
//! It is constructed explicitly and can be given any backend and token store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{
    HttpBackend, SystemInfo, TmxImport, TmxMatch, TmxSearchRequest, TranslationBackend, User,
};
use crate::config::{validate_config, ClientConfig};
use crate::coordinator::{lock_draft, UploadCoordinator};
use crate::draft::{FileBlob, UploadDraft};
use crate::error::{RegistryError, Result, TransdocError, ValidationError};
use crate::job::{
    JobCounts, JobEventBroadcaster, JobPatch, JobState, JobStatus, JobStatusEvent, SharedRegistry,
    TranslationJob,
};
use crate::poller::StatusPoller;
use crate::session::{FileTokenStore, MemoryTokenStore, Session, SessionState, TokenStore};

pub struct ClientState {
    config: ClientConfig,
    backend: Arc<dyn TranslationBackend>,
    session: Session,
    registry: SharedRegistry,
    draft: Mutex<UploadDraft>,
    events: JobEventBroadcaster,
    poller: Arc<StatusPoller>,
    coordinator: UploadCoordinator,
}

impl ClientState {
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn TranslationBackend>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let registry = SharedRegistry::new();
        let events = JobEventBroadcaster::new(config.event_capacity);
        let poller = Arc::new(StatusPoller::new(
            Arc::clone(&backend),
            registry.clone(),
            events.clone(),
            config.poll_interval(),
        ));
        let coordinator =
            UploadCoordinator::new(Arc::clone(&backend), registry.clone(), Arc::clone(&poller));
        let session = Session::new(Arc::clone(&backend), tokens);

        Self {
            config,
            backend,
            session,
            registry,
            draft: Mutex::new(UploadDraft::new()),
            events,
            poller,
            coordinator,
        }
    }

    /// Builds the production client: HTTP backend and a file token store.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        validate_config(&config)?;
        let backend: Arc<dyn TranslationBackend> = Arc::new(HttpBackend::from_config(&config)?);
        let tokens: Arc<dyn TokenStore> = match config.token_path() {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => {
                warn!("No config directory available, session will not persist");
                Arc::new(MemoryTokenStore::new())
            }
        };
        Ok(Self::new(config, backend, tokens))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn poller(&self) -> &Arc<StatusPoller> {
        &self.poller
    }

    /// Restores a stored session and, if signed in, loads the job history.
    pub async fn start(&self) -> SessionState {
        let state = self.session.restore().await;
        if state.is_authenticated() {
            if let Err(e) = self.refresh_history().await {
                warn!("Failed to load translation history: {}", e);
            }
        }
        state
    }

    /// Stops background work.
    pub fn shutdown(&self) {
        self.poller.stop();
    }

    // Session

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self.session.login(username, password).await?;
        if let Err(e) = self.refresh_history().await {
            warn!("Failed to load translation history after login: {}", e);
        }
        Ok(user)
    }

    /// Signs out and drops everything that belonged to the user.
    pub async fn logout(&self) {
        self.poller.stop();
        self.session.logout().await;
        self.registry.clear();
        *lock_draft(&self.draft) = UploadDraft::new();
    }

    // Draft

    pub fn draft(&self) -> UploadDraft {
        lock_draft(&self.draft).clone()
    }

    pub fn select_file(&self, file: FileBlob) -> bool {
        lock_draft(&self.draft).select_file(file)
    }

    pub async fn select_file_from_path(&self, path: &Path) -> Result<bool> {
        let file = FileBlob::from_path(path).await?;
        Ok(self.select_file(file))
    }

    pub fn select_target_language(&self, language: &str) -> bool {
        lock_draft(&self.draft).select_target_language(language)
    }

    pub fn select_provider(&self, provider: Option<&str>) -> bool {
        lock_draft(&self.draft).select_provider(provider.map(str::to_string))
    }

    pub fn clear_draft(&self) -> bool {
        lock_draft(&self.draft).clear()
    }

    /// Submits the current draft; the draft is reset once the job exists.
    pub async fn submit_upload(&self) -> Result<TranslationJob> {
        self.session.require_user()?;
        let job = self.coordinator.submit(&self.draft).await?;
        *lock_draft(&self.draft) = UploadDraft::new();
        Ok(job)
    }

    // Jobs

    /// Loads the job history and merges it into the registry.
    pub async fn refresh_history(&self) -> Result<usize> {
        self.session.require_user()?;
        let mut jobs: Vec<TranslationJob> = self
            .backend
            .history()
            .await?
            .into_iter()
            .map(|record| record.into_job())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = jobs.len();

        {
            let mut registry = self.registry.write();
            // Oldest first so the newest ends up at the head.
            for job in jobs.into_iter().rev() {
                if registry.contains(&job.id) {
                    let patch = JobPatch::state(job.state)
                        .with_progress(job.progress)
                        .with_details(job.processing_details);
                    registry.upsert(&job.id, &patch)?;
                } else {
                    registry.insert(job)?;
                }
            }
        }

        info!(jobs = total, "Translation history loaded");
        self.poller.ensure_running();
        Ok(total)
    }

    /// Removes a job locally, then on the backend; restored if the backend refuses.
    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        self.session.require_user()?;
        let removed = self.registry.remove(job_id)?;

        match self.backend.delete(job_id).await {
            Ok(()) => {
                info!(job_id = %job_id, "Translation job deleted");
                Ok(())
            }
            Err(e) => {
                warn!(job_id = %job_id, "Delete failed, restoring job: {}", e);
                if let Err(restore_err) = self.registry.restore(removed) {
                    warn!(job_id = %job_id, "Could not restore job: {}", restore_err);
                }
                Err(e)
            }
        }
    }

    /// Fetches the translated document of a completed job.
    pub async fn download(&self, job_id: &str) -> Result<Vec<u8>> {
        self.session.require_user()?;
        let job = self
            .registry
            .get(job_id)
            .ok_or_else(|| RegistryError::NotFound(job_id.to_string()))?;
        let JobState::Completed { download_url } = job.state else {
            return Err(TransdocError::NotReady(job_id.to_string()));
        };
        self.backend.download(&download_url).await
    }

    /// Downloads a completed job's document to `path`.
    pub async fn download_to(&self, job_id: &str, path: &Path) -> Result<usize> {
        let bytes = self.download(job_id).await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| TransdocError::Storage {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(job_id = %job_id, "Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(bytes.len())
    }

    pub fn jobs(&self) -> Vec<TranslationJob> {
        self.registry.snapshot()
    }

    pub fn job(&self, job_id: &str) -> Option<TranslationJob> {
        self.registry.get(job_id)
    }

    pub fn jobs_with_status(&self, status: JobStatus) -> Vec<TranslationJob> {
        self.registry
            .read()
            .filter(|job| job.status() == status)
            .to_vec()
    }

    pub fn job_counts(&self) -> JobCounts {
        self.registry.counts()
    }

    /// Subscribes to job status change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<JobStatusEvent> {
        self.events.subscribe()
    }

    // Translation memory

    /// Adds a `.tmx` file to the backend's translation memory.
    pub async fn import_translation_memory(&self, file: FileBlob) -> Result<TmxImport> {
        if !file.has_extension("tmx") {
            return Err(ValidationError::InvalidTmxFile.into());
        }
        let import = self.backend.upload_tmx(file).await?;
        info!(
            tmx_id = %import.tmx_id,
            units_new = import.units_new,
            units_updated = import.units_updated,
            "Translation memory imported"
        );
        Ok(import)
    }

    pub async fn import_translation_memory_from_path(&self, path: &Path) -> Result<TmxImport> {
        let file = FileBlob::from_path(path).await?;
        self.import_translation_memory(file).await
    }

    /// Looks up stored segments similar to `request.text`.
    pub async fn search_translation_memory(
        &self,
        request: TmxSearchRequest,
    ) -> Result<Vec<TmxMatch>> {
        request.validate()?;
        self.backend.search_translation_memory(request).await
    }

    // Backend configuration

    pub async fn model_selection_allowed(&self) -> Result<bool> {
        self.session.require_user()?;
        self.backend.model_selection_allowed().await
    }

    pub async fn web_translation_services(&self) -> Result<Vec<String>> {
        self.backend.web_translation_services().await
    }

    pub async fn system_info(&self) -> Result<SystemInfo> {
        self.backend.system_info().await
    }
}

impl Drop for ClientState {
    fn drop(&mut self) {
        self.poller.stop();
    }
}
