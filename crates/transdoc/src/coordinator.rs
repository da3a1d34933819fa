//! Turns a validated draft into a tracked translation job.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info, warn};

use crate::api::{TranslationBackend, UploadRequest};
use crate::draft::UploadDraft;
use crate::error::{Result, TransdocError, ValidationError};
use crate::job::{SharedRegistry, TranslationJob};
use crate::poller::StatusPoller;

pub struct UploadCoordinator {
    backend: Arc<dyn TranslationBackend>,
    registry: SharedRegistry,
    poller: Arc<StatusPoller>,
}

impl UploadCoordinator {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        registry: SharedRegistry,
        poller: Arc<StatusPoller>,
    ) -> Self {
        Self {
            backend,
            registry,
            poller,
        }
    }

    /// Submits the draft and seeds the registry with the created job.
    ///
    /// Validation failures leave the draft untouched and send nothing. On a
    /// backend failure the draft moves to `Error` and keeps its file so the
    /// user can retry. The draft is never cleared here.
    pub async fn submit(&self, draft: &Mutex<UploadDraft>) -> Result<TranslationJob> {
        let request = {
            let mut draft = lock_draft(draft);
            if draft.is_uploading() {
                return Err(TransdocError::SubmissionInFlight);
            }
            draft.validate()?;

            let Some(file) = draft.file.clone() else {
                return Err(ValidationError::MissingFile.into());
            };
            draft.mark_uploading();
            UploadRequest {
                file,
                target_language: draft.target_language.trim().to_string(),
                provider: draft.provider.clone(),
            }
        };

        let file_name = request.file.name.clone();
        info!(
            file = %file_name,
            language = %request.target_language,
            size = request.file.size(),
            "Submitting translation"
        );

        let job = match self.backend.upload(request).await {
            Ok(record) => record.into_job(),
            Err(e) => {
                warn!(file = %file_name, "Upload failed: {}", e);
                lock_draft(draft).mark_error(e.user_message());
                return Err(e);
            }
        };

        if let Err(e) = self.registry.insert(job.clone()) {
            error!(job_id = %job.id, "Backend returned a job id that is already tracked: {}", e);
            lock_draft(draft).mark_error(e.to_string());
            return Err(e.into());
        }

        lock_draft(draft).mark_success();
        info!(job_id = %job.id, status = %job.status(), "Translation job created");

        if !job.is_finished() {
            self.poller.ensure_running();
        }

        Ok(job)
    }
}

pub(crate) fn lock_draft(draft: &Mutex<UploadDraft>) -> MutexGuard<'_, UploadDraft> {
    match draft.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Draft lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
