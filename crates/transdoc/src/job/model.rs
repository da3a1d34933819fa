//! Translation job model.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a translation job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true once the job can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Processing => write!(f, "Processing"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Lifecycle state with the data that only exists in that state.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed {
        #[serde(rename = "downloadUrl")]
        download_url: String,
    },
    Failed {
        #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
}

impl JobState {
    /// Builds a state from the loose wire fields.
    ///
    /// Fields that do not belong to `status` are dropped. A completed job
    /// without a locator gets the default download path.
    pub fn from_parts(
        job_id: &str,
        status: JobStatus,
        download_url: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        match status {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Processing => JobState::Processing,
            JobStatus::Completed => JobState::Completed {
                download_url: download_url
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| default_download_url(job_id)),
            },
            JobStatus::Failed => JobState::Failed {
                error_message: error_message.filter(|msg| !msg.trim().is_empty()),
            },
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Processing => JobStatus::Processing,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn download_url(&self) -> Option<&str> {
        match self {
            JobState::Completed { download_url } => Some(download_url),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            JobState::Failed { error_message } => error_message.as_deref(),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

/// Backend processing metadata. Informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_chunks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

/// A submitted translation request tracked by the backend.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationJob {
    /// Unique job identifier.
    pub id: String,
    /// Name of the uploaded file.
    pub original_file_name: String,
    /// Target language code.
    pub target_language: String,
    /// Current lifecycle state.
    #[serde(flatten)]
    pub state: JobState,
    /// When the backend created the job.
    pub created_at: DateTime<Utc>,
    /// Last reported progress, 0 to 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_details: Option<ProcessingDetails>,
}

impl TranslationJob {
    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn download_url(&self) -> Option<&str> {
        self.state.download_url()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.state.error_message()
    }

    /// Merges a patch into this job.
    ///
    /// A finished job keeps its status: a state patch naming a different
    /// status is dropped, while progress and details still merge. Returns
    /// false when the state part was dropped.
    pub fn apply(&mut self, patch: &JobPatch) -> bool {
        let mut applied = true;
        if let Some(state) = &patch.state {
            if self.state.is_terminal() && state.status() != self.status() {
                log::debug!(
                    "Ignoring {} for finished job {} ({})",
                    state.status(),
                    self.id,
                    self.status()
                );
                applied = false;
            } else {
                self.state = state.clone();
            }
        }
        if let Some(progress) = patch.progress {
            self.progress = Some(progress.clamp(0.0, 100.0));
        }
        if let Some(details) = &patch.processing_details {
            self.processing_details = Some(details.clone());
        }
        applied
    }
}

/// Partial update for a registry entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub state: Option<JobState>,
    pub progress: Option<f32>,
    pub processing_details: Option<ProcessingDetails>,
}

impl JobPatch {
    pub fn state(state: JobState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: Option<f32>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_details(mut self, details: Option<ProcessingDetails>) -> Self {
        self.processing_details = details;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.progress.is_none() && self.processing_details.is_none()
    }
}

/// Download path the backend serves for a job.
pub fn default_download_url(job_id: &str) -> String {
    format!("/translation/download/{}", job_id)
}

pub(crate) fn parse_status(s: &str, job_id: &str) -> JobStatus {
    match s.trim().to_ascii_lowercase().as_str() {
        "pending" | "queued" => JobStatus::Pending,
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        other => {
            log::warn!(
                "Unknown job status '{}' for job {}, defaulting to Pending",
                other,
                job_id
            );
            JobStatus::Pending
        }
    }
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    // Naive ISO timestamps are taken as UTC.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}
