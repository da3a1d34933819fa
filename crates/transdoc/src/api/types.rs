//! Wire types exchanged with the translation backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::job::model::{parse_status, parse_timestamp, JobPatch, JobState, ProcessingDetails};
use crate::job::TranslationJob;

/// Signed-in operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, alias = "isEmailUser")]
    pub is_email_user: bool,
}

impl User {
    /// Name to show in the UI.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// `/auth/me` answers with either the bare user or `{ user }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MeResponse {
    Wrapped { user: User },
    Bare(User),
}

impl MeResponse {
    pub fn into_user(self) -> User {
        match self {
            MeResponse::Wrapped { user } | MeResponse::Bare(user) => user,
        }
    }
}

/// A job as the backend describes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub id: String,
    #[serde(default)]
    pub original_file_name: String,
    #[serde(default)]
    pub target_language: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_details: Option<ProcessingDetails>,
}

impl TranslationRecord {
    pub fn into_job(self) -> TranslationJob {
        let status = parse_status(&self.status, &self.id);
        let state = JobState::from_parts(&self.id, status, self.download_url, self.error_message);
        let created_at = match self.created_at.as_deref() {
            Some(ts) => parse_timestamp(ts),
            None => chrono::Utc::now(),
        };

        TranslationJob {
            id: self.id,
            original_file_name: self.original_file_name,
            target_language: self.target_language,
            state,
            created_at,
            progress: self.progress,
            processing_details: self.processing_details,
        }
    }
}

/// The upload endpoint answers with either the bare job or `{ translation }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UploadResponse {
    Wrapped { translation: TranslationRecord },
    Bare(TranslationRecord),
}

impl UploadResponse {
    pub fn into_record(self) -> TranslationRecord {
        match self {
            UploadResponse::Wrapped { translation } => translation,
            UploadResponse::Bare(record) => record,
        }
    }
}

/// Result of a status poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub progress: Option<f32>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StatusResponse {
    /// Registry patch describing this poll result for `job_id`.
    pub fn into_patch(self, job_id: &str) -> JobPatch {
        let status = parse_status(&self.status, job_id);
        JobPatch::state(JobState::from_parts(
            job_id,
            status,
            self.download_url,
            self.error_message,
        ))
        .with_progress(self.progress)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub translations: Vec<TranslationRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelSelectionResponse {
    pub allowed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServicesResponse {
    #[serde(default)]
    pub services: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SystemInfoResponse {
    pub config: SystemInfo,
}

/// Backend configuration summary from `/config/system-info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    #[serde(default)]
    pub llm_settings: LlmSettings,
    #[serde(default)]
    pub translation_settings: TranslationSettings,
    #[serde(default)]
    pub system_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LlmSettings {
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub available_providers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TranslationSettings {
    #[serde(default)]
    pub default_web_service: Option<String>,
    #[serde(default)]
    pub rag_enabled: Option<bool>,
}

/// Result of importing a TMX file into the translation memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TmxImport {
    /// Id the backend assigned to the uploaded file.
    #[serde(default)]
    pub tmx_id: String,
    #[serde(default)]
    pub filename: String,
    /// Attributes of the TMX `<header>` element.
    #[serde(default)]
    pub header: BTreeMap<String, String>,
    #[serde(default)]
    pub units_parsed: usize,
    #[serde(default)]
    pub units_new: usize,
    #[serde(default)]
    pub units_updated: usize,
    #[serde(default)]
    pub total_units_in_memory: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmxUploadResponse {
    #[serde(default)]
    pub tmx_id: String,
    #[serde(default)]
    pub result: TmxImport,
}

impl TmxUploadResponse {
    pub fn into_import(self) -> TmxImport {
        let mut import = self.result;
        if import.tmx_id.is_empty() {
            import.tmx_id = self.tmx_id;
        }
        import
    }
}

/// A translation-memory segment similar to the searched text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmxMatch {
    pub source_text: String,
    pub target_text: String,
    /// Similarity score between 0 and 1.
    pub similarity: f32,
    #[serde(default)]
    pub unit_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TmxSearchResponse {
    #[serde(default)]
    pub matches: Vec<TmxMatch>,
    #[serde(default)]
    pub match_count: Option<usize>,
}

/// Error body shapes: FastAPI-style `detail` or a plain `message`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Human-readable message, if the body carries a usable one.
    pub fn message(&self) -> Option<String> {
        let detail = match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            // Validation errors arrive as a list of { msg, loc }.
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                (!msgs.is_empty()).then(|| msgs.join("; "))
            }
            _ => None,
        };

        detail
            .or_else(|| self.message.clone())
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    #[test]
    fn test_upload_response_accepts_both_shapes() {
        let wrapped: UploadResponse = serde_json::from_str(
            r#"{"translation":{"id":"job-1","originalFileName":"report.pdf","targetLanguage":"es","status":"processing","createdAt":"2024-01-15T10:30:00"}}"#,
        )
        .unwrap();
        let bare: UploadResponse = serde_json::from_str(
            r#"{"id":"job-1","originalFileName":"report.pdf","targetLanguage":"es","status":"processing","createdAt":"2024-01-15T10:30:00"}"#,
        )
        .unwrap();

        assert_eq!(wrapped.into_record(), bare.into_record());
    }

    #[test]
    fn test_record_into_job_enforces_state_fields() {
        let record = TranslationRecord {
            id: "job-1".to_string(),
            original_file_name: "report.pdf".to_string(),
            target_language: "es".to_string(),
            status: "processing".to_string(),
            download_url: Some("/dl/job-1".to_string()),
            error_message: None,
            created_at: Some("2024-01-15T10:30:00".to_string()),
            progress: Some(20.0),
            processing_details: None,
        };
        let job = record.into_job();
        assert_eq!(job.status(), JobStatus::Processing);
        assert!(job.download_url().is_none());
        assert_eq!(job.progress, Some(20.0));
    }

    #[test]
    fn test_status_response_into_patch() {
        let response: StatusResponse = serde_json::from_str(
            r#"{"id":"job-1","status":"completed","progress":100,"downloadUrl":"/dl/job-1"}"#,
        )
        .unwrap();
        let patch = response.into_patch("job-1");
        assert_eq!(
            patch.state,
            Some(JobState::Completed {
                download_url: "/dl/job-1".to_string()
            })
        );
        assert_eq!(patch.progress, Some(100.0));
    }

    #[test]
    fn test_me_response_shapes() {
        let bare: MeResponse =
            serde_json::from_str(r#"{"id":"u1","username":"admin","email":null,"is_email_user":false}"#)
                .unwrap();
        let wrapped: MeResponse =
            serde_json::from_str(r#"{"user":{"id":"u1","username":"admin"}}"#).unwrap();
        assert_eq!(bare.into_user().id, "u1");
        assert_eq!(wrapped.into_user().username, "admin");
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail":"No API keys configured"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("No API keys configured"));

        let body: ErrorBody =
            serde_json::from_str(r#"{"detail":[{"loc":["body","file"],"msg":"field required"}]}"#)
                .unwrap();
        assert_eq!(body.message().as_deref(), Some("field required"));

        let body: ErrorBody = serde_json::from_str(r#"{"message":"  "}"#).unwrap();
        assert!(body.message().is_none());
    }

    #[test]
    fn test_user_label_prefers_display_name() {
        let mut user = User {
            id: "u1".to_string(),
            username: "admin".to_string(),
            email: None,
            display_name: None,
            is_email_user: false,
        };
        assert_eq!(user.label(), "admin");
        user.display_name = Some("Ada".to_string());
        assert_eq!(user.label(), "Ada");
    }

    #[test]
    fn test_system_info_defaults() {
        let response: SystemInfoResponse = serde_json::from_str(
            r#"{"config":{"llm_settings":{"default_provider":"openai","available_providers":["openai","deepseek"]},"system_version":"1.0.0"}}"#,
        )
        .unwrap();
        assert_eq!(
            response.config.llm_settings.default_provider.as_deref(),
            Some("openai")
        );
        assert_eq!(response.config.translation_settings.rag_enabled, None);
    }

    #[test]
    fn test_tmx_upload_response() {
        let response: TmxUploadResponse = serde_json::from_str(
            r#"{"success":true,"tmx_id":"tmx-1","result":{"filename":"tmx_tmx-1.tmx","header":{"srclang":"en"},"units_parsed":3,"units_new":2,"units_updated":1,"total_units_in_memory":40}}"#,
        )
        .unwrap();
        let import = response.into_import();
        assert_eq!(import.tmx_id, "tmx-1");
        assert_eq!(import.units_new, 2);
        assert_eq!(import.header.get("srclang").map(String::as_str), Some("en"));
    }

    #[test]
    fn test_tmx_search_response() {
        let response: TmxSearchResponse = serde_json::from_str(
            r#"{"success":true,"matches":[{"source_text":"Hello","target_text":"Hola","similarity":0.92,"unit_id":"tu-1"}],"match_count":1}"#,
        )
        .unwrap();
        assert_eq!(response.match_count, Some(1));
        assert_eq!(response.matches[0].target_text, "Hola");
        assert_eq!(response.matches[0].unit_id.as_deref(), Some("tu-1"));
    }
}
