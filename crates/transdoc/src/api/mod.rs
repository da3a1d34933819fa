//! Translation backend interface.
//!
//! The lifecycle code only talks to [`TranslationBackend`]; [`HttpBackend`]
//! is the production implementation over HTTP.

pub mod http;
pub mod types;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::draft::FileBlob;
use crate::error::{Result, ValidationError};

pub use http::HttpBackend;
pub use types::{
    LlmSettings, StatusResponse, SystemInfo, TmxImport, TmxMatch, TranslationRecord,
    TranslationSettings, User,
};

/// Everything the upload endpoint needs.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: FileBlob,
    pub target_language: String,
    pub provider: Option<String>,
}

/// Form fields of a translation-memory search.
#[derive(Debug, Clone, PartialEq)]
pub struct TmxSearchRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
    /// Minimum similarity, 0 to 1.
    pub threshold: f32,
}

impl TmxSearchRequest {
    pub const DEFAULT_THRESHOLD: f32 = 0.7;

    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Checks the fields in form order.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::MissingSearchText);
        }
        if self.source_language.trim().is_empty() {
            return Err(ValidationError::MissingSourceLanguage);
        }
        if self.target_language.trim().is_empty() {
            return Err(ValidationError::MissingTargetLanguage);
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ValidationError::InvalidThreshold);
        }
        Ok(())
    }
}

/// Successful login: the bearer token and the signed-in user.
#[derive(Debug)]
pub struct LoginSession {
    pub token: SecretString,
    pub user: User,
}

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Sets the bearer token attached to subsequent requests.
    fn set_bearer_token(&self, token: Option<SecretString>);

    async fn login(&self, username: &str, password: &str) -> Result<LoginSession>;

    async fn logout(&self) -> Result<()>;

    async fn current_user(&self) -> Result<User>;

    async fn upload(&self, request: UploadRequest) -> Result<TranslationRecord>;

    async fn status(&self, job_id: &str) -> Result<StatusResponse>;

    async fn history(&self) -> Result<Vec<TranslationRecord>>;

    async fn delete(&self, job_id: &str) -> Result<()>;

    /// Fetches a finished document. `locator` is the job's download URL,
    /// either absolute or a path on the backend.
    async fn download(&self, locator: &str) -> Result<Vec<u8>>;

    /// Adds a TMX file to the backend's translation memory.
    async fn upload_tmx(&self, file: FileBlob) -> Result<TmxImport>;

    async fn search_translation_memory(&self, request: TmxSearchRequest) -> Result<Vec<TmxMatch>>;

    async fn model_selection_allowed(&self) -> Result<bool>;

    async fn web_translation_services(&self) -> Result<Vec<String>>;

    async fn system_info(&self) -> Result<SystemInfo>;
}
