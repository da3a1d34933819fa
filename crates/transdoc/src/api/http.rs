//! HTTP implementation of the translation backend.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use super::types::{
    ErrorBody, HistoryResponse, LoginRequest, LoginResponse, MeResponse, ModelSelectionResponse,
    ServicesResponse, StatusResponse, SystemInfo, SystemInfoResponse, TmxImport, TmxMatch,
    TmxSearchResponse, TmxUploadResponse, TranslationRecord, UploadResponse, User,
};
use super::{LoginSession, TmxSearchRequest, TranslationBackend, UploadRequest};
use crate::draft::FileBlob;
use crate::config::ClientConfig;
use crate::error::{Result, TransdocError};

/// Maximum length for error bodies written to logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the upload request, which carries the whole file.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Truncates a response body before it reaches the logs.
fn sanitize_error_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

fn create_http_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|e| TransdocError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Converts a non-success response into a backend or network error.
async fn error_from_response(response: Response, what: &str) -> TransdocError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();

    match parsed.message() {
        Some(message) => {
            debug!("{} rejected ({}): {}", what, status, message);
            TransdocError::Backend {
                status: Some(status.as_u16()),
                message,
            }
        }
        None => {
            warn!(
                "{} failed ({}): {}",
                what,
                status,
                sanitize_error_body(&body)
            );
            TransdocError::Network(format!("{} failed ({})", what, status))
        }
    }
}

/// Translation backend reached over HTTP with bearer authentication.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    upload_timeout: Duration,
    token: RwLock<Option<SecretString>>,
}

impl HttpBackend {
    /// Creates a backend for `base_url` with default timeouts.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(
            base_url,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_REQUEST_TIMEOUT,
            DEFAULT_UPLOAD_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
        upload_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: create_http_client(connect_timeout, request_timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_timeout,
            token: RwLock::new(None),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::with_timeouts(
            &config.api_base_url,
            config.connect_timeout(),
            config.request_timeout(),
            config.upload_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        match self.token.read() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a download locator into a URL. Absolute URLs are used as they
    /// are; a path that already carries the base URL's path prefix (e.g.
    /// `/api/...`) is resolved against the origin; other paths are appended
    /// to the base URL.
    fn resolve_locator(&self, locator: &str) -> String {
        let locator = locator.trim();
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return locator.to_string();
        }

        let path = if locator.starts_with('/') {
            locator.to_string()
        } else {
            format!("/{}", locator)
        };

        if let Ok(base) = Url::parse(&self.base_url) {
            let prefix = base.path().trim_end_matches('/');
            if !prefix.is_empty() && path.starts_with(&format!("{}/", prefix)) {
                if let Ok(url) = base.join(&path) {
                    return url.to_string();
                }
            }
        }
        self.url(&path)
    }

    fn file_part(file: FileBlob) -> Result<Part> {
        Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime_type)
            .map_err(|e| TransdocError::Network(format!("Invalid file MIME type: {}", e)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let guard = match self.token.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| TransdocError::Network(format!("{} request failed: {}", what, e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, what).await);
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let response = self.send(self.client.get(self.url(path)), what).await?;
        read_json(response, what).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| TransdocError::Network(format!("Failed to parse {} response: {}", what, e)))
}

#[async_trait]
impl TranslationBackend for HttpBackend {
    fn set_bearer_token(&self, token: Option<SecretString>) {
        let mut guard = match self.token.write() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Bearer token lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = token;
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginSession> {
        info!("Attempting login for user: {}", username);

        let request = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password });
        let response = self.send(request, "Login").await?;
        let login: LoginResponse = read_json(response, "login").await?;

        Ok(LoginSession {
            token: SecretString::from(login.token),
            user: login.user,
        })
    }

    async fn logout(&self) -> Result<()> {
        self.send(self.client.post(self.url("/auth/logout")), "Logout")
            .await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<User> {
        let me: MeResponse = self.get_json("/auth/me", "Session check").await?;
        Ok(me.into_user())
    }

    async fn upload(&self, request: UploadRequest) -> Result<TranslationRecord> {
        info!(
            "Uploading '{}' ({} bytes) for translation to {}",
            request.file.name,
            request.file.size(),
            request.target_language
        );

        let part = Self::file_part(request.file)?;
        let mut form = Form::new()
            .part("file", part)
            .text("targetLanguage", request.target_language);
        if let Some(provider) = request.provider {
            form = form.text("llmProvider", provider);
        }

        let builder = self
            .client
            .post(self.url("/translation/upload"))
            .timeout(self.upload_timeout)
            .multipart(form);
        let response = self.send(builder, "Upload").await?;
        let uploaded: UploadResponse = read_json(response, "upload").await?;

        Ok(uploaded.into_record())
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse> {
        self.get_json(&format!("/translation/status/{}", job_id), "Status poll")
            .await
    }

    async fn history(&self) -> Result<Vec<TranslationRecord>> {
        let history: HistoryResponse = self.get_json("/translation/history", "History").await?;
        Ok(history.translations)
    }

    async fn delete(&self, job_id: &str) -> Result<()> {
        let builder = self
            .client
            .delete(self.url(&format!("/translation/{}", job_id)));
        self.send(builder, "Delete").await?;
        Ok(())
    }

    async fn download(&self, locator: &str) -> Result<Vec<u8>> {
        let url = self.resolve_locator(locator);
        debug!("Downloading translated document from {}", url);
        let response = self.send(self.client.get(url), "Download").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransdocError::Network(format!("Download interrupted: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn upload_tmx(&self, file: FileBlob) -> Result<TmxImport> {
        info!("Uploading translation memory '{}' ({} bytes)", file.name, file.size());

        let form = Form::new().part("file", Self::file_part(file)?);
        let builder = self
            .client
            .post(self.url("/tmx/upload"))
            .timeout(self.upload_timeout)
            .multipart(form);
        let response = self.send(builder, "TMX upload").await?;
        let uploaded: TmxUploadResponse = read_json(response, "TMX upload").await?;

        Ok(uploaded.into_import())
    }

    async fn search_translation_memory(&self, request: TmxSearchRequest) -> Result<Vec<TmxMatch>> {
        let threshold = request.threshold.to_string();
        let fields = [
            ("text", request.text.as_str()),
            ("source_language", request.source_language.as_str()),
            ("target_language", request.target_language.as_str()),
            ("threshold", threshold.as_str()),
        ];
        let builder = self.client.post(self.url("/tmx/search")).form(&fields);
        let response = self.send(builder, "Translation memory search").await?;
        let found: TmxSearchResponse = read_json(response, "translation memory search").await?;

        if let Some(count) = found.match_count {
            if count != found.matches.len() {
                debug!(
                    "Translation memory reported {} matches but returned {}",
                    count,
                    found.matches.len()
                );
            }
        }
        Ok(found.matches)
    }

    async fn model_selection_allowed(&self) -> Result<bool> {
        let response: ModelSelectionResponse = self
            .get_json("/config/model-selection-allowed", "Model selection check")
            .await?;
        Ok(response.allowed)
    }

    async fn web_translation_services(&self) -> Result<Vec<String>> {
        let response: ServicesResponse = self
            .get_json(
                "/config/available-web-translation-services",
                "Web translation services",
            )
            .await?;
        Ok(response.services)
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        let response: SystemInfoResponse =
            self.get_json("/config/system-info", "System info").await?;
        Ok(response.config)
    }
}
