//! Test harness for exercising the client without a network.
//!
//! `FakeBackend` answers every backend call from a script and records the
//! calls it received. `TestHarness` builds a `ClientState` around it with an
//! in-memory token store and a temp directory for file output.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tempfile::TempDir;
use tokio::sync::Notify;

use transdoc::api::{
    LoginSession, StatusResponse, SystemInfo, TmxImport, TmxMatch, TmxSearchRequest,
    TranslationBackend, TranslationRecord, UploadRequest, User,
};
use transdoc::{ClientConfig, ClientState, FileBlob, MemoryTokenStore, Result, TransdocError};

/// A scripted failure.
#[derive(Debug, Clone)]
pub enum Failure {
    /// Transport failure without a usable message.
    Network,
    /// Structured error body from the backend.
    Backend(String),
    /// Structured error with a specific HTTP status.
    Status(u16, String),
}

impl Failure {
    fn into_error(self) -> TransdocError {
        match self {
            Failure::Network => TransdocError::Network("connection refused".to_string()),
            Failure::Backend(message) => TransdocError::Backend {
                status: Some(400),
                message,
            },
            Failure::Status(status, message) => TransdocError::Backend {
                status: Some(status),
                message,
            },
        }
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    bearer: Option<String>,
    accounts: HashMap<String, (String, String, User)>,
    uploads: VecDeque<std::result::Result<TranslationRecord, Failure>>,
    last_upload: Option<UploadRequest>,
    statuses: HashMap<String, VecDeque<std::result::Result<StatusResponse, Failure>>>,
    status_gates: HashMap<String, Arc<Notify>>,
    status_panics: HashSet<String>,
    upload_gate: Option<Arc<Notify>>,
    history: Vec<TranslationRecord>,
    delete_failure: Option<Failure>,
    logout_failure: Option<Failure>,
    me_failure: Option<Failure>,
    downloads: HashMap<String, Vec<u8>>,
    tmx_import: Option<TmxImport>,
    tmx_uploads: Vec<FileBlob>,
    tmx_matches: Vec<TmxMatch>,
    last_search: Option<TmxSearchRequest>,
}

/// In-memory `TranslationBackend` driven by a script.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend lock poisoned")
    }

    fn record_call(&self, call: impl Into<String>) {
        self.state().calls.push(call.into());
    }

    /// Registers an account; logging in with it yields `token`.
    pub fn add_account(&self, username: &str, password: &str, token: &str) -> User {
        let user = super::builders::user(username);
        self.state().accounts.insert(
            username.to_string(),
            (password.to_string(), token.to_string(), user.clone()),
        );
        user
    }

    pub fn queue_upload(&self, result: std::result::Result<TranslationRecord, Failure>) {
        self.state().uploads.push_back(result);
    }

    /// Queues status answers for a job. The last answer repeats.
    pub fn queue_status(&self, job_id: &str, result: std::result::Result<StatusResponse, Failure>) {
        self.state()
            .statuses
            .entry(job_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Makes status requests for `job_id` wait until the returned gate is notified.
    pub fn hold_status(&self, job_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state()
            .status_gates
            .insert(job_id.to_string(), Arc::clone(&gate));
        gate
    }

    /// Makes the next status request for `job_id` panic, killing the task
    /// that issued it.
    pub fn panic_on_status(&self, job_id: &str) {
        self.state().status_panics.insert(job_id.to_string());
    }

    /// Makes the next upload wait until the returned gate is notified.
    pub fn hold_upload(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state().upload_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn set_history(&self, records: Vec<TranslationRecord>) {
        self.state().history = records;
    }

    pub fn fail_delete(&self, failure: Failure) {
        self.state().delete_failure = Some(failure);
    }

    pub fn fail_logout(&self, failure: Failure) {
        self.state().logout_failure = Some(failure);
    }

    /// Makes `/auth/me` fail regardless of the bearer token.
    pub fn fail_me(&self, failure: Failure) {
        self.state().me_failure = Some(failure);
    }

    /// Serves `bytes` for downloads of `locator`.
    pub fn set_download(&self, locator: &str, bytes: &[u8]) {
        self.state()
            .downloads
            .insert(locator.to_string(), bytes.to_vec());
    }

    pub fn set_tmx_import(&self, import: TmxImport) {
        self.state().tmx_import = Some(import);
    }

    pub fn set_tmx_matches(&self, matches: Vec<TmxMatch>) {
        self.state().tmx_matches = matches;
    }

    pub fn tmx_uploads(&self) -> Vec<FileBlob> {
        self.state().tmx_uploads.clone()
    }

    pub fn last_search(&self) -> Option<TmxSearchRequest> {
        self.state().last_search.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn last_upload(&self) -> Option<UploadRequest> {
        self.state().last_upload.clone()
    }

    pub fn bearer(&self) -> Option<String> {
        self.state().bearer.clone()
    }
}

#[async_trait]
impl TranslationBackend for FakeBackend {
    fn set_bearer_token(&self, token: Option<SecretString>) {
        self.state().bearer = token.map(|t| t.expose_secret().to_string());
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginSession> {
        self.record_call(format!("login:{}", username));
        let account = self.state().accounts.get(username).cloned();
        match account {
            Some((expected, token, user)) if expected == password => Ok(LoginSession {
                token: SecretString::from(token),
                user,
            }),
            _ => Err(Failure::Backend("Invalid username or password".to_string()).into_error()),
        }
    }

    async fn logout(&self) -> Result<()> {
        self.record_call("logout");
        match self.state().logout_failure.clone() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn current_user(&self) -> Result<User> {
        self.record_call("me");
        let state = self.state();
        if let Some(failure) = state.me_failure.clone() {
            return Err(failure.into_error());
        }
        let bearer = state.bearer.clone();
        state
            .accounts
            .values()
            .find(|(_, token, _)| Some(token) == bearer.as_ref())
            .map(|(_, _, user)| user.clone())
            .ok_or_else(|| TransdocError::Backend {
                status: Some(401),
                message: "Not authenticated".to_string(),
            })
    }

    async fn upload(&self, request: UploadRequest) -> Result<TranslationRecord> {
        self.record_call(format!("upload:{}", request.file.name));
        let gate = self.state().upload_gate.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state();
        state.last_upload = Some(request);
        match state.uploads.pop_front() {
            Some(Ok(record)) => Ok(record),
            Some(Err(failure)) => Err(failure.into_error()),
            None => Err(Failure::Network.into_error()),
        }
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse> {
        self.record_call(format!("status:{}", job_id));
        let should_panic = self.state().status_panics.remove(job_id);
        if should_panic {
            panic!("scripted status panic for {}", job_id);
        }
        let gate = self.state().status_gates.get(job_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state();
        let queue = state.statuses.entry(job_id.to_string()).or_default();
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(failure)) => Err(failure.into_error()),
            None => Err(Failure::Network.into_error()),
        }
    }

    async fn history(&self) -> Result<Vec<TranslationRecord>> {
        self.record_call("history");
        Ok(self.state().history.clone())
    }

    async fn delete(&self, job_id: &str) -> Result<()> {
        self.record_call(format!("delete:{}", job_id));
        match self.state().delete_failure.clone() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn download(&self, locator: &str) -> Result<Vec<u8>> {
        self.record_call(format!("download:{}", locator));
        self.state()
            .downloads
            .get(locator)
            .cloned()
            .ok_or_else(|| TransdocError::Backend {
                status: Some(404),
                message: "Translation not found".to_string(),
            })
    }

    async fn upload_tmx(&self, file: FileBlob) -> Result<TmxImport> {
        self.record_call(format!("tmx-upload:{}", file.name));
        let mut state = self.state();
        let mut import = state.tmx_import.clone().unwrap_or_default();
        import.filename = file.name.clone();
        state.tmx_uploads.push(file);
        Ok(import)
    }

    async fn search_translation_memory(&self, request: TmxSearchRequest) -> Result<Vec<TmxMatch>> {
        self.record_call(format!("tmx-search:{}", request.text));
        let mut state = self.state();
        let matches = state
            .tmx_matches
            .iter()
            .filter(|m| m.similarity >= request.threshold)
            .cloned()
            .collect();
        state.last_search = Some(request);
        Ok(matches)
    }

    async fn model_selection_allowed(&self) -> Result<bool> {
        self.record_call("model-selection");
        Ok(true)
    }

    async fn web_translation_services(&self) -> Result<Vec<String>> {
        self.record_call("web-services");
        Ok(vec!["google".to_string(), "deepl".to_string()])
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        self.record_call("system-info");
        Ok(SystemInfo::default())
    }
}

/// A `ClientState` wired to a `FakeBackend`, with a temp directory.
pub struct TestHarness {
    temp_dir: TempDir,
    pub backend: Arc<FakeBackend>,
    pub tokens: Arc<MemoryTokenStore>,
    pub client: ClientState,
}

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "correct-horse";
pub const TOKEN: &str = "token-alice";

impl TestHarness {
    /// Harness with the default 3 second poll interval.
    pub fn new() -> Self {
        Self::with_poll_interval(Duration::from_secs(3))
    }

    pub fn with_poll_interval(interval: Duration) -> Self {
        Self::build(interval, MemoryTokenStore::new())
    }

    /// Harness whose token store already holds `token`.
    pub fn with_stored_token(token: &str) -> Self {
        Self::build(Duration::from_secs(3), MemoryTokenStore::with_token(token))
    }

    /// Harness built from an arbitrary config, bypassing config validation.
    pub fn with_config(config: ClientConfig) -> Self {
        Self::build_with(config, MemoryTokenStore::new())
    }

    fn build(interval: Duration, tokens: MemoryTokenStore) -> Self {
        let config = ClientConfig {
            poll_interval_secs: interval.as_secs().max(1),
            ..Default::default()
        };
        Self::build_with(config, tokens)
    }

    fn build_with(config: ClientConfig, tokens: MemoryTokenStore) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let backend = Arc::new(FakeBackend::new());
        backend.add_account(USERNAME, PASSWORD, TOKEN);
        let tokens = Arc::new(tokens);

        let client = ClientState::new(
            config,
            Arc::clone(&backend) as Arc<dyn TranslationBackend>,
            Arc::clone(&tokens) as Arc<dyn transdoc::TokenStore>,
        );

        Self {
            temp_dir,
            backend,
            tokens,
            client,
        }
    }

    /// Harness that is already signed in, with the login call log cleared.
    pub async fn signed_in() -> Self {
        let harness = Self::new();
        harness
            .client
            .login(USERNAME, PASSWORD)
            .await
            .expect("login should succeed");
        harness.backend.clear_calls();
        harness
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    /// Selects a PDF and a target language.
    pub fn prepare_draft(&self, file_name: &str, language: &str) {
        assert!(self.client.select_file(super::builders::pdf(file_name)));
        assert!(self.client.select_target_language(language));
    }
}
