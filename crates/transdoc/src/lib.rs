pub mod api;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod draft;
pub mod error;
pub mod job;
pub mod logging;
pub mod poller;
pub mod session;

pub use api::{
    HttpBackend, StatusResponse, SystemInfo, TmxImport, TmxMatch, TmxSearchRequest,
    TranslationBackend, TranslationRecord, User,
};
pub use client::ClientState;
pub use config::{load_config, ClientConfig, LoggingConfig};
pub use coordinator::UploadCoordinator;
pub use draft::{DraftStatus, FileBlob, UploadDraft};
pub use error::{ConfigError, RegistryError, Result, TransdocError, ValidationError};
pub use job::{
    JobEventBroadcaster, JobPatch, JobRegistry, JobState, JobStatus, JobStatusEvent,
    SharedRegistry, TranslationJob,
};
pub use logging::init_logging;
pub use poller::{StatusPoller, TickOutcome};
pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionState, TokenStore};
