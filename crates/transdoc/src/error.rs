use std::path::PathBuf;
use thiserror::Error;

/// Message shown when a request fails without a usable backend message.
pub const GENERIC_NETWORK_MESSAGE: &str =
    "Network error. Please check your connection and try again.";

#[derive(Error, Debug)]
pub enum TransdocError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Backend { status: Option<u16>, message: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("A submission for this draft is already in flight")]
    SubmissionInFlight,

    #[error("Job '{0}' has no downloadable result yet")]
    NotReady(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error for '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransdocError {
    /// Text the presentation layer shows for this error.
    ///
    /// Backend and validation messages are shown verbatim; transport failures
    /// collapse to a generic retry hint.
    pub fn user_message(&self) -> String {
        match self {
            TransdocError::Network(_) => GENERIC_NETWORK_MESSAGE.to_string(),
            TransdocError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns true for failures raised before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, TransdocError::Validation(_))
    }

    /// Returns true when the backend rejected the credentials themselves.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            TransdocError::Backend {
                status: Some(401 | 403),
                ..
            }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TransdocError::Registry(RegistryError::NotFound(_)))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file required")]
    MissingFile,

    #[error("target language required")]
    MissingTargetLanguage,

    #[error("username and password required")]
    MissingCredentials,

    #[error("file must be a TMX file")]
    InvalidTmxFile,

    #[error("search text required")]
    MissingSearchText,

    #[error("source language required")]
    MissingSourceLanguage,

    #[error("threshold must be between 0 and 1")]
    InvalidThreshold,
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingFile => "file",
            ValidationError::MissingTargetLanguage => "targetLanguage",
            ValidationError::MissingCredentials => "credentials",
            ValidationError::InvalidTmxFile => "file",
            ValidationError::MissingSearchText => "text",
            ValidationError::MissingSourceLanguage => "source_language",
            ValidationError::InvalidThreshold => "threshold",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Job '{0}' not found")]
    NotFound(String),

    #[error("Job '{0}' already exists")]
    DuplicateId(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

pub type Result<T> = std::result::Result<T, TransdocError>;
