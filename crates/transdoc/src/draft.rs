//! Upload draft: the translation request the user is still composing.

use std::path::Path;

use serde::Serialize;

use crate::error::{Result, TransdocError, ValidationError};

/// A selected file held in memory until submission.
#[derive(Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl FileBlob {
    /// Creates a blob, guessing the MIME type from the file name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            bytes,
            mime_type,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Reads a file from disk.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| TransdocError::Storage {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Case-insensitive check of the file name's extension.
    pub fn has_extension(&self, extension: &str) -> bool {
        Path::new(&self.name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

impl std::fmt::Debug for FileBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBlob")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Submission state of a draft.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Idle,
    Uploading,
    Success,
    Error,
}

/// Not-yet-submitted translation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadDraft {
    pub file: Option<FileBlob>,
    pub target_language: String,
    pub provider: Option<String>,
    status: DraftStatus,
    error_message: Option<String>,
}

impl UploadDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.status == DraftStatus::Uploading
    }

    /// Replaces the selected file. Ignored while uploading.
    pub fn select_file(&mut self, file: FileBlob) -> bool {
        if self.is_uploading() {
            return false;
        }
        self.file = Some(file);
        self.touch();
        true
    }

    /// Sets the target language code. Ignored while uploading.
    pub fn select_target_language(&mut self, language: impl Into<String>) -> bool {
        if self.is_uploading() {
            return false;
        }
        self.target_language = language.into();
        self.touch();
        true
    }

    /// Sets or clears the provider. Ignored while uploading.
    pub fn select_provider(&mut self, provider: Option<String>) -> bool {
        if self.is_uploading() {
            return false;
        }
        self.provider = provider.filter(|p| !p.trim().is_empty());
        self.touch();
        true
    }

    /// Resets to an empty draft. Ignored while uploading.
    pub fn clear(&mut self) -> bool {
        if self.is_uploading() {
            return false;
        }
        *self = Self::default();
        true
    }

    /// Checks the fields a submission needs. The file is checked first.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.file.is_none() {
            return Err(ValidationError::MissingFile);
        }
        if self.target_language.trim().is_empty() {
            return Err(ValidationError::MissingTargetLanguage);
        }
        Ok(())
    }

    pub(crate) fn mark_uploading(&mut self) {
        self.status = DraftStatus::Uploading;
        self.error_message = None;
    }

    pub(crate) fn mark_success(&mut self) {
        self.status = DraftStatus::Success;
        self.error_message = None;
    }

    pub(crate) fn mark_error(&mut self, message: String) {
        self.status = DraftStatus::Error;
        self.error_message = Some(message);
    }

    fn touch(&mut self) {
        self.status = DraftStatus::Idle;
        self.error_message = None;
    }
}
