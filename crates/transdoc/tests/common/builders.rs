//! Builders for backend payloads used across tests.

#![allow(dead_code)]

use transdoc::api::{StatusResponse, TranslationRecord, User};
use transdoc::FileBlob;

/// Builder for `TranslationRecord` as returned by upload and history.
pub struct RecordBuilder {
    record: TranslationRecord,
}

impl RecordBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            record: TranslationRecord {
                id: id.to_string(),
                original_file_name: "report.pdf".to_string(),
                target_language: "es".to_string(),
                status: "pending".to_string(),
                download_url: None,
                error_message: None,
                created_at: Some("2024-01-15T10:30:00".to_string()),
                progress: None,
                processing_details: None,
            },
        }
    }

    pub fn file_name(mut self, name: &str) -> Self {
        self.record.original_file_name = name.to_string();
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.record.target_language = language.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.record.status = status.to_string();
        self
    }

    pub fn download_url(mut self, url: &str) -> Self {
        self.record.download_url = Some(url.to_string());
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.record.error_message = Some(message.to_string());
        self
    }

    pub fn created_at(mut self, timestamp: &str) -> Self {
        self.record.created_at = Some(timestamp.to_string());
        self
    }

    pub fn build(self) -> TranslationRecord {
        self.record
    }
}

/// Shorthand for a record with the given id and status.
pub fn record(id: &str, status: &str) -> TranslationRecord {
    RecordBuilder::new(id).status(status).build()
}

pub fn status(id: &str, status: &str) -> StatusResponse {
    StatusResponse {
        id: Some(id.to_string()),
        status: status.to_string(),
        progress: None,
        download_url: None,
        error_message: None,
    }
}

pub fn completed(id: &str, download_url: &str) -> StatusResponse {
    StatusResponse {
        download_url: Some(download_url.to_string()),
        progress: Some(100.0),
        ..status(id, "completed")
    }
}

pub fn failed(id: &str, message: &str) -> StatusResponse {
    StatusResponse {
        error_message: Some(message.to_string()),
        ..status(id, "failed")
    }
}

pub fn progress(id: &str, value: f32) -> StatusResponse {
    StatusResponse {
        progress: Some(value),
        ..status(id, "processing")
    }
}

pub fn user(username: &str) -> User {
    User {
        id: format!("user-{}", username),
        username: username.to_string(),
        email: Some(format!("{}@example.com", username)),
        display_name: None,
        is_email_user: false,
    }
}

pub fn pdf(name: &str) -> FileBlob {
    FileBlob::new(name, b"%PDF-1.4 test document".to_vec())
}
