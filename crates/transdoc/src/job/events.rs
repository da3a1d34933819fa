//! Job status notifications for the presentation layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::model::JobStatus;

/// Emitted whenever polling observes a status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusEvent {
    /// Job whose status changed.
    pub job_id: String,
    /// Status held locally before the change.
    pub previous_status: JobStatus,
    /// Status reported by the backend.
    pub new_status: JobStatus,
    /// Failure reason (set when `new_status` is failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the change was observed.
    pub timestamp: DateTime<Utc>,
}

impl JobStatusEvent {
    pub fn new(job_id: &str, previous_status: JobStatus, new_status: JobStatus) -> Self {
        Self {
            job_id: job_id.to_string(),
            previous_status,
            new_status,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error_message: Option<&str>) -> Self {
        if self.new_status == JobStatus::Failed {
            self.error_message = error_message.map(|s| s.to_string());
        }
        self
    }
}

/// Broadcasts job status events to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobStatusEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobStatusEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobStatusEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
