//! Translation jobs: model, registry and status notifications.

pub mod events;
pub mod model;
pub mod registry;

pub use events::{JobEventBroadcaster, JobStatusEvent};
pub use model::{
    default_download_url, JobPatch, JobState, JobStatus, ProcessingDetails, TranslationJob,
};
pub use registry::{JobCounts, JobRegistry, JobView, RemovedJob, SharedRegistry};
