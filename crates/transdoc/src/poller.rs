//! Background status polling for in-flight translation jobs.
//!
//! The poller runs as a tokio task that wakes every interval, asks the
//! backend for the status of every non-terminal job and merges the answers
//! into the registry. It stops by itself once nothing is left to watch and
//! is restarted by [`StatusPoller::ensure_running`] when new work appears.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument};

use crate::api::{StatusResponse, TranslationBackend};
use crate::config::schema::MIN_POLL_INTERVAL_SECS;
use crate::error::RegistryError;
use crate::job::{JobEventBroadcaster, JobStatusEvent, SharedRegistry};

/// Counters for one polling sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Status requests issued.
    pub polled: usize,
    /// Jobs whose status changed.
    pub changed: usize,
    /// Requests that failed and will be retried next tick.
    pub failed: usize,
}

#[derive(Default)]
struct PollerControl {
    running: bool,
    handle: Option<JoinHandle<()>>,
}

pub struct StatusPoller {
    backend: Arc<dyn TranslationBackend>,
    registry: SharedRegistry,
    events: JobEventBroadcaster,
    interval: Duration,
    control: Mutex<PollerControl>,
}

impl StatusPoller {
    /// Creates an idle poller. Intervals below one second are raised to one
    /// second.
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        registry: SharedRegistry,
        events: JobEventBroadcaster,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            registry,
            events,
            interval: interval.max(Duration::from_secs(MIN_POLL_INTERVAL_SECS)),
            control: Mutex::new(PollerControl::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        let mut control = self.lock_control();
        Self::reap(&mut control);
        control.running
    }

    /// Starts the polling task unless it is already running or there is
    /// nothing to poll. Returns true if a task was spawned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ensure_running(self: &Arc<Self>) -> bool {
        let mut control = self.lock_control();
        Self::reap(&mut control);
        if control.running {
            return false;
        }
        if !self.registry.has_non_terminal() {
            debug!("No in-flight jobs, status poller stays idle");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot start status poller outside a tokio runtime: {}", e);
                return false;
            }
        };

        let poller = Arc::clone(self);
        let span = tracing::info_span!("status_poller", interval_ms = self.interval.as_millis() as u64);
        control.running = true;
        control.handle = Some(runtime.spawn(poller.run().instrument(span)));
        info!("Status poller started");
        true
    }

    /// Cancels the polling task if one is running.
    pub fn stop(&self) {
        let mut control = self.lock_control();
        control.running = false;
        if let Some(handle) = control.handle.take() {
            handle.abort();
            info!("Status poller stopped");
        }
    }

    /// Runs one polling sweep over a snapshot of the in-flight jobs.
    pub async fn tick(&self) -> TickOutcome {
        let targets = self.registry.non_terminal();
        let mut outcome = TickOutcome::default();
        if targets.is_empty() {
            return outcome;
        }

        let requests = targets.iter().map(|(id, _)| async move {
            let result = self.backend.status(id).await;
            (id.as_str(), result)
        });

        for (id, result) in join_all(requests).await {
            outcome.polled += 1;
            match result {
                Ok(response) => {
                    if self.apply(id, response) {
                        outcome.changed += 1;
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    warn!(job_id = %id, "Status request failed, retrying next tick: {}", e);
                }
            }
        }

        debug!(
            polled = outcome.polled,
            changed = outcome.changed,
            failed = outcome.failed,
            "Status sweep finished"
        );
        outcome
    }

    /// Merges a poll result into the registry; returns true on a status change.
    fn apply(&self, id: &str, response: StatusResponse) -> bool {
        let patch = response.into_patch(id);
        let Some(state) = patch.state.clone() else {
            return false;
        };

        match self.registry.upsert(id, &patch) {
            // A finished job never changes status, so there is nothing to report.
            Ok(previous) if previous != state.status() && !previous.is_terminal() => {
                info!(
                    job_id = %id,
                    from = %previous,
                    to = %state.status(),
                    "Job status changed"
                );
                self.events.send(
                    JobStatusEvent::new(id, previous, state.status())
                        .with_error(state.error_message()),
                );
                true
            }
            Ok(_) => false,
            Err(RegistryError::NotFound(_)) => {
                debug!(job_id = %id, "Job removed while its status was being polled");
                false
            }
            Err(e) => {
                warn!(job_id = %id, "Failed to record job status: {}", e);
                false
            }
        }
    }

    async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // skip immediate first tick

        loop {
            ticker.tick().await;
            self.tick().await;

            if self.finish_if_idle() {
                info!("All jobs finished, status poller exiting");
                break;
            }
        }
    }

    /// Marks the task as finished when nothing is left to poll. Checked under
    /// the control lock so a concurrent `ensure_running` either sees the task
    /// still running or starts a new one.
    fn finish_if_idle(&self) -> bool {
        let mut control = self.lock_control();
        if self.registry.has_non_terminal() {
            return false;
        }
        control.running = false;
        control.handle = None;
        true
    }

    /// Clears the running flag when the task ended without going through
    /// `finish_if_idle`, e.g. after a panic.
    fn reap(control: &mut PollerControl) {
        let finished = control
            .handle
            .as_ref()
            .is_some_and(|handle| handle.is_finished());
        if finished {
            warn!("Status poller task ended unexpectedly");
            control.running = false;
            control.handle = None;
        }
    }

    fn lock_control(&self) -> MutexGuard<'_, PollerControl> {
        match self.control.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Status poller lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_control().handle.take() {
            handle.abort();
        }
    }
}
