//! Async ingestion job tracking.
//!
//! A [`JobTracker`] owns at most one [`TrackerSession`]. Each session polls the
//! status of a single job on a fixed cadence and publishes progress and exactly
//! one terminal outcome on the event channel. Starting a new job cancels the
//! previous session before the new poller is spawned.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::models::event::{FailureReason, TrackerEvent};
use crate::models::job::{JobId, JobSnapshot, TrackerState};
use crate::services::api::ApiError;
use crate::services::decoder::{self, ProtocolError};

/// Reference cadence of the ingestion UI.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Source of raw job status payloads (`GET /jobs/{job_id}`).
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &JobId) -> Result<Value, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    /// Fail the job after this many consecutive fetch failures. `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: None,
        }
    }
}

/// State shared between a session handle and its poll task.
///
/// Events are sent while `phase` is locked, so a terminal transition and its
/// event can never interleave with a concurrent cancel.
struct SessionShared {
    job_id: JobId,
    phase: Mutex<TrackerState>,
    events: UnboundedSender<TrackerEvent>,
}

impl SessionShared {
    fn new(job_id: JobId, events: UnboundedSender<TrackerEvent>) -> Self {
        Self {
            job_id,
            phase: Mutex::new(TrackerState::Polling),
            events,
        }
    }

    fn phase(&self) -> TrackerState {
        *self.phase.lock()
    }

    fn is_polling(&self) -> bool {
        self.phase() == TrackerState::Polling
    }

    /// Publish a non-terminal event. Returns false once the session has settled.
    fn notify(&self, event: TrackerEvent) -> bool {
        let phase = self.phase.lock();
        if *phase != TrackerState::Polling {
            return false;
        }
        self.send(event);
        true
    }

    /// Leave `Polling` for `next` and publish `event`. Only the first caller wins.
    fn settle(&self, next: TrackerState, event: TrackerEvent) -> bool {
        let mut phase = self.phase.lock();
        if *phase != TrackerState::Polling {
            return false;
        }
        *phase = next;
        self.send(event);
        drop(phase);

        metrics::counter!("ragdesk_jobs_finished_total", "outcome" => next.to_string())
            .increment(1);
        tracing::info!(job_id = %self.job_id, outcome = %next, "Job tracking finished");
        true
    }

    fn send(&self, event: TrackerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(job_id = %self.job_id, "Event receiver dropped");
        }
    }

    /// Apply the result of one status fetch.
    fn on_fetch(
        &self,
        fetched: Result<Value, ApiError>,
        failures: &mut u32,
        max_failures: Option<u32>,
    ) -> ControlFlow<()> {
        // A fetch that was in flight when the session settled is discarded.
        if !self.is_polling() {
            return ControlFlow::Break(());
        }

        match fetched {
            Ok(payload) => {
                *failures = 0;
                self.on_snapshot(decoder::decode(&payload))
            }
            Err(err) => {
                *failures = failures.saturating_add(1);
                metrics::counter!("ragdesk_status_fetch_failures_total").increment(1);
                tracing::warn!(
                    job_id = %self.job_id,
                    error = %err,
                    consecutive = *failures,
                    "Failed to fetch job status"
                );

                if max_failures.is_some_and(|max| *failures >= max) {
                    self.settle(
                        TrackerState::Failed,
                        TrackerEvent::Failed {
                            job_id: Some(self.job_id.clone()),
                            reason: FailureReason::RetriesExhausted {
                                attempts: *failures,
                                last_error: err.to_string(),
                            },
                        },
                    );
                    return ControlFlow::Break(());
                }

                let still_polling = self.notify(TrackerEvent::TransientError {
                    job_id: self.job_id.clone(),
                    message: err.to_string(),
                    consecutive: *failures,
                });
                if still_polling {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            }
        }
    }

    fn on_snapshot(&self, decoded: Result<JobSnapshot, ProtocolError>) -> ControlFlow<()> {
        let job_id = Some(self.job_id.clone());
        match decoded {
            Ok(snapshot @ (JobSnapshot::Queued | JobSnapshot::Processing(_))) => {
                tracing::debug!(job_id = %self.job_id, state = %snapshot.state(), "Job in progress");
                let still_polling = self.notify(TrackerEvent::Progress {
                    job_id: self.job_id.clone(),
                    snapshot,
                });
                if still_polling {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            }
            Ok(JobSnapshot::Done(result)) => {
                tracing::info!(
                    job_id = %self.job_id,
                    document_id = %result.document_id,
                    chunks_created = result.chunks_created,
                    "Job completed"
                );
                self.settle(
                    TrackerState::Succeeded,
                    TrackerEvent::Succeeded {
                        job_id,
                        document_id: result.document_id,
                        chunks_created: result.chunks_created,
                    },
                );
                ControlFlow::Break(())
            }
            Ok(JobSnapshot::Error(message)) => {
                tracing::warn!(job_id = %self.job_id, error = %message, "Job failed on the service");
                self.settle(
                    TrackerState::Failed,
                    TrackerEvent::Failed {
                        job_id,
                        reason: FailureReason::Remote(message),
                    },
                );
                ControlFlow::Break(())
            }
            Err(err) => {
                tracing::error!(job_id = %self.job_id, error = %err, "Malformed job status payload");
                self.settle(
                    TrackerState::Failed,
                    TrackerEvent::Failed {
                        job_id,
                        reason: FailureReason::Protocol(err),
                    },
                );
                ControlFlow::Break(())
            }
        }
    }
}

/// Poll until the session settles. Fetches run one at a time; ticks that
/// elapse while a fetch is outstanding are skipped.
async fn poll_until_settled(
    shared: Arc<SessionShared>,
    source: Arc<dyn StatusSource>,
    config: TrackerConfig,
) {
    let period = config.poll_interval.max(Duration::from_millis(1));
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut failures = 0;

    loop {
        ticker.tick().await;
        if !shared.is_polling() {
            break;
        }

        metrics::counter!("ragdesk_status_polls_total").increment(1);
        let fetched = source.fetch_status(&shared.job_id).await;
        if shared
            .on_fetch(fetched, &mut failures, config.max_consecutive_failures)
            .is_break()
        {
            break;
        }
    }

    tracing::debug!(job_id = %shared.job_id, state = %shared.phase(), "Poller stopped");
}

/// One tracked job and the poll task bound to it.
///
/// The poll task is aborted when the session is cancelled or dropped.
pub struct TrackerSession {
    shared: Arc<SessionShared>,
    poll_handle: JoinHandle<()>,
}

impl TrackerSession {
    fn spawn(
        job_id: JobId,
        source: Arc<dyn StatusSource>,
        config: TrackerConfig,
        events: UnboundedSender<TrackerEvent>,
    ) -> Self {
        let shared = Arc::new(SessionShared::new(job_id, events));
        let poll_handle = tokio::spawn(poll_until_settled(shared.clone(), source, config));
        Self {
            shared,
            poll_handle,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.shared.job_id
    }

    pub fn state(&self) -> TrackerState {
        self.shared.phase()
    }

    /// Stop polling and publish `Cancelled`. No-op once the session has settled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.settle(
            TrackerState::Cancelled,
            TrackerEvent::Cancelled {
                job_id: self.shared.job_id.clone(),
            },
        );
        self.poll_handle.abort();
        cancelled
    }
}

impl Drop for TrackerSession {
    fn drop(&mut self) {
        self.poll_handle.abort();
    }
}

impl std::fmt::Debug for TrackerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerSession")
            .field("job_id", &self.shared.job_id)
            .field("state", &self.shared.phase())
            .finish()
    }
}

/// Single-slot owner of the current tracking session.
pub struct JobTracker {
    source: Arc<dyn StatusSource>,
    config: TrackerConfig,
    events: UnboundedSender<TrackerEvent>,
    current: Option<TrackerSession>,
}

impl JobTracker {
    pub fn new(
        source: Arc<dyn StatusSource>,
        config: TrackerConfig,
        events: UnboundedSender<TrackerEvent>,
    ) -> Self {
        Self {
            source,
            config,
            events,
            current: None,
        }
    }

    /// Begin tracking `job_id`, cancelling whatever session was still polling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, job_id: JobId) {
        if let Some(previous) = self.current.take() {
            if previous.cancel() {
                tracing::info!(
                    superseded = %previous.job_id(),
                    job_id = %job_id,
                    "Cancelled previous job tracking session"
                );
            }
        }

        tracing::info!(
            job_id = %job_id,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "Tracking ingestion job"
        );
        self.current = Some(TrackerSession::spawn(
            job_id,
            self.source.clone(),
            self.config.clone(),
            self.events.clone(),
        ));
    }

    /// Cancel the current session. Returns false if nothing was polling.
    pub fn cancel(&mut self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|session| session.cancel())
    }

    pub fn state(&self) -> TrackerState {
        self.current
            .as_ref()
            .map_or(TrackerState::Idle, TrackerSession::state)
    }

    pub fn is_polling(&self) -> bool {
        self.state() == TrackerState::Polling
    }

    pub fn current_job(&self) -> Option<&JobId> {
        self.current.as_ref().map(TrackerSession::job_id)
    }
}
