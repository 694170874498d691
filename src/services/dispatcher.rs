use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::event::{FailureReason, TrackerEvent};
use crate::models::upload::{UploadFile, UploadOutcome};
use crate::services::api::ApiError;
use crate::services::decoder::{self, ProtocolError};
use crate::services::tracker::{JobTracker, StatusSource, TrackerConfig};

/// Remote operations the dispatcher needs: upload, plus status polling for the tracker.
#[async_trait]
pub trait IngestApi: StatusSource {
    async fn upload(&self, file: UploadFile) -> Result<Value, ApiError>;
}

/// Submits documents and routes each response to the right completion path.
///
/// Holds a single [`JobTracker`], so at most one job is ever being polled; a new
/// async submission always supersedes the previous one.
pub struct Dispatcher<A> {
    api: Arc<A>,
    tracker: JobTracker,
    events: UnboundedSender<TrackerEvent>,
}

impl<A: IngestApi + 'static> Dispatcher<A> {
    /// Build a dispatcher together with the event stream the UI should consume.
    pub fn new(api: Arc<A>, config: TrackerConfig) -> (Self, UnboundedReceiver<TrackerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let source: Arc<dyn StatusSource> = api.clone();
        let tracker = JobTracker::new(source, config, events.clone());

        (
            Self {
                api,
                tracker,
                events,
            },
            receiver,
        )
    }

    pub async fn submit(&mut self, file: UploadFile) -> Result<UploadOutcome, SubmissionError> {
        tracing::info!(
            filename = %file.filename,
            kind = ?file.media_kind(),
            bytes = file.bytes.len(),
            "Submitting document"
        );
        metrics::counter!("ragdesk_uploads_total").increment(1);

        let outcome = match self.upload(file).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.publish_failure(&err);
                return Err(err);
            }
        };

        match &outcome {
            UploadOutcome::Sync {
                document_id,
                chunks_created,
                ..
            } => {
                tracing::info!(
                    document_id = %document_id,
                    chunks_created = *chunks_created,
                    "Document indexed inline"
                );
                self.publish(TrackerEvent::Succeeded {
                    job_id: None,
                    document_id: document_id.clone(),
                    chunks_created: *chunks_created,
                });
            }
            UploadOutcome::Async { job_id, .. } => {
                self.tracker.start(job_id.clone());
            }
        }

        Ok(outcome)
    }

    /// Read `path` from disk and submit it.
    pub async fn submit_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<UploadOutcome, SubmissionError> {
        let path = path.as_ref();
        match UploadFile::from_path(path).await {
            Ok(file) => self.submit(file).await,
            Err(source) => {
                let err = SubmissionError::Read {
                    path: path.to_path_buf(),
                    source,
                };
                self.publish_failure(&err);
                Err(err)
            }
        }
    }

    /// Cancel the job currently being tracked, if any.
    pub fn cancel(&mut self) -> bool {
        self.tracker.cancel()
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadOutcome, SubmissionError> {
        let payload = self.api.upload(file).await?;
        Ok(decoder::decode_upload(&payload)?)
    }

    fn publish_failure(&self, err: &SubmissionError) {
        tracing::error!(error = %err, "Document submission failed");
        self.publish(TrackerEvent::Failed {
            job_id: None,
            reason: FailureReason::Submission(err.to_string()),
        });
    }

    fn publish(&self, event: TrackerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unexpected upload response: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
