use std::fmt;

use super::job::{JobId, JobSnapshot};
use crate::services::decoder::ProtocolError;

/// Why a submission or a tracked job ended in failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The service reported `status = "error"`; carries its message verbatim.
    Remote(String),
    /// A status payload did not match the protocol.
    Protocol(ProtocolError),
    /// The upload call itself failed.
    Submission(String),
    /// Bounded retry was enabled and the status endpoint kept failing.
    RetriesExhausted { attempts: u32, last_error: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Remote(message) => f.write_str(message),
            FailureReason::Protocol(err) => write!(f, "Unexpected job status payload: {err}"),
            FailureReason::Submission(message) => write!(f, "Upload failed: {message}"),
            FailureReason::RetriesExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "Job status unavailable after {attempts} attempts: {last_error}"
            ),
        }
    }
}

/// Message published to the surrounding UI.
///
/// `Succeeded`, `Failed` and `Cancelled` are terminal; a session emits at most one of them.
/// `job_id` is `None` only for outcomes of the upload call itself.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Progress {
        job_id: JobId,
        snapshot: JobSnapshot,
    },
    /// A status fetch failed; polling carries on.
    TransientError {
        job_id: JobId,
        message: String,
        consecutive: u32,
    },
    Succeeded {
        job_id: Option<JobId>,
        document_id: String,
        chunks_created: u64,
    },
    Failed {
        job_id: Option<JobId>,
        reason: FailureReason,
    },
    Cancelled {
        job_id: JobId,
    },
}

impl TrackerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackerEvent::Succeeded { .. }
                | TrackerEvent::Failed { .. }
                | TrackerEvent::Cancelled { .. }
        )
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            TrackerEvent::Progress { job_id, .. }
            | TrackerEvent::TransientError { job_id, .. }
            | TrackerEvent::Cancelled { job_id } => Some(job_id),
            TrackerEvent::Succeeded { job_id, .. } | TrackerEvent::Failed { job_id, .. } => {
                job_id.as_ref()
            }
        }
    }
}
