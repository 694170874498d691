use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque identifier the ingestion service issues for an async indexing job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Wire status of an indexing job, as reported by `GET /jobs/{job_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Done,
    Error,
}

/// Page-level progress of a job that is being indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageProgress {
    pub page_index: u64,
    /// `None` while the service has not counted the pages yet.
    pub total_pages: Option<u64>,
    pub chunks_indexed: Option<u64>,
}

/// Result of a finished indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestResult {
    pub document_id: String,
    pub chunks_created: u64,
    pub filename: Option<String>,
}

/// One decoded status reading for a job.
///
/// Each state carries only the payload that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSnapshot {
    Queued,
    Processing(PageProgress),
    Done(IngestResult),
    Error(String),
}

impl JobSnapshot {
    pub fn state(&self) -> JobState {
        match self {
            JobSnapshot::Queued => JobState::Queued,
            JobSnapshot::Processing(_) => JobState::Processing,
            JobSnapshot::Done(_) => JobState::Done,
            JobSnapshot::Error(_) => JobState::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobSnapshot::Done(_) | JobSnapshot::Error(_))
    }
}

/// Lifecycle of the tracker's current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TrackerState {
    Idle,
    Polling,
    Succeeded,
    Failed,
    Cancelled,
}

impl TrackerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackerState::Succeeded | TrackerState::Failed | TrackerState::Cancelled
        )
    }
}
