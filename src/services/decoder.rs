//! Status protocol decoding.
//!
//! Turns the raw JSON bodies of `GET /jobs/{job_id}` and the upload endpoints into
//! typed values. Every function here is pure.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::models::job::{IngestResult, JobId, JobSnapshot, JobState, PageProgress};
use crate::models::upload::UploadOutcome;

type Object = Map<String, Value>;

/// Decode one job status payload.
///
/// `progress` is only read for `processing`; the service also attaches an
/// all-zero progress block to `queued` jobs, which is ignored.
pub fn decode(payload: &Value) -> Result<JobSnapshot, ProtocolError> {
    let object = payload.as_object().ok_or(ProtocolError::NotAnObject)?;

    let state = match object.get("status") {
        None | Some(Value::Null) => return Err(ProtocolError::MissingStatus),
        Some(Value::String(raw)) => {
            JobState::from_str(raw).map_err(|_| ProtocolError::UnknownStatus(raw.clone()))?
        }
        Some(other) => return Err(ProtocolError::UnknownStatus(other.to_string())),
    };

    match state {
        JobState::Queued => Ok(JobSnapshot::Queued),
        JobState::Processing => {
            let progress = required_object(object, state, "progress")?;
            Ok(JobSnapshot::Processing(PageProgress {
                page_index: optional_count(progress, "page")?.unwrap_or(0),
                total_pages: optional_count(progress, "total_pages")?,
                chunks_indexed: optional_count(progress, "chunks_indexed")?,
            }))
        }
        JobState::Done => {
            let result = required_object(object, state, "result")?;
            Ok(JobSnapshot::Done(IngestResult {
                document_id: required_string(result, state, "doc_id")?,
                chunks_created: optional_count(result, "chunks_created")?.ok_or(
                    ProtocolError::MissingField {
                        state,
                        field: "chunks_created",
                    },
                )?,
                filename: optional_string(result, "filename"),
            }))
        }
        JobState::Error => Ok(JobSnapshot::Error(required_string(object, state, "error")?)),
    }
}

/// Decode a job status body straight from bytes.
pub fn decode_slice(body: &[u8]) -> Result<JobSnapshot, ProtocolError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| ProtocolError::Json(e.to_string()))?;
    decode(&payload)
}

/// Classify an upload response as inline (sync) or queued (async).
///
/// A `job_id` takes precedence: the PDF endpoint returns it together with the
/// `doc_id` it has reserved for the document.
pub fn decode_upload(payload: &Value) -> Result<UploadOutcome, ProtocolError> {
    let object = payload.as_object().ok_or(ProtocolError::NotAnObject)?;

    if let Some(job_id) = optional_string(object, "job_id") {
        if job_id.is_empty() {
            return Err(ProtocolError::InvalidField {
                field: "job_id",
                expected: "a non-empty string",
            });
        }
        return Ok(UploadOutcome::Async {
            job_id: JobId::new(job_id),
            document_id: optional_string(object, "doc_id"),
        });
    }

    let document_id = match object.get("doc_id") {
        Some(Value::String(id)) => id.clone(),
        _ => return Err(ProtocolError::UnrecognizedUpload),
    };
    let chunks_created =
        optional_count(object, "chunks_created")?.ok_or(ProtocolError::UnrecognizedUpload)?;

    Ok(UploadOutcome::Sync {
        document_id,
        chunks_created,
        filename: optional_string(object, "filename"),
    })
}

fn required_object<'a>(
    object: &'a Object,
    state: JobState,
    field: &'static str,
) -> Result<&'a Object, ProtocolError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ProtocolError::MissingField { state, field }),
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(ProtocolError::InvalidField {
            field,
            expected: "an object",
        }),
    }
}

fn required_string(
    object: &Object,
    state: JobState,
    field: &'static str,
) -> Result<String, ProtocolError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ProtocolError::MissingField { state, field }),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ProtocolError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

fn optional_string(object: &Object, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Non-negative integer field; `null` and absence both mean "not reported".
fn optional_count(object: &Object, field: &'static str) -> Result<Option<u64>, ProtocolError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| ProtocolError::InvalidNumber {
                field,
                value: value.to_string(),
            }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("status field is missing")]
    MissingStatus,

    #[error("unknown job status {0:?}")]
    UnknownStatus(String),

    #[error("status {state} requires field `{field}`")]
    MissingField {
        state: JobState,
        field: &'static str,
    },

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` must be a non-negative integer, got {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("upload response carries neither a job_id nor a doc_id with chunks_created")]
    UnrecognizedUpload,
}
