//! Status text and citation formatting for the surrounding UI.

use crate::models::document::SourceRef;
use crate::models::event::{FailureReason, TrackerEvent};
use crate::models::job::JobSnapshot;

pub const UPLOADING: &str = "Uploading…";

/// Human-readable status line for an event; `None` for events the user should not see.
pub fn status_line(event: &TrackerEvent) -> Option<String> {
    match event {
        TrackerEvent::Progress { snapshot, .. } => Some(match snapshot {
            JobSnapshot::Queued => "Queued for indexing…".to_string(),
            JobSnapshot::Processing(progress) => format!(
                "Indexing… page {} / {}",
                progress.page_index,
                progress
                    .total_pages
                    .map_or_else(|| "?".to_string(), |total| total.to_string())
            ),
            // Terminal snapshots never travel as progress.
            JobSnapshot::Done(_) | JobSnapshot::Error(_) => return None,
        }),
        TrackerEvent::TransientError { .. } => {
            Some("Failed to fetch job status, retrying…".to_string())
        }
        TrackerEvent::Succeeded { chunks_created, .. } => {
            Some(format!("✅ Indexed {chunks_created} chunks"))
        }
        TrackerEvent::Failed {
            reason: FailureReason::Submission(_),
            ..
        } => Some("❌ Upload failed".to_string()),
        TrackerEvent::Failed { reason, .. } => Some(format!("❌ {reason}")),
        TrackerEvent::Cancelled { .. } => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            70..=u8::MAX => ConfidenceLevel::High,
            40..=69 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }
}

/// Confidence in `[0, 1]` as a whole percentage, clamped to `0..=100`.
pub fn confidence_percent(confidence: Option<f64>) -> Option<u8> {
    let value = confidence.filter(|v| v.is_finite())?;
    Some((value * 100.0).round().clamp(0.0, 100.0) as u8)
}

/// First eight characters of a document id, as shown next to file names.
pub fn short_id(doc_id: &str) -> &str {
    match doc_id.char_indices().nth(8) {
        Some((end, _)) => &doc_id[..end],
        None => doc_id,
    }
}

/// `filename • abcd1234 • page 3`, omitting the parts the source lacks.
pub fn source_label(source: &SourceRef) -> String {
    let mut label = source
        .filename
        .clone()
        .unwrap_or_else(|| "document".to_string());
    if let Some(doc_id) = source.doc_id.as_deref().filter(|id| !id.is_empty()) {
        label.push_str(" • ");
        label.push_str(short_id(doc_id));
    }
    if let Some(page) = source.page.filter(|page| *page > 0) {
        label.push_str(&format!(" • page {page}"));
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{JobId, PageProgress};
    use crate::services::decoder::ProtocolError;

    fn progress(snapshot: JobSnapshot) -> TrackerEvent {
        TrackerEvent::Progress {
            job_id: JobId::new("j1"),
            snapshot,
        }
    }

    #[test]
    fn test_progress_lines() {
        assert_eq!(
            status_line(&progress(JobSnapshot::Queued)).as_deref(),
            Some("Queued for indexing…")
        );
        assert_eq!(
            status_line(&progress(JobSnapshot::Processing(PageProgress {
                page_index: 3,
                total_pages: Some(10),
                chunks_indexed: None,
            })))
            .as_deref(),
            Some("Indexing… page 3 / 10")
        );
        assert_eq!(
            status_line(&progress(JobSnapshot::Processing(PageProgress::default()))).as_deref(),
            Some("Indexing… page 0 / ?")
        );
    }

    #[test]
    fn test_terminal_lines() {
        let succeeded = TrackerEvent::Succeeded {
            job_id: None,
            document_id: "x".into(),
            chunks_created: 5,
        };
        assert_eq!(status_line(&succeeded).as_deref(), Some("✅ Indexed 5 chunks"));

        let remote = TrackerEvent::Failed {
            job_id: Some(JobId::new("j1")),
            reason: FailureReason::Remote("OCR failed".into()),
        };
        assert_eq!(status_line(&remote).as_deref(), Some("❌ OCR failed"));

        let upload = TrackerEvent::Failed {
            job_id: None,
            reason: FailureReason::Submission("connection refused".into()),
        };
        assert_eq!(status_line(&upload).as_deref(), Some("❌ Upload failed"));

        let protocol = TrackerEvent::Failed {
            job_id: Some(JobId::new("j1")),
            reason: FailureReason::Protocol(ProtocolError::MissingStatus),
        };
        assert!(status_line(&protocol).unwrap().starts_with("❌ Unexpected job status payload"));
    }

    #[test]
    fn test_cancelled_is_silent() {
        let cancelled = TrackerEvent::Cancelled {
            job_id: JobId::new("j1"),
        };
        assert_eq!(status_line(&cancelled), None);
    }

    #[test]
    fn test_confidence_percent_rounds_and_clamps() {
        assert_eq!(confidence_percent(None), None);
        assert_eq!(confidence_percent(Some(f64::NAN)), None);
        assert_eq!(confidence_percent(Some(0.694)), Some(69));
        assert_eq!(confidence_percent(Some(0.696)), Some(70));
        assert_eq!(confidence_percent(Some(1.7)), Some(100));
        assert_eq!(confidence_percent(Some(-0.2)), Some(0));
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_percent(70), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_percent(69), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_percent(40), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_percent(39), ConfidenceLevel::Low);
    }

    #[test]
    fn test_source_label() {
        let full = SourceRef {
            filename: Some("manual.pdf".into()),
            doc_id: Some("0123456789abcdef".into()),
            page: Some(12),
            score: None,
            preview: None,
        };
        assert_eq!(source_label(&full), "manual.pdf • 01234567 • page 12");

        let bare = SourceRef {
            filename: None,
            doc_id: None,
            page: None,
            score: None,
            preview: Some("...".into()),
        };
        assert_eq!(source_label(&bare), "document");
        assert_eq!(short_id("abc"), "abc");
    }
}
