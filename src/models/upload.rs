use std::path::Path;

use super::job::JobId;

/// Media type of an uploaded document, inferred from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    Text,
}

impl MediaKind {
    /// Anything that is not a `.pdf` goes through the plain-text ingestion path.
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_ascii_lowercase().ends_with(".pdf") {
            MediaKind::Pdf
        } else {
            MediaKind::Text
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Pdf => "application/pdf",
            MediaKind::Text => "text/plain",
        }
    }

    /// Upload endpoint on the ingestion service.
    pub fn upload_path(&self) -> &'static str {
        match self {
            MediaKind::Pdf => "/upload-pdf",
            MediaKind::Text => "/upload",
        }
    }
}

/// A document held in memory, ready to be submitted.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its final path component as the name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self { filename, bytes })
    }

    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_filename(&self.filename)
    }
}

/// How the service answered an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Small inputs are indexed inline and the result comes back immediately.
    Sync {
        document_id: String,
        chunks_created: u64,
        filename: Option<String>,
    },
    /// Large inputs are queued; the job must be polled until it settles.
    Async {
        job_id: JobId,
        document_id: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_filename("report.pdf"), MediaKind::Pdf);
        assert_eq!(MediaKind::from_filename("REPORT.PDF"), MediaKind::Pdf);
        assert_eq!(MediaKind::from_filename("notes.txt"), MediaKind::Text);
        assert_eq!(MediaKind::from_filename("pdf"), MediaKind::Text);
        assert_eq!(MediaKind::from_filename("archive.pdf.txt"), MediaKind::Text);
    }

    #[test]
    fn test_media_kind_routes() {
        assert_eq!(MediaKind::Pdf.upload_path(), "/upload-pdf");
        assert_eq!(MediaKind::Text.upload_path(), "/upload");
        assert_eq!(MediaKind::Pdf.mime_type(), "application/pdf");
    }

    #[tokio::test]
    async fn test_from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Manual.PDF");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.filename, "Manual.PDF");
        assert_eq!(file.bytes, b"%PDF-1.4");
        assert_eq!(file.media_kind(), MediaKind::Pdf);
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = UploadFile::from_path(dir.path().join("absent.txt")).await;
        assert!(result.is_err());
    }
}
