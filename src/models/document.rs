use serde::{Deserialize, Serialize};

/// An indexed document, as listed by `GET /documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    #[serde(default = "default_filename")]
    pub filename: String,
}

fn default_filename() -> String {
    "document".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DocumentList {
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
}

/// Answer returned by `GET /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    /// In `[0, 1]`; absent when the service could not score the answer.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// A retrieved chunk cited in an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub preview: Option<String>,
}

impl SourceRef {
    /// A source can be opened in the viewer only when it names both a document and a page.
    pub fn viewer_target(&self) -> Option<(&str, u32)> {
        match (self.doc_id.as_deref(), self.page) {
            (Some(doc_id), Some(page)) if page > 0 => Some((doc_id, page)),
            _ => None,
        }
    }
}
