use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response, Url};
use serde_json::Value;

use crate::models::document::{DocumentList, DocumentSummary, QueryAnswer};
use crate::models::job::JobId;
use crate::models::upload::UploadFile;
use crate::services::dispatcher::IngestApi;
use crate::services::tracker::StatusSource;

/// HTTP client for the ingestion/answering service.
#[derive(Debug, Clone)]
pub struct IngestClient {
    http: Client,
    base_url: Url,
}

impl IngestClient {
    /// `timeout` bounds connecting and each read, not the whole exchange, so a
    /// streamed answer may take as long as the service keeps sending.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|err| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let http = Client::builder()
            .user_agent(concat!("ragdesk/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(ApiError::InvalidId(bad.to_string()));
        }

        let mut url = self.base_url.clone();
        // Hierarchical base checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// POST the file as multipart field `file` to the endpoint matching its media kind.
    ///
    /// Takes the file by value so its bytes move into the request body.
    pub async fn upload(&self, file: UploadFile) -> Result<Value, ApiError> {
        let kind = file.media_kind();
        let url = self.endpoint(&[kind.upload_path().trim_start_matches('/')])?;

        tracing::debug!(
            filename = %file.filename,
            endpoint = kind.upload_path(),
            bytes = file.bytes.len(),
            "Uploading document"
        );

        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(kind.mime_type())?;
        let form = multipart::Form::new().part("file", part);

        let response = self.http.post(url).multipart(form).send().await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// GET /jobs/{job_id}, returning the raw status payload for the decoder.
    pub async fn job_status(&self, job_id: &JobId) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&["jobs", job_id.as_str()])?)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        let response = self.http.get(self.endpoint(&["documents"])?).send().await?;
        let list: DocumentList = ensure_success(response).await?.json().await?;
        Ok(list.documents)
    }

    /// Ask a question; without `doc_id` the service searches every document.
    pub async fn query(&self, question: &str, doc_id: Option<&str>) -> Result<QueryAnswer, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&["query"])?)
            .query(&query_params(question, doc_id))
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// Stream the plain-text answer of `/query-stream`, handing text to `sink` as it arrives.
    ///
    /// Returns the full answer once the body is exhausted.
    pub async fn query_stream<F>(
        &self,
        question: &str,
        doc_id: Option<&str>,
        mut sink: F,
    ) -> Result<String, ApiError>
    where
        F: FnMut(&str),
    {
        let response = self
            .http
            .get(self.endpoint(&["query-stream"])?)
            .query(&query_params(question, doc_id))
            .send()
            .await?;
        let mut response = ensure_success(response).await?;

        let mut pending = Vec::new();
        let mut answer = String::new();

        while let Some(chunk) = response.chunk().await? {
            pending.extend_from_slice(&chunk);
            let text = drain_utf8(&mut pending);
            if !text.is_empty() {
                sink(&text);
                answer.push_str(&text);
            }
        }

        if !pending.is_empty() {
            let tail = String::from_utf8_lossy(&pending).into_owned();
            sink(&tail);
            answer.push_str(&tail);
        }

        Ok(answer)
    }

    /// GET /pdf/{doc_id}: the raw document bytes.
    pub async fn fetch_document(&self, doc_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&["pdf", doc_id])?)
            .send()
            .await?;

        Ok(ensure_success(response).await?.bytes().await?.to_vec())
    }

    /// URL an external PDF viewer can open at a given page.
    pub fn viewer_url(&self, doc_id: &str, page: u32) -> Result<String, ApiError> {
        let mut url = self.endpoint(&["pdf", doc_id])?;
        url.set_fragment(Some(&format!("page={}", page.max(1))));
        Ok(url.into())
    }
}

#[async_trait]
impl StatusSource for IngestClient {
    async fn fetch_status(&self, job_id: &JobId) -> Result<Value, ApiError> {
        self.job_status(job_id).await
    }
}

#[async_trait]
impl IngestApi for IngestClient {
    async fn upload(&self, file: UploadFile) -> Result<Value, ApiError> {
        IngestClient::upload(self, file).await
    }
}

fn query_params<'a>(question: &'a str, doc_id: Option<&'a str>) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![("q", question)];
    if let Some(doc_id) = doc_id.filter(|id| !id.is_empty()) {
        params.push(("doc_id", doc_id));
    }
    params
}

/// Turn a non-2xx response into `ApiError::Status`, keeping the body text.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Take the longest valid UTF-8 prefix out of `pending`.
///
/// An incomplete trailing sequence stays in the buffer for the next chunk;
/// genuinely invalid bytes are replaced.
fn drain_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                out.push_str(text);
                pending.clear();
                return out;
            }
            Err(err) => {
                let valid = err.valid_up_to();
                match err.error_len() {
                    None => {
                        out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                        pending.drain(..valid);
                        return out;
                    }
                    Some(len) => {
                        out.push_str(&String::from_utf8_lossy(&pending[..valid + len]));
                        pending.drain(..valid + len);
                    }
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid service URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid identifier {0:?}")]
    InvalidId(String),
}
