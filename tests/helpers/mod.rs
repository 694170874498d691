//! Test helper utilities for running the client against a mock ingestion service

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use ragdesk::models::event::TrackerEvent;
use ragdesk::services::api::IngestClient;
use ragdesk::services::tracker::TrackerConfig;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Poll fast enough that tests against a live mock finish quickly
pub fn fast_polling() -> TrackerConfig {
    TrackerConfig {
        poll_interval: Duration::from_millis(20),
        max_consecutive_failures: None,
    }
}

pub fn client_for(server: &MockServer) -> IngestClient {
    IngestClient::new(&server.uri(), Duration::from_secs(5)).expect("client should build")
}

/// Replays responses in order, then repeats the last one forever
pub struct Sequence {
    pending: Mutex<VecDeque<ResponseTemplate>>,
    last: ResponseTemplate,
}

impl Sequence {
    pub fn new(mut responses: Vec<ResponseTemplate>) -> Self {
        let last = responses
            .pop()
            .unwrap_or_else(|| ResponseTemplate::new(404));
        let mut pending: VecDeque<_> = responses.into();
        pending.push_back(last.clone());
        Self {
            pending: Mutex::new(pending),
            last,
        }
    }

    pub fn json(payloads: Vec<Value>) -> Self {
        Self::new(
            payloads
                .into_iter()
                .map(|body| ResponseTemplate::new(200).set_body_json(body))
                .collect(),
        )
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.pending
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.last.clone())
    }
}

/// Serve `GET /jobs/{job_id}` from a sequence of payloads
pub async fn mount_job(server: &MockServer, job_id: &str, responses: Sequence) {
    Mock::given(method("GET"))
        .and(path(format!("/jobs/{job_id}")))
        .respond_with(responses)
        .mount(server)
        .await;
}

pub async fn mount_upload(server: &MockServer, endpoint: &str, responses: Sequence) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(responses)
        .mount(server)
        .await;
}

/// Collect events up to and including the first terminal one
pub async fn until_terminal(events: &mut UnboundedReceiver<TrackerEvent>) -> Vec<TrackerEvent> {
    until_terminal_within(events, Duration::from_secs(10)).await
}

pub async fn until_terminal_within(
    events: &mut UnboundedReceiver<TrackerEvent>,
    limit: Duration,
) -> Vec<TrackerEvent> {
    let collected = tokio::time::timeout(limit, async {
        let mut collected = Vec::new();
        while let Some(event) = events.recv().await {
            let terminal = event.is_terminal();
            collected.push(event);
            if terminal {
                break;
            }
        }
        collected
    })
    .await;

    collected.unwrap_or_else(|_| panic!("no terminal event within {limit:?}"))
}

/// Number of requests the mock server received for a path
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
