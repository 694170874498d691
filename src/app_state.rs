use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::AppConfig;
use crate::models::event::TrackerEvent;
use crate::services::api::{ApiError, IngestClient};
use crate::services::dispatcher::Dispatcher;
use crate::services::tracker::TrackerConfig;

/// Shared client state for CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<IngestClient>,
    pub tracker: TrackerConfig,
}

impl AppState {
    pub fn new(client: IngestClient, tracker: TrackerConfig) -> Self {
        Self {
            client: Arc::new(client),
            tracker,
        }
    }

    /// Build the client from configuration, optionally pointing it at another service URL.
    pub fn from_config(config: &AppConfig, base_url: Option<&str>) -> Result<Self, ApiError> {
        let base_url = base_url.unwrap_or(&config.api_base_url);
        let client = IngestClient::new(base_url, config.request_timeout())?;
        Ok(Self::new(client, config.tracker_config()))
    }

    pub fn dispatcher(&self) -> (Dispatcher<IngestClient>, UnboundedReceiver<TrackerEvent>) {
        Dispatcher::new(self.client.clone(), self.tracker.clone())
    }
}
