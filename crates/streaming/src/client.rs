//! HTTP access to the herding backend.

use std::time::Duration;

use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use scene::{Job, JobId, StateSnapshot, Target, TargetPatch};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::FeedError;
use crate::feed::{BoxFuture, FeedTransport, PushEvent, PushStream};

#[derive(Debug, Clone)]
pub struct HerdClient {
    http: reqwest::Client,
    config: ClientConfig,
    request_timeout: Duration,
}

impl HerdClient {
    pub fn new(config: ClientConfig) -> Result<Self, FeedError> {
        if config.base_url.trim().is_empty() {
            return Err(FeedError::InvalidConfig("base_url is empty".to_string()));
        }
        let request_timeout = Duration::from_millis(config.request_timeout_ms.max(1));
        // Only the connect phase is bounded globally; the push feed is an
        // open-ended response and gets no overall timeout.
        let http = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            request_timeout,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get_state(&self) -> Result<StateSnapshot, FeedError> {
        let url = self.config.state_url();
        let resp = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let body = check_status(resp)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Opens the event stream. Resolves once the response headers arrive,
    /// which is the feed's open signal.
    pub async fn open_events(&self) -> Result<PushStream, FeedError> {
        let url = self.config.stream_url();
        debug!("opening push feed at {url}");
        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let events = check_status(resp)?
            .bytes_stream()
            .eventsource()
            .map(|item| match item {
                Ok(event) => Ok(PushEvent {
                    event: event.event,
                    data: event.data,
                }),
                Err(EventStreamError::Transport(err)) => Err(FeedError::Http(err)),
                Err(err) => Err(FeedError::Stream(err.to_string())),
            });
        Ok(Box::pin(events))
    }

    /// Writes a new target for one job and returns the server's copy of it.
    pub async fn assign_target(&self, id: &JobId, target: Target) -> Result<Job, FeedError> {
        let url = self.config.job_url(id);
        let resp = self
            .http
            .patch(&url)
            .timeout(self.request_timeout)
            .json(&TargetPatch { target })
            .send()
            .await?;
        let body = check_status(resp)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FeedError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(FeedError::Status {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

impl FeedTransport for HerdClient {
    fn fetch_state(&self) -> BoxFuture<'_, Result<StateSnapshot, FeedError>> {
        Box::pin(self.get_state())
    }

    fn open_push(&self) -> BoxFuture<'_, Result<PushStream, FeedError>> {
        Box::pin(self.open_events())
    }
}
