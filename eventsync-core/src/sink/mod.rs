//! Outbound message sink collaborator.

mod memory;
mod pubsub;
mod webhook;

pub use memory::MemorySink;
pub use pubsub::PubSubSink;
pub use webhook::WebhookSink;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

use crate::config::SinkTarget;
use crate::context::{ExecContext, Interrupted};

/// A message ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// JSON encoded aggregate payload.
    pub data: Bytes,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("publish rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid publish URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one message. Returns once the destination acknowledged it.
    async fn publish(&self, ctx: &ExecContext, message: &OutboundMessage)
    -> Result<(), PublishError>;

    /// Human readable destination, for logs.
    fn describe(&self) -> String;
}

/// Transport settings of the HTTP based sinks.
#[derive(Debug, Clone)]
pub struct SinkSettings {
    /// Pub/Sub REST endpoint, e.g. `https://pubsub.googleapis.com` or an
    /// emulator at `http://localhost:8085`.
    pub pubsub_endpoint: Url,
    /// Bearer token sent to Pub/Sub, if any.
    pub pubsub_access_token: Option<String>,
    /// Timeout of a single publish request.
    pub request_timeout: Duration,
}

/// Build the sink for a configured target.
pub fn build_sink(
    target: &SinkTarget,
    settings: &SinkSettings,
) -> Result<Arc<dyn Sink>, reqwest::Error> {
    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .build()?;

    let sink: Arc<dyn Sink> = match target {
        SinkTarget::PubSubTopic { project, topic } => Arc::new(PubSubSink::new(
            http,
            settings.pubsub_endpoint.clone(),
            project.clone(),
            topic.clone(),
            settings.pubsub_access_token.clone(),
        )),
        SinkTarget::Webhook { url } => Arc::new(WebhookSink::new(http, url.clone())),
    };
    Ok(sink)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
