//! Ingestion client (event sources → EventSync server).

use reqwest::{Client, Method};
use url::Url;

use super::{ClientError, parse_response};
use crate::headers::EVENT_PATH_PREFIX;
use crate::objects::{HttpMethod, IngestResponse};

/// Typed HTTP client submitting events to an endpoint.
#[derive(Debug, Clone)]
pub struct IngestClient {
    http: Client,
    base_url: Url,
}

impl IngestClient {
    /// Create a new `IngestClient` for the server at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `{method} /event/{event_key}` – submit one event.
    ///
    /// `query` and `body` are stored verbatim with the event and end up in
    /// the aggregate if the event gets selected.
    pub async fn send_event(
        &self,
        event_key: &str,
        method: HttpMethod,
        query: &[(&str, &str)],
        body: impl Into<reqwest::Body>,
    ) -> Result<IngestResponse, ClientError> {
        let url = self.base_url.join(&format!(
            "{}{}",
            EVENT_PATH_PREFIX,
            urlencoding::encode(event_key)
        ))?;

        let resp = self
            .http
            .request(to_reqwest_method(method), url)
            .query(query)
            .body(body)
            .send()
            .await?;

        parse_response(resp).await
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Connect => Method::CONNECT,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Trace => Method::TRACE,
    }
}
