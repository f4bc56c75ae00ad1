//! Admin API client (operator tooling → EventSync server).
//!
//! When the server is configured with an admin secret, every request must
//! carry it in the `EventSync-Admin-Authorization` header.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::headers::ADMIN_AUTH_HEADER;
use crate::objects::{ResetResponse, ServiceConfigDocument, TriggerResponse};

/// Typed HTTP client for the EventSync **Admin API**.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: Option<String>,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the EventSync server.
    /// * `admin_secret` – the plaintext admin secret, if the server has one.
    pub fn new(base_url: Url, admin_secret: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /trigger` – publish an aggregate of the current window even if
    /// the trigger conditions are not met.
    pub async fn force_trigger(&self) -> Result<TriggerResponse, ClientError> {
        let url = self.base_url.join("/trigger")?;
        let resp = self.authorized(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /trigger?mode=evaluate` – publish only if every endpoint is
    /// satisfied. An unsatisfied window is reported as an API error with
    /// status 412.
    pub async fn evaluate_trigger(&self) -> Result<TriggerResponse, ClientError> {
        let url = self.base_url.join("/trigger")?;
        let resp = self
            .authorized(self.http.post(url).query(&[("mode", "evaluate")]))
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /reset` – mark every event of the window consumed.
    pub async fn reset(&self) -> Result<ResetResponse, ClientError> {
        let url = self.base_url.join("/reset")?;
        let resp = self.authorized(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET /config` – the normalized service description.
    pub async fn config(&self) -> Result<ServiceConfigDocument, ClientError> {
        let url = self.base_url.join("/config")?;
        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.admin_secret {
            Some(secret) => request.header(ADMIN_AUTH_HEADER, secret),
            None => request,
        }
    }
}
