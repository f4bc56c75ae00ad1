//! Google Pub/Sub publisher over the REST API.
//!
//! `POST {endpoint}/v1/projects/{project}/topics/{topic}:publish` with the
//! message data base64 encoded. Works against the Pub/Sub emulator as well.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{OutboundMessage, PublishError, Sink, check_status};
use crate::context::ExecContext;

#[derive(Debug, Clone)]
pub struct PubSubSink {
    http: reqwest::Client,
    endpoint: Url,
    project: String,
    topic: String,
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    messages: [PubSubMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct PubSubMessage<'a> {
    data: String,
    attributes: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

impl PubSubSink {
    pub fn new(
        http: reqwest::Client,
        endpoint: Url,
        project: String,
        topic: String,
        access_token: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint,
            project,
            topic,
            access_token,
        }
    }

    fn publish_url(&self) -> Result<Url, url::ParseError> {
        self.endpoint.join(&format!(
            "v1/projects/{}/topics/{}:publish",
            self.project, self.topic
        ))
    }
}

#[async_trait]
impl Sink for PubSubSink {
    async fn publish(
        &self,
        ctx: &ExecContext,
        message: &OutboundMessage,
    ) -> Result<(), PublishError> {
        let url = self.publish_url()?;
        let body = PublishRequest {
            messages: [PubSubMessage {
                data: fast32::base64::RFC4648.encode(&message.data),
                attributes: &message.attributes,
            }],
        };

        let mut request = self.http.post(url).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = ctx.run(request.send()).await??;
        let response = check_status(response).await?;
        let published = ctx.run(response.json::<PublishResponse>()).await??;

        debug!(message_ids = ?published.message_ids, "pubsub publish acknowledged");
        info!(topic = %self.describe(), "aggregate sent to topic");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("projects/{}/topics/{}", self.project, self.topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink(server: &MockServer, token: Option<&str>) -> PubSubSink {
        PubSubSink::new(
            reqwest::Client::new(),
            Url::parse(&server.uri()).unwrap(),
            "my-project".to_string(),
            "sync".to_string(),
            token.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_publish_encodes_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/my-project/topics/sync:publish"))
            .and(header("authorization", "Bearer token-1"))
            .and(body_json(serde_json::json!({
                "messages": [{
                    "data": "aGVsbG8=",
                    "attributes": {"serviceName": "orders"}
                }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"messageIds": ["1"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let message = OutboundMessage {
            data: Bytes::from_static(b"hello"),
            attributes: BTreeMap::from([("serviceName".to_string(), "orders".to_string())]),
        };
        sink(&server, Some("token-1"))
            .publish(&ExecContext::background(), &message)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("topic not found"))
            .mount(&server)
            .await;

        let message = OutboundMessage {
            data: Bytes::from_static(b"{}"),
            attributes: BTreeMap::new(),
        };
        let err = sink(&server, None)
            .publish(&ExecContext::background(), &message)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected { status: 404, .. }));
    }

    #[test]
    fn test_describe() {
        let sink = PubSubSink::new(
            reqwest::Client::new(),
            Url::parse("https://pubsub.googleapis.com").unwrap(),
            "p".to_string(),
            "t".to_string(),
            None,
        );
        assert_eq!(sink.describe(), "projects/p/topics/t");
        assert_eq!(
            sink.publish_url().unwrap().as_str(),
            "https://pubsub.googleapis.com/v1/projects/p/topics/t:publish"
        );
    }
}
