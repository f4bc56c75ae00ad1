use async_trait::async_trait;
use eventsync_sdk::headers::{SERVICE_NAME_ATTRIBUTE, SERVICE_NAME_HEADER};
use tracing::info;
use url::Url;

use super::{OutboundMessage, PublishError, Sink, check_status};
use crate::context::ExecContext;

/// POSTs the aggregate as JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: reqwest::Client,
    url: Url,
}

impl WebhookSink {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl Sink for WebhookSink {
    async fn publish(
        &self,
        ctx: &ExecContext,
        message: &OutboundMessage,
    ) -> Result<(), PublishError> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .body(message.data.clone());
        if let Some(service_name) = message.attributes.get(SERVICE_NAME_ATTRIBUTE) {
            request = request.header(SERVICE_NAME_HEADER, service_name);
        }

        let response = ctx.run(request.send()).await??;
        check_status(response).await?;

        info!(url = %self.url, "aggregate delivered to webhook");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("webhook {}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> OutboundMessage {
        OutboundMessage {
            data: bytes::Bytes::from_static(br#"{"eventID":"abc"}"#),
            attributes: BTreeMap::from([(
                SERVICE_NAME_ATTRIBUTE.to_string(),
                "orders".to_string(),
            )]),
        }
    }

    #[tokio::test]
    async fn test_publish_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header(SERVICE_NAME_HEADER, "orders"))
            .and(body_string(r#"{"eventID":"abc"}"#))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/hook", server.uri())).unwrap();
        let sink = WebhookSink::new(reqwest::Client::new(), url);
        sink.publish(&ExecContext::background(), &message())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let sink = WebhookSink::new(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
        let err = sink
            .publish(&ExecContext::background(), &message())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected { status: 500, ref body } if body == "down"));
    }

    #[tokio::test]
    async fn test_cancelled_context_interrupts_publish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = ExecContext::background();
        ctx.cancel();
        let sink = WebhookSink::new(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
        let err = sink.publish(&ctx, &message()).await.unwrap_err();
        assert!(matches!(err, PublishError::Interrupted(_)));
    }
}
