//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the main application router.
pub fn build_router(state: AppState, permissive_cors: bool) -> Router {
    let router = Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        // Add state to all routes
        .with_state(state);

    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    service: String,
}

/// Simple health check - returns OK if the server is running.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: state.config().service_name.clone(),
    })
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use eventsync_core::config::{self, AdminConfig, ConfigFormat};
    use eventsync_core::processors::{EventIngestor, PublishCoordinator, TriggerProcessing};
    use eventsync_core::sink::MemorySink;
    use eventsync_core::store::MemoryEventStore;
    use eventsync_sdk::headers::ADMIN_AUTH_HEADER;
    use eventsync_sdk::objects::{
        ErrorResponse, IngestResponse, ResetResponse, ServiceConfigDocument, TriggerReport,
        TriggerResponse,
    };
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    const SERVICE_JSON: &str = r#"{
        "serviceName": "orders",
        "endpoints": [
            {"eventKey": "paid", "acceptedHttpMethods": ["post"]},
            {"eventKey": "shipped"}
        ],
        "trigger": {"type": "window", "observationPeriod": 600},
        "targetSink": {"topic": "projects/shop/topics/orders"}
    }"#;

    struct TestApp {
        router: Router,
        store: Arc<MemoryEventStore>,
        sink: Arc<MemorySink>,
    }

    fn test_app(admin: Option<AdminConfig>) -> TestApp {
        let document = config::load(SERVICE_JSON, ConfigFormat::Json).unwrap();
        let service = Arc::new(config::validate(&document).unwrap().config);
        let store = Arc::new(MemoryEventStore::new());
        let sink = Arc::new(MemorySink::new());
        let coordinator = Arc::new(PublishCoordinator::new(
            service,
            store.clone(),
            sink.clone(),
        ));
        let ingestor = Arc::new(EventIngestor::new(
            coordinator.clone(),
            TriggerProcessing::Sync,
            CancellationToken::new(),
        ));
        let state = AppState::new(coordinator, ingestor, admin, Duration::from_secs(5));

        TestApp {
            router: build_router(state, false),
            store,
            sink,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, bytes::Bytes) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    async fn send_json<T: DeserializeOwned>(
        router: &Router,
        request: Request<Body>,
    ) -> (StatusCode, T) {
        let (status, body) = send(router, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(None);
        let (status, body) = send(&app.router, request("GET", "/health")).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "orders");
    }

    #[tokio::test]
    async fn test_ingestion_triggers_once_every_endpoint_reported() {
        let app = test_app(None);

        let first = Request::builder()
            .method("POST")
            .uri("/event/paid?order=42&tag=a&tag=b")
            .header("x-request-id", "r1")
            .body(Body::from(r#"{"amount":10}"#))
            .unwrap();
        let (status, response): (_, IngestResponse) = send_json(&app.router, first).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.event_key, "paid");
        assert_eq!(response.trigger, TriggerReport::NotNeeded);

        let stored = app.store.snapshot().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].external_id, response.event_id);
        assert_eq!(stored[0].content, r#"{"amount":10}"#);
        assert_eq!(stored[0].query_params["tag"], vec!["a", "b"]);
        assert_eq!(stored[0].headers["x-request-id"], vec!["r1"]);

        let (status, response): (_, IngestResponse) =
            send_json(&app.router, request("DELETE", "/event/shipped")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(matches!(response.trigger, TriggerReport::Triggered { .. }));

        let messages = app.sink.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].attributes["serviceName"], "orders");
        assert!(app.store.snapshot().await.iter().all(|e| e.consumed));
    }

    #[tokio::test]
    async fn test_percent_encoded_event_key() {
        let app = test_app(None);
        let (status, response): (_, IngestResponse) =
            send_json(&app.router, request("POST", "/event/pa%69d")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.event_key, "paid");
    }

    #[tokio::test]
    async fn test_ingestion_rejections() {
        let app = test_app(None);
        let cases = [
            ("POST", "/event/", StatusCode::BAD_REQUEST, "empty_key"),
            ("POST", "/event", StatusCode::BAD_REQUEST, "empty_key"),
            ("POST", "/event/refunded", StatusCode::NOT_FOUND, "no_such_endpoint"),
            ("GET", "/event/paid", StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
        ];

        for (method, uri, expected_status, expected_kind) in cases {
            let (status, error): (_, ErrorResponse) =
                send_json(&app.router, request(method, uri)).await;
            assert_eq!(status, expected_status, "{method} {uri}");
            assert_eq!(error.kind, expected_kind, "{method} {uri}");
        }
        assert!(app.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_trigger_modes() {
        let app = test_app(None);
        app.router
            .clone()
            .oneshot(request("POST", "/event/paid"))
            .await
            .unwrap();

        let (status, response): (_, TriggerResponse) =
            send_json(&app.router, request("POST", "/trigger?mode=evaluate")).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
        assert_eq!(response.trigger, TriggerReport::NotNeeded);
        assert!(app.sink.messages().await.is_empty());

        let (status, response): (_, TriggerResponse) =
            send_json(&app.router, request("GET", "/trigger")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.service_name, "orders");
        assert!(matches!(response.trigger, TriggerReport::Triggered { .. }));
        assert_eq!(app.sink.messages().await.len(), 1);

        let (status, _) = send(&app.router, request("POST", "/trigger?mode=sometimes")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reset_and_config() {
        let app = test_app(None);
        for uri in ["/event/paid", "/event/paid"] {
            app.router.clone().oneshot(request("POST", uri)).await.unwrap();
        }

        let (status, response): (_, ResetResponse) =
            send_json(&app.router, request("POST", "/reset")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.reset_events, 2);
        assert!(app.sink.messages().await.is_empty());

        let (status, document): (_, ServiceConfigDocument) =
            send_json(&app.router, request("GET", "/config")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(document.service_name, "orders");
        assert_eq!(document.endpoints[0].accepted_http_methods, vec!["POST"]);
        assert_eq!(document.endpoints[1].accepted_http_methods.len(), 8);
    }

    #[tokio::test]
    async fn test_admin_endpoints_require_secret() {
        let admin = AdminConfig::from_secret("letmein").unwrap();
        let app = test_app(Some(admin));

        let (status, error): (_, ErrorResponse) =
            send_json(&app.router, request("GET", "/config")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.kind, "unauthorized");

        let wrong = Request::builder()
            .uri("/reset")
            .method("POST")
            .header(ADMIN_AUTH_HEADER, "guess")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let right = Request::builder()
            .uri("/config")
            .header(ADMIN_AUTH_HEADER, "letmein")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, right).await;
        assert_eq!(status, StatusCode::OK);

        // ingestion stays open
        let (status, _) = send(&app.router, request("POST", "/event/paid")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
