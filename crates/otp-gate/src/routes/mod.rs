//! HTTP route handlers for the OTP gate.

use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod error;
mod health;
mod otp;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        // Status
        .route("/", get(health::root))
        .route("/health", get(health::health_check))

        // OTP endpoints
        .route("/api/send-otp", post(otp::send_otp))
        .route("/api/verify-otp", post(otp::verify_otp))

        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` allows any origin without credentials; an explicit list allows
/// credentials and mirrors the requested methods and headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::otp::LogDispatcher;
    use crate::store::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use otp_common::OtpError;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(store: Arc<dyn KeyValueStore>, debug: bool) -> Router {
        let config = AppConfig {
            debug,
            ..Default::default()
        };
        create_router(AppState::new(config, store, Arc::new(LogDispatcher)))
    }

    fn app(debug: bool) -> Router {
        app_with(Arc::new(MemoryStore::new()), debug)
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn test_issue_then_verify_once() {
        let app = app(true);
        let phone = "+989123456789";

        let (status, body) = post_json(&app, "/api/send-otp", json!({ "phone": phone })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["expires_in"], 300);
        let code = body["debug_otp"].as_str().unwrap().to_string();
        assert_eq!(code.len(), 6);

        let (status, body) = post_json(
            &app,
            "/api/verify-otp",
            json!({ "identifier": phone, "code": code }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified"], true);

        let (status, body) = post_json(
            &app,
            "/api/verify-otp",
            json!({ "identifier": phone, "code": code }),
        )
        .await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "OTP expired or not found");
        assert_eq!(body["code"], "expired");
    }

    #[tokio::test]
    async fn test_code_hidden_without_debug() {
        let app = app(false);
        let (status, body) =
            post_json(&app, "/api/send-otp", json!({ "email": "user@example.com" })).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("debug_otp").is_none());
    }

    #[tokio::test]
    async fn test_wrong_code_then_right_code() {
        let app = app(true);
        let (_, body) = post_json(&app, "/api/send-otp", json!({ "email": "a@example.com" })).await;
        let code = body["debug_otp"].as_str().unwrap().to_string();
        let wrong = if code == "111111" { "222222" } else { "111111" };

        let (status, body) = post_json(
            &app,
            "/api/verify-otp",
            json!({ "identifier": "a@example.com", "code": wrong }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid");

        let (status, _) = post_json(
            &app,
            "/api/verify-otp",
            json!({ "identifier": "a@example.com", "code": code }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sixth_issue_is_throttled() {
        let app = app(false);
        for _ in 0..5 {
            let (status, _) =
                post_json(&app, "/api/send-otp", json!({ "phone": "+15550001111" })).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) =
            post_json(&app, "/api/send-otp", json!({ "phone": "+15550001111" })).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "too_many_requests");
    }

    #[tokio::test]
    async fn test_identifier_shape_rejected_before_store() {
        let store = Arc::new(MemoryStore::new());
        let app = app_with(store.clone(), false);

        let (status, body) = post_json(&app, "/api/send-otp", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");

        let (status, _) = post_json(
            &app,
            "/api/send-otp",
            json!({ "phone": "+15550001111", "email": "user@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_issued_identifier_verifies_as_submitted() {
        let app = app(true);

        let (status, body) =
            post_json(&app, "/api/send-otp", json!({ "phone": "Alice@Example.com" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");

        let (status, _) = post_json(&app, "/api/send-otp", json!({ "email": "ALICE" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            post_json(&app, "/api/send-otp", json!({ "email": "Alice@Example.com" })).await;
        assert_eq!(status, StatusCode::OK);
        let code = body["debug_otp"].as_str().unwrap().to_string();

        let (status, body) = post_json(
            &app,
            "/api/verify-otp",
            json!({ "identifier": "Alice@Example.com", "code": code }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified"], true);
    }

    #[tokio::test]
    async fn test_malformed_code_rejected() {
        let app = app(false);
        for code in ["12345", "1234567", "12345a"] {
            let (status, body) = post_json(
                &app,
                "/api/verify-otp",
                json!({ "identifier": "+15550001111", "code": code }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "invalid_request");
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_request() {
        let app = app(false);
        let request = Request::builder()
            .method("POST")
            .uri("/api/verify-otp")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let app = app(false);

        let (status, body) = get_json(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "OTP Service is running");

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "memory_connected");
    }

    /// Store whose every call fails, as if the server were unreachable
    struct DownStore;

    fn down() -> OtpError {
        OtpError::StoreUnavailable("connection refused".into())
    }

    #[async_trait]
    impl KeyValueStore for DownStore {
        fn backend(&self) -> &'static str {
            "redis"
        }
        async fn get(&self, _: &str) -> Result<Option<String>, OtpError> {
            Err(down())
        }
        async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), OtpError> {
            Err(down())
        }
        async fn delete(&self, _: &str) -> Result<bool, OtpError> {
            Err(down())
        }
        async fn increment_bounded(&self, _: &str, _: u64, _: Duration) -> Result<Option<u64>, OtpError> {
            Err(down())
        }
        async fn ping(&self) -> Result<(), OtpError> {
            Err(down())
        }
    }

    #[tokio::test]
    async fn test_store_down_degrades() {
        let app = app_with(Arc::new(DownStore), false);

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["database"], "redis_disconnected");

        let (status, body) =
            post_json(&app, "/api/send-otp", json!({ "phone": "+15550001111" })).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service temporarily unavailable");
    }

    /// Store whose ping never completes, as if the server stopped answering
    struct HangingStore;

    #[async_trait]
    impl KeyValueStore for HangingStore {
        fn backend(&self) -> &'static str {
            "redis"
        }
        async fn get(&self, _: &str) -> Result<Option<String>, OtpError> {
            Err(down())
        }
        async fn set_ex(&self, _: &str, _: &str, _: Duration) -> Result<(), OtpError> {
            Err(down())
        }
        async fn delete(&self, _: &str) -> Result<bool, OtpError> {
            Err(down())
        }
        async fn increment_bounded(&self, _: &str, _: u64, _: Duration) -> Result<Option<u64>, OtpError> {
            Err(down())
        }
        async fn ping(&self) -> Result<(), OtpError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_answers_before_request_timeout() {
        let app = app_with(Arc::new(HangingStore), false);

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["database"], "redis_disconnected");
    }

    #[tokio::test]
    async fn test_cors_explicit_origins() {
        let config = AppConfig {
            allowed_origins: vec!["https://app.example".to_string(), "bad\norigin".to_string()],
            ..Default::default()
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(LogDispatcher));
        let app = create_router(state);

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/send-otp")
            .header(header::ORIGIN, "https://app.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }
}
