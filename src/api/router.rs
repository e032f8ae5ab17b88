//! Analysis API router.
//!
//! Layer stack (outermost → innermost):
//! 1. CORS → 2. Request tracing → 3. Body limit → Handler
//!
//! CORS is outermost so error responses, body-limit rejections and
//! preflight answers all carry `Access-Control-Allow-Origin: *`.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the analysis API router.
pub fn analysis_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.max_upload_bytes;

    Router::new()
        .route("/api/analyze", post(endpoints::analyze::analyze))
        .route("/api/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Any origin; preflight advertises GET, POST, OPTIONS and `Content-Type`.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use crate::pipeline::analysis::AnalysisService;
    use crate::pipeline::inference::{InferenceError, MockVisionClient};

    const BOUNDARY: &str = "kenshin-test-boundary";

    const FENCED_REPLY: &str = "Here is the result:\n```json\n{\"date\":\"2024-03-01\",\"items\":[{\"name\":\"血圧\",\"value\":\"120\",\"unit\":\"mmHg\"}]}\n```";

    fn router_with(mock: &Arc<MockVisionClient>, max_upload_bytes: usize) -> Router {
        let service = Arc::new(AnalysisService::new(mock.clone()));
        analysis_router(ApiContext::new(service, max_upload_bytes))
    }

    fn router(mock: &Arc<MockVisionClient>) -> Router {
        router_with(mock, 1024 * 1024)
    }

    fn file_part(name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"; filename=\"checkup.jpg\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(bytes);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"\r\n\r\n\
             {value}\r\n"
        )
        .into_bytes()
    }

    fn multipart_body(parts: &[Vec<u8>]) -> Vec<u8> {
        let mut body = parts.concat();
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("Origin", "http://localhost:5173")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn allow_origin(response: &Response) -> Option<&str> {
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn analyze_returns_extracted_result() {
        let mock = Arc::new(MockVisionClient::replying(FENCED_REPLY));
        let body = multipart_body(&[file_part("image", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0])]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(allow_origin(&response), Some("*"));
        let json = body_json(response).await;
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2024-03-01",
                "items": [{"name": "血圧", "value": "120", "unit": "mmHg"}]
            })
        );
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_image_field_returns_400_without_provider_call() {
        let mock = Arc::new(MockVisionClient::replying(FENCED_REPLY));
        let body = multipart_body(&[text_part("note", "hello")]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(allow_origin(&response), Some("*"));
        let json = body_json(response).await;
        assert_eq!(json["error"], "No image file provided");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn non_multipart_body_returns_400_without_provider_call() {
        let mock = Arc::new(MockVisionClient::replying(FENCED_REPLY));
        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("Content-Type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = router(&mock).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_image_field_returns_400() {
        let mock = Arc::new(MockVisionClient::replying(FENCED_REPLY));
        let body = multipart_body(&[file_part("image", "image/png", b"")]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn other_fields_are_ignored() {
        let mock = Arc::new(MockVisionClient::replying(FENCED_REPLY));
        let body = multipart_body(&[
            text_part("note", "front page"),
            file_part("image", "image/png", b"\x89PNG\r\n\x1a\nrest"),
        ]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let sent = mock.last_request().unwrap();
        assert_eq!(sent.image().mime_type.as_str(), "image/png");
    }

    #[tokio::test]
    async fn unparsable_reply_returns_500_with_raw() {
        let mock = Arc::new(MockVisionClient::replying("Sorry, I cannot process this."));
        let body = multipart_body(&[file_part("image", "image/jpeg", &[0xFF, 0xD8, 0xFF])]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(allow_origin(&response), Some("*"));
        let json = body_json(response).await;
        assert_eq!(json["error"], "Failed to extract JSON from response");
        assert_eq!(json["raw"], "Sorry, I cannot process this.");
    }

    #[tokio::test]
    async fn malformed_reply_json_returns_500_with_details() {
        let mock = Arc::new(MockVisionClient::replying("{invalid json}"));
        let body = multipart_body(&[file_part("image", "image/jpeg", &[0xFF, 0xD8, 0xFF])]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(allow_origin(&response), Some("*"));
        let json = body_json(response).await;
        assert_eq!(json["error"], "Failed to analyze image");
        assert!(json["details"].as_str().is_some_and(|d| !d.is_empty()));
        assert!(json.get("raw").is_none());
    }

    #[tokio::test]
    async fn reply_values_and_extra_keys_pass_through() {
        let mock = Arc::new(MockVisionClient::replying(
            r#"{"date":"2024-03-01","note":"x","items":[{"name":"血圧","value":120,"unit":"mmHg","flag":"H"}]}"#,
        ));
        let body = multipart_body(&[file_part("image", "image/jpeg", &[0xFF, 0xD8, 0xFF])]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2024-03-01",
                "note": "x",
                "items": [{"name": "血圧", "value": 120, "unit": "mmHg", "flag": "H"}]
            })
        );
    }

    #[tokio::test]
    async fn reply_without_date_returns_500() {
        let mock = Arc::new(MockVisionClient::replying("{\"items\":[]}"));
        let body = multipart_body(&[file_part("image", "image/jpeg", &[0xFF, 0xD8, 0xFF])]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid response format from AI");
    }

    #[tokio::test]
    async fn provider_failure_returns_500_with_details() {
        let mock = Arc::new(MockVisionClient::failing(InferenceError::Provider {
            status: 403,
            body: "API key not valid".into(),
        }));
        let body = multipart_body(&[file_part("image", "image/jpeg", &[0xFF, 0xD8, 0xFF])]);

        let response = router(&mock).oneshot(analyze_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Failed to analyze image");
        assert!(json["details"].as_str().unwrap().contains("API key not valid"));
    }

    #[tokio::test]
    async fn oversized_upload_returns_413_without_provider_call() {
        let mock = Arc::new(MockVisionClient::replying(FENCED_REPLY));
        let big = vec![0xAB; 4096];
        let body = multipart_body(&[file_part("image", "image/jpeg", &big)]);

        let response = router_with(&mock, 1024)
            .oneshot(analyze_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(allow_origin(&response), Some("*"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn preflight_allows_any_origin() {
        let mock = Arc::new(MockVisionClient::replying(FENCED_REPLY));
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/analyze")
            .header("Origin", "https://checkup.example")
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type")
            .body(Body::empty())
            .unwrap();

        let response = router(&mock).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(allow_origin(&response), Some("*"));
        let methods = response
            .headers()
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap()
            .to_ascii_uppercase();
        for m in ["GET", "POST", "OPTIONS"] {
            assert!(methods.contains(m), "missing {m} in {methods}");
        }
        let headers = response
            .headers()
            .get("access-control-allow-headers")
            .unwrap()
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(headers.contains("content-type"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn health_reports_model() {
        let mock = Arc::new(MockVisionClient::replying(""));
        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let response = router(&mock).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "mock-vision");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let mock = Arc::new(MockVisionClient::replying(""));
        let request = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();

        let response = router(&mock).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
