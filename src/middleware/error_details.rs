//! Development-only exposure of server-side error causes.
//!
//! Error responses carry only a sanitized `error` message. The underlying
//! cause of a 5xx travels in an [`ErrorDetail`] response extension; when the
//! gateway runs with `APP_ENV=development` this middleware copies it into the
//! JSON body as `details`:
//!
//! ```json
//! { "error": "Internal server error", "details": "Queue operation failed: ..." }
//! ```
//!
//! The layer is never installed in production.

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use tracing::debug;

use crate::error::ErrorDetail;

/// Error bodies are tiny; anything larger is passed through untouched.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if !response.status().is_server_error() {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Could not buffer error body for details");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let Ok(Value::Object(mut object)) = serde_json::from_slice::<Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    object.insert("details".to_string(), Value::String(detail));

    match serde_json::to_vec(&Value::Object(object)) {
        Ok(enriched) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(enriched))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/boom",
                get(|| async { Err::<(), _>(AppError::QueueError("READONLY replica".into())) }),
            )
            .route(
                "/missing",
                get(|| async {
                    Err::<(), _>(AppError::NotFound {
                        sensor_id: "s1".into(),
                    })
                }),
            )
            .layer(axum::middleware::from_fn(expose_error_details))
    }

    async fn call(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(axum::http::Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_server_errors_gain_details() {
        let (status, body) = call("/boom").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(body["details"].as_str().unwrap().contains("READONLY replica"));
    }

    #[tokio::test]
    async fn test_client_errors_are_untouched() {
        let (status, body) = call("/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.get("details").is_none());
        assert_eq!(body["sensor_id"], "s1");
    }
}
