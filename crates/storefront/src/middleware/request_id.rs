//! Request ID middleware.
//!
//! Reuses an upstream `x-request-id` when present and mints a UUID v4
//! otherwise. The id is recorded on the tracing span, tagged on the Sentry
//! scope and echoed back on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id accepted as-is.
const MAX_UPSTREAM_ID_LEN: usize = 128;

fn request_id_from(request: &Request) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_UPSTREAM_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Attach a request id to the span, the Sentry scope and the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request_id_from(&request);

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_upstream_id_is_kept() {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "cf-abc")
            .body(Body::empty())
            .unwrap_or_default();
        assert_eq!(request_id_from(&request), "cf-abc");
    }

    #[test]
    fn test_oversized_id_is_replaced() {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "x".repeat(500))
            .body(Body::empty())
            .unwrap_or_default();
        let id = request_id_from(&request);
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
