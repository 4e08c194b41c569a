//! # Request ID Middleware
//!
//! Generates a unique id per HTTP request, stored in request extensions for
//! handlers (it ends up in the response `meta` block), echoed back as the
//! `x-request-id` header, and stamped into the `meta` block of failure
//! envelopes so callers can quote the correlation id from the body alone.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use uuid::Uuid;

/// Request ID wrapper for extension storage.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

pub async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();

    request.extensions_mut().insert(RequestId(request_id));

    let span = tracing::Span::current();
    span.record("request_id", request_id.to_string());

    let response = next.run(request).await;

    let mut response = if response.status().is_client_error() || response.status().is_server_error()
    {
        stamp_failure_envelope(response, request_id).await
    } else {
        response
    };

    if let Ok(value) = request_id.to_string().parse() {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Rewrite a failure envelope so its `meta` block carries the correlation id.
///
/// Handlers build success metadata themselves, but error conversions happen
/// below the handler boundary where the id is out of reach, so the stamp is
/// applied here. Bodies that are not a failure envelope pass through
/// untouched.
async fn stamp_failure_envelope(response: Response, request_id: Uuid) -> Response {
    let (mut parts, body) = response.into_parts();

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    let mut document: Value = match serde_json::from_slice(&bytes) {
        Ok(document) => document,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    if document.get("success").and_then(Value::as_bool) == Some(false) {
        if let Some(meta) = document.get_mut("meta").and_then(Value::as_object_mut) {
            meta.insert(
                "requestId".to_string(),
                Value::String(request_id.to_string()),
            );
        }
        if let Ok(patched) = serde_json::to_vec(&document) {
            // Stale length from the original body would truncate the stamp.
            parts.headers.remove(CONTENT_LENGTH);
            return Response::from_parts(parts, Body::from(patched));
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::response_types::ApiError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn request_id_is_copyable_and_distinct() {
        let a = RequestId(Uuid::new_v4());
        let b = RequestId(Uuid::new_v4());
        let a2 = a;
        assert_eq!(a.0, a2.0);
        assert_ne!(a.0, b.0);
    }

    #[tokio::test]
    async fn failure_envelope_meta_carries_the_request_id() {
        let request_id = Uuid::new_v4();
        let response = ApiError::database_error("Assemble dashboard report").into_response();

        let stamped = stamp_failure_envelope(response, request_id).await;
        assert_eq!(stamped.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let document = body_json(stamped).await;
        assert_eq!(document["success"], Value::Bool(false));
        assert_eq!(document["code"], Value::String("DATABASE_ERROR".into()));
        assert_eq!(
            document["meta"]["requestId"],
            Value::String(request_id.to_string())
        );
        assert!(document["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn four_oh_four_envelope_is_stamped_too() {
        let request_id = Uuid::new_v4();
        let response = ApiError::NotFound.into_response();

        let document = body_json(stamp_failure_envelope(response, request_id).await).await;
        assert_eq!(
            document["meta"]["requestId"],
            Value::String(request_id.to_string())
        );
    }

    #[tokio::test]
    async fn non_envelope_bodies_pass_through_unchanged() {
        let response = axum::http::Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("not found"))
            .unwrap();

        let stamped = stamp_failure_envelope(response, Uuid::new_v4()).await;
        let bytes = to_bytes(stamped.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"not found");
    }
}
