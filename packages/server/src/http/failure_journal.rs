//! Failure-journal middleware
//!
//! Buffers each request body so it can be recorded, runs the handler, and if
//! the response carries a [`CapturedFailure`] writes a journal record before
//! replacing the response body with one that names the journal event id.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{Method, Uri},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use http_body_util::LengthLimitError;
use treenodes_core::models::FailureReport;

use crate::http::api_error::{ApiError, CapturedFailure};
use crate::http::AppState;

/// Request details kept for the journal
struct RequestSummary {
    method: Method,
    uri: Uri,
    body: String,
}

pub async fn journal_failures(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let summary = RequestSummary {
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                body: String::new(),
            };
            let failure = body_read_failure(err, state.max_body_bytes).captured();
            return respond(&state, summary, failure).await;
        }
    };

    let summary = RequestSummary {
        method: parts.method.clone(),
        uri: parts.uri.clone(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    };

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;

    match response.extensions().get::<CapturedFailure>().cloned() {
        Some(failure) => respond(&state, summary, failure).await,
        None => response,
    }
}

/// Classify a failed body read
///
/// Only a [`LengthLimitError`] somewhere in the source chain means the body
/// was too large; anything else is a broken or aborted upload.
fn body_read_failure(err: axum::Error, limit: usize) -> ApiError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return ApiError::PayloadTooLarge { limit };
        }
        source = cause.source();
    }
    ApiError::UnreadableBody { source: err }
}

/// Journal `failure` and build the final error response
async fn respond(state: &AppState, request: RequestSummary, failure: CapturedFailure) -> Response {
    let report = FailureReport {
        request_path: request.uri.path().to_string(),
        http_method: request.method.to_string(),
        query_string: request.uri.query().unwrap_or_default().to_string(),
        body: request.body,
        exception_type: failure.kind.to_string(),
        message: failure.message.clone(),
        stack_trace: failure.trace.clone(),
    };

    let event_id = match state.journal_sink.record_failure(report).await {
        Ok(event_id) => {
            if failure.user_facing {
                tracing::warn!(
                    "⚠️  {} {} -> {} {} (event {}): {}",
                    request.method,
                    request.uri.path(),
                    failure.status.as_u16(),
                    failure.kind,
                    event_id,
                    failure.message
                );
            } else {
                tracing::error!(
                    "❌ {} {} -> {} {} (event {}):\n{}",
                    request.method,
                    request.uri.path(),
                    failure.status.as_u16(),
                    failure.kind,
                    event_id,
                    failure.trace
                );
            }
            Some(event_id)
        }
        Err(journal_err) => {
            tracing::error!(
                "❌ Failed to journal {} {} -> {}: {}; original failure:\n{}",
                request.method,
                request.uri.path(),
                failure.status.as_u16(),
                journal_err,
                failure.trace
            );
            None
        }
    };

    (failure.status, Json(failure.body(event_id))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let err = to_bytes(Body::from(vec![b'x'; 100]), 10).await.unwrap_err();

        let api_err = body_read_failure(err, 10);
        assert!(matches!(api_err, ApiError::PayloadTooLarge { limit: 10 }));
        assert_eq!(api_err.status(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_broken_body_stream_is_bad_request() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"nodeName\"")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "client went away",
            )),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));
        let err = to_bytes(body, 1024).await.unwrap_err();

        let api_err = body_read_failure(err, 1024);
        assert!(matches!(api_err, ApiError::UnreadableBody { .. }));
        assert_eq!(api_err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(api_err.trace().contains("client went away"));
    }
}
