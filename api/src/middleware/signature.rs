use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use common::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use common::telemetry;

use crate::state::AppState;

/// Slash command payloads are small form bodies
const MAX_BODY_BYTES: usize = 64 * 1024;

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verifies the request signature over the raw body before any handler runs.
///
/// The body is buffered for verification and handed on unchanged.
#[tracing::instrument(skip(state, req, next))]
pub async fn signature_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(authenticator) = state.authenticator.as_ref() else {
        return Ok(next.run(req).await);
    };

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to read request body");
        StatusCode::BAD_REQUEST
    })?;

    authenticator
        .verify(
            &bytes,
            header_value(&parts.headers, TIMESTAMP_HEADER),
            header_value(&parts.headers, SIGNATURE_HEADER),
        )
        .map_err(|e| {
            telemetry::record_signature_rejection(e.reason());
            tracing::warn!(reason = e.reason(), error = %e, "Rejected unauthenticated request");
            StatusCode::UNAUTHORIZED
        })?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
