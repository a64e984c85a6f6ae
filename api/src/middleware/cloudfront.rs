use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use common::signature::constant_time_eq;

use crate::state::AppState;

const ORIGIN_TOKEN_HEADER: &str = "X-Header-Token";

/// Rejects requests that did not come through the CloudFront distribution
#[tracing::instrument(skip(state, req, next))]
pub async fn cloudfront_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let cloudfront = &state.config.cloudfront;
    if !cloudfront.enabled {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get(ORIGIN_TOKEN_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if !constant_time_eq(cloudfront.token.as_bytes(), provided) {
        tracing::warn!("Missing or invalid origin token");
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(next.run(req).await)
}
