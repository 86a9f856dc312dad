//! The edge filter: verify once, stamp trusted headers, forward.
//!
//! Runs before any route forwarding. Requests on the public allow-list pass
//! through unchanged; everything else must present a decodable Bearer token
//! or dies here with the uniform 401 — the failure subtype is logged, never
//! surfaced, so a caller cannot probe which check failed.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use mensa_auth::{
    AuthError, GATEWAY_AUTH_HEADER, PublicPaths, TokenCodec, TrustedHeaders,
    bearer_token_from_header,
};

/// Edge filter state, constructed in `main` and injected.
#[derive(Clone)]
pub struct EdgeState {
    codec: TokenCodec,
    public: PublicPaths,
    mesh_secret: Option<String>,
}

impl EdgeState {
    pub fn new(codec: TokenCodec, public: PublicPaths, mesh_secret: Option<String>) -> Self {
        Self {
            codec,
            public,
            mesh_secret,
        }
    }
}

pub async fn edge_guard(
    State(state): State<EdgeState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if state.public.matches(req.method(), req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!(path = %req.uri().path(), "no authorization header at edge");
            AuthError::MissingCredential
        })?;
    let token = bearer_token_from_header(header)?;

    let principal = state.codec.decode(token).map_err(|e| {
        // All decode kinds collapse to the same 401 on the wire.
        warn!(path = %req.uri().path(), error = %e, "token rejected at edge");
        e
    })?;

    debug!(user_id = principal.user_id, path = %req.uri().path(), "edge verified");

    // Restate the principal as trusted headers, overwriting anything the
    // caller supplied under those names.
    TrustedHeaders::from_principal(&principal).stamp(req.headers_mut());
    if let Some(secret) = &state.mesh_secret {
        let value = HeaderValue::from_str(secret)
            .map_err(|e| AuthError::Internal(format!("mesh secret not header-safe: {e}")))?;
        req.headers_mut().insert(GATEWAY_AUTH_HEADER, value);
    }

    Ok(next.run(req).await)
}
