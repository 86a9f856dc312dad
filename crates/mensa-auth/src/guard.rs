//! Per-service request guard.
//!
//! Runs once per inbound request and establishes (or declines to establish) a
//! [`Principal`] for the rest of the handler chain. Two verification paths:
//!
//! 1. Trusted headers stamped by the gateway — no signature work.
//! 2. Raw `Authorization: Bearer` fallback for direct calls that bypass the
//!    edge tier (local/dev/test topologies) — full decode.
//!
//! The guard never rejects a request itself. A request that yields no
//! principal proceeds anyway and the route policy decides centrally, so that
//! public-but-guarded paths are not wrongly refused and the status code comes
//! from one place.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Method, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::headers::{GATEWAY_AUTH_HEADER, TrustedHeaders};
use crate::principal::Principal;
use crate::token::{TokenCodec, bearer_token_from_header};

/// A service's public allow-list: requests matching it skip identity
/// establishment entirely.
///
/// Entries are path prefixes with an optional method constraint, written as
/// `"/health"` or `"GET /cafeterias"`. Prefixes match on segment boundaries.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    entries: Vec<(Option<Method>, String)>,
}

impl PublicPaths {
    pub fn parse(patterns: &[String]) -> Result<Self, AuthError> {
        let mut entries = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let raw = raw.trim();
            let entry = match raw.split_once(' ') {
                Some((method, prefix)) => {
                    let method = method.parse::<Method>().map_err(|_| {
                        AuthError::Internal(format!("bad method in public path: {raw}"))
                    })?;
                    (Some(method), prefix.trim().to_string())
                }
                None => (None, raw.to_string()),
            };
            if !entry.1.starts_with('/') {
                return Err(AuthError::Internal(format!(
                    "public path must start with '/': {raw}"
                )));
            }
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.entries.iter().any(|(entry_method, prefix)| {
            if let Some(m) = entry_method
                && m != method
            {
                return false;
            }
            path == prefix || path.starts_with(&format!("{prefix}/"))
        })
    }
}

/// Static guard configuration, loaded once at service start.
#[derive(Debug, Clone, Default)]
pub struct GuardConfig {
    /// Paths that skip identity establishment.
    pub public_paths: PublicPaths,
    /// When set, `X-User-*` headers are only trusted if the request carries a
    /// matching `X-Gateway-Auth`. When unset, any caller able to set headers
    /// can impersonate a principal — the topology-trust mode of the original
    /// mesh, kept available for single-host deployments.
    pub mesh_secret: Option<String>,
}

/// Everything the guard needs, constructed in `main` and injected. No
/// ambient lookup.
#[derive(Clone)]
pub struct GuardState {
    codec: TokenCodec,
    config: Arc<GuardConfig>,
}

impl GuardState {
    pub fn new(codec: TokenCodec, config: GuardConfig) -> Self {
        Self {
            codec,
            config: Arc::new(config),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn headers_provenance_ok(&self, headers: &HeaderMap) -> bool {
        match &self.config.mesh_secret {
            None => true,
            Some(secret) => headers
                .get(GATEWAY_AUTH_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == secret),
        }
    }
}

/// The per-service filter. Wire with
/// `axum::middleware::from_fn_with_state(guard_state, service_guard)`.
pub async fn service_guard(
    State(state): State<GuardState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if state
        .config
        .public_paths
        .matches(req.method(), req.uri().path())
    {
        return next.run(req).await;
    }

    // Path 1: trusted headers, stamped by the gateway. Checked before any
    // Authorization header so the edge tier's one-time verification wins.
    if state.headers_provenance_ok(req.headers()) {
        if let Some(set) = TrustedHeaders::read(req.headers()) {
            debug!(user_id = set.user_id, "principal from trusted headers");
            req.extensions_mut().insert(set.into_principal());
            return next.run(req).await;
        }
    } else if TrustedHeaders::read(req.headers()).is_some() {
        warn!("trusted headers present without gateway credential, ignoring");
    }

    // Path 2: raw token, exactly as the gateway would verify it.
    if let Some(header) = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        match bearer_token_from_header(header).and_then(|token| state.codec.decode(token)) {
            Ok(principal) => {
                debug!(user_id = principal.user_id, "principal from bearer token");
                req.extensions_mut().insert(principal);
            }
            Err(e) => {
                // Deferred: the policy layer produces the terminal status.
                warn!(error = %e, "bearer token did not yield a principal");
            }
        }
    }

    next.run(req).await
}

/// Authenticated caller, extracted from request extensions.
///
/// Rejects with the uniform 401 when the guard established no principal.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl CurrentUser {
    pub fn user_id(&self) -> i64 {
        self.0.user_id
    }

    pub fn username(&self) -> &str {
        &self.0.username
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthError::MissingCredential)
    }
}

/// Admin-only extractor.
///
/// Ordering matters: an absent principal (missing or expired credential) is
/// 401, never 403; only a live non-admin principal is 403.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthError::InsufficientRole("admin role required".to_string()));
        }
        Ok(RequireAdmin(user))
    }
}
