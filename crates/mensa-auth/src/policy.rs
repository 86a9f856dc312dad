//! Declarative route authorization.
//!
//! An ordered table mapping route patterns to the minimum requirement for
//! access, consulted after the guard has run. First match wins; anything
//! unmatched requires authentication.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::AuthError;
use crate::principal::Principal;

/// Minimum requirement for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Always allowed, principal or not.
    Public,
    /// Any live principal.
    Authenticated,
    /// A live principal with the ADMIN role.
    Admin,
}

impl std::str::FromStr for Requirement {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Requirement::Public),
            "authenticated" => Ok(Requirement::Authenticated),
            "admin" => Ok(Requirement::Admin),
            other => Err(AuthError::Internal(format!(
                "unknown policy requirement: {other}"
            ))),
        }
    }
}

/// A policy row as it appears in a service's config file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PolicyRule {
    pub pattern: String,
    #[serde(default)]
    pub method: Option<String>,
    pub require: String,
}

impl PolicyRule {
    pub fn into_entry(self) -> Result<PolicyEntry, AuthError> {
        let method = self
            .method
            .map(|m| {
                m.parse::<Method>()
                    .map_err(|_| AuthError::Internal(format!("bad method in policy rule: {m}")))
            })
            .transpose()?;
        let requirement = self.require.parse::<Requirement>()?;
        Ok(PolicyEntry::new(self.pattern, method, requirement))
    }
}

/// Build the policy table from configured rules, preserving order.
pub fn build_policy(rules: Vec<PolicyRule>) -> Result<RoutePolicy, AuthError> {
    let entries = rules
        .into_iter()
        .map(PolicyRule::into_entry)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RoutePolicy::new(entries))
}

/// One policy table row.
#[derive(Debug, Clone)]
pub struct PolicyEntry {
    pattern: String,
    method: Option<Method>,
    requirement: Requirement,
}

impl PolicyEntry {
    pub fn new(pattern: impl Into<String>, method: Option<Method>, requirement: Requirement) -> Self {
        Self {
            pattern: pattern.into(),
            method,
            requirement,
        }
    }
}

/// Match a route pattern against a request path.
///
/// Patterns are literal segments, `*` for exactly one segment, and a trailing
/// `**` for any remainder (including none).
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_segments.last() == Some(&"**") {
        let prefix = &pattern_segments[..pattern_segments.len() - 1];
        if path_segments.len() < prefix.len() {
            return false;
        }
        prefix
            .iter()
            .zip(&path_segments)
            .all(|(p, s)| *p == "*" || p == s)
    } else {
        pattern_segments.len() == path_segments.len()
            && pattern_segments
                .iter()
                .zip(&path_segments)
                .all(|(p, s)| *p == "*" || p == s)
    }
}

/// Ordered, read-only policy table. Built once at service start.
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    entries: Arc<Vec<PolicyEntry>>,
}

impl RoutePolicy {
    pub fn new(entries: Vec<PolicyEntry>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// First matching entry wins; unmatched routes require authentication.
    pub fn requirement_for(&self, method: &Method, path: &str) -> Requirement {
        for entry in self.entries.iter() {
            if let Some(m) = &entry.method
                && m != method
            {
                continue;
            }
            if pattern_matches(&entry.pattern, path) {
                return entry.requirement;
            }
        }
        Requirement::Authenticated
    }
}

/// Enforcement layer. Wire *after* the guard so the guard's principal is
/// already in extensions:
/// `.layer(from_fn_with_state(policy, enforce_policy))`
/// `.layer(from_fn_with_state(guard_state, service_guard))`
///
/// Check ordering is fixed: a missing/expired credential is always 401 even
/// on an admin route; only a live non-admin principal earns 403.
pub async fn enforce_policy(
    State(policy): State<RoutePolicy>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let requirement = policy.requirement_for(req.method(), req.uri().path());
    let principal = req.extensions().get::<Principal>();

    match requirement {
        Requirement::Public => {}
        Requirement::Authenticated => {
            if principal.is_none() {
                warn!(path = %req.uri().path(), "unauthenticated request to protected route");
                return Err(AuthError::MissingCredential);
            }
        }
        Requirement::Admin => match principal {
            None => {
                warn!(path = %req.uri().path(), "unauthenticated request to admin route");
                return Err(AuthError::MissingCredential);
            }
            Some(p) if !p.is_admin() => {
                warn!(
                    path = %req.uri().path(),
                    user_id = p.user_id,
                    "non-admin principal on admin route"
                );
                return Err(AuthError::InsufficientRole("admin route".to_string()));
            }
            Some(_) => {}
        },
    }

    Ok(next.run(req).await)
}
