//! The trusted header contract between the edge tier and services.
//!
//! After verifying a token once, the gateway restates the principal as plain
//! request headers so downstream services can skip signature work. The set is
//! unsigned; provenance is covered (optionally) by `X-Gateway-Auth`, see
//! [`GuardConfig`](crate::GuardConfig).

use axum::http::{HeaderMap, HeaderValue};
use tracing::warn;

use crate::principal::{Principal, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// Shared-secret provenance header, stamped alongside the set when the mesh
/// is configured with a gateway secret.
pub const GATEWAY_AUTH_HEADER: &str = "x-gateway-auth";

/// A parsed `X-User-*` header set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHeaders {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl TrustedHeaders {
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            user_id: principal.user_id,
            username: principal.username.clone(),
            role: principal.role,
        }
    }

    pub fn into_principal(self) -> Principal {
        Principal {
            user_id: self.user_id,
            username: self.username,
            role: self.role,
        }
    }

    /// Read the set from request headers.
    ///
    /// The set counts as present when both `X-User-Id` and `X-Username` are
    /// there; a blank role header defaults to USER. A malformed value (non
    /// -numeric id, unknown role) makes the whole set unusable and the caller
    /// falls back to raw-token verification.
    pub fn read(headers: &HeaderMap) -> Option<Self> {
        let user_id_raw = headers.get(USER_ID_HEADER)?.to_str().ok()?;
        let username = headers.get(USERNAME_HEADER)?.to_str().ok()?;
        if user_id_raw.trim().is_empty() || username.trim().is_empty() {
            return None;
        }

        let user_id = match user_id_raw.trim().parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                warn!(value = %user_id_raw, "ignoring trusted headers with non-numeric user id");
                return None;
            }
        };

        let role_raw = headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let role = if role_raw.trim().is_empty() {
            Role::User
        } else {
            match Role::normalize(role_raw) {
                Ok(role) => role,
                Err(e) => {
                    warn!(value = %role_raw, error = %e, "ignoring trusted headers with bad role");
                    return None;
                }
            }
        };

        Some(Self {
            user_id,
            username: username.trim().to_string(),
            role,
        })
    }

    /// Stamp the set onto an outbound request, overwriting anything a caller
    /// supplied under the same names.
    pub fn stamp(&self, headers: &mut HeaderMap) {
        Self::strip(headers);
        if let Ok(value) = HeaderValue::from_str(&self.user_id.to_string()) {
            headers.insert(USER_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.username) {
            headers.insert(USERNAME_HEADER, value);
        }
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(self.role.as_str()));
    }

    /// Remove every header of the trusted set, including the provenance
    /// header. The gateway does this on all inbound traffic so a caller can
    /// never smuggle identity past it.
    pub fn strip(headers: &mut HeaderMap) {
        headers.remove(USER_ID_HEADER);
        headers.remove(USERNAME_HEADER);
        headers.remove(USER_ROLE_HEADER);
        headers.remove(GATEWAY_AUTH_HEADER);
    }
}
