//! Authorization failure taxonomy.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Everything that can go wrong between a request arriving and a principal
/// being authorized for its route.
///
/// Every kind except `InsufficientRole` collapses to a single 401 on the
/// wire; the distinction exists for logs only, so a caller can never probe
/// which check failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credential: no trusted headers and no/malformed
    /// Authorization header.
    #[error("missing credential")]
    MissingCredential,

    /// Token is not structurally a token.
    #[error("malformed token")]
    MalformedToken,

    /// Token is well-formed but the signature does not verify.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// Token expired.
    #[error("token expired")]
    ExpiredToken,

    /// Structurally valid token lacking a required claim.
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),

    /// Claim present but not of an accepted shape.
    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    /// Valid principal, wrong role for the route. The only kind that may
    /// surface as 403, and only after a principal was established.
    #[error("insufficient role: {0}")]
    InsufficientRole(String),

    /// Signing or key failure. Not a caller problem.
    #[error("internal auth error: {0}")]
    Internal(String),
}

/// Wire shape for rejected requests.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub message: String,
}

impl AuthErrorResponse {
    pub fn unauthorized() -> Self {
        Self {
            error: "Unauthorized".to_string(),
            message: "Authentication required".to_string(),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            error: "Forbidden".to_string(),
            message: "Insufficient role".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::InsufficientRole(_) => {
                (StatusCode::FORBIDDEN, Json(AuthErrorResponse::forbidden())).into_response()
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(AuthErrorResponse::unauthorized()),
            )
                .into_response(),
        }
    }
}
