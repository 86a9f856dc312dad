//! HTTP handlers for account and token operations.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mensa_auth::{AuthError, CurrentUser, bearer_token_from_header};

use crate::AppState;
use crate::issuer::IssuerError;
use crate::store::Account;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Public account info (safe to return to clients).
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl From<Account> for UserInfo {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            role: account.role.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, IssuerError> {
    let (token, account) = state.issuer.login(&request.username, &request.password).await?;
    Ok(Json(AuthResponse {
        token,
        user: account.into(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, IssuerError> {
    let (token, account) = state
        .issuer
        .register(&request.username, &request.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: account.into(),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

fn bearer_from(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingCredential)?;
    bearer_token_from_header(header)
}

/// Re-issue the presented token with a fresh TTL.
#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, IssuerError> {
    let token = bearer_from(&headers)?;
    let token = state.issuer.refresh(token)?;
    Ok(Json(RefreshResponse { token }))
}

/// Admin-scoped refresh: the presented token must carry the ADMIN role.
#[instrument(skip(state, headers))]
pub async fn refresh_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, IssuerError> {
    let token = bearer_from(&headers)?;
    let token = state.issuer.refresh_admin(token)?;
    Ok(Json(RefreshResponse { token }))
}

/// Echo the current principal.
pub async fn me(user: CurrentUser) -> Json<UserInfo> {
    Json(UserInfo {
        id: user.user_id(),
        username: user.username().to_string(),
        role: user.0.role.to_string(),
    })
}
