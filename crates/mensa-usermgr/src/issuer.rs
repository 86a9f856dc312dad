//! Token issuance: login, registration and refresh.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Duration;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use mensa_auth::{AuthError, AuthErrorResponse, Role, TokenCodec};

use crate::store::{Account, AccountStore};

/// Issuance failures.
///
/// `BadCredential` and `InsufficientPrivilege` are distinct kinds so the
/// boundary can map them to 401 and 403 respectively; which credential check
/// failed is never surfaced.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// Unknown user, wrong password or disabled account.
    #[error("invalid username or password")]
    BadCredential,

    /// Account exists but lacks the role this issuance path requires.
    #[error("insufficient privilege: {0}")]
    InsufficientPrivilege(String),

    /// Username collision on registration.
    #[error("username already taken")]
    UsernameTaken,

    /// Token-level failure on refresh (expired, tampered, malformed).
    #[error(transparent)]
    Credential(#[from] AuthError),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct IssuerErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        match self {
            IssuerError::BadCredential => (
                StatusCode::UNAUTHORIZED,
                Json(IssuerErrorBody {
                    error: "Unauthorized".to_string(),
                    message: "invalid username or password".to_string(),
                }),
            )
                .into_response(),
            IssuerError::InsufficientPrivilege(_) => (
                StatusCode::FORBIDDEN,
                Json(AuthErrorResponse::forbidden()),
            )
                .into_response(),
            IssuerError::UsernameTaken => (
                StatusCode::BAD_REQUEST,
                Json(IssuerErrorBody {
                    error: "BadRequest".to_string(),
                    message: "username already taken".to_string(),
                }),
            )
                .into_response(),
            IssuerError::Credential(e) => e.into_response(),
            IssuerError::Store(e) => {
                warn!(error = ?e, "account store failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Mints tokens against the account store. The only component in the mesh
/// holding both the credential store and the signing key.
#[derive(Clone)]
pub struct TokenIssuer {
    store: AccountStore,
    codec: TokenCodec,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(store: AccountStore, codec: TokenCodec, ttl: Duration) -> Self {
        Self { store, codec, ttl }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// Verify credentials and mint a token. Updates the account's last-login
    /// timestamp on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, Account), IssuerError> {
        let Some(account) = self.store.find_by_username(username).await? else {
            warn!(username, "login for unknown username");
            return Err(IssuerError::BadCredential);
        };

        let password_ok =
            bcrypt::verify(password, &account.password_hash).map_err(anyhow::Error::from)?;
        if !password_ok {
            warn!(username, "login with wrong password");
            return Err(IssuerError::BadCredential);
        }
        if !account.is_active {
            warn!(username, "login for disabled account");
            return Err(IssuerError::BadCredential);
        }

        let token = self
            .codec
            .encode(&account.username, account.id, account.role, self.ttl)?;
        self.store.update_last_login(account.id).await?;

        info!(user_id = account.id, "login succeeded");
        Ok((token, account))
    }

    /// Create a USER-role account and mint its first token.
    pub async fn register(&self, username: &str, password: &str) -> Result<(String, Account), IssuerError> {
        if !self.store.is_username_available(username).await? {
            return Err(IssuerError::UsernameTaken);
        }

        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(anyhow::Error::from)?;
        let account = self.store.create(username, &password_hash, Role::User).await?;
        let token = self
            .codec
            .encode(&account.username, account.id, account.role, self.ttl)?;

        info!(user_id = account.id, "account registered");
        Ok((token, account))
    }

    /// Re-issue a live token with the same claims and a fresh TTL. Fails
    /// exactly as decode does: an expired or tampered token never refreshes.
    pub fn refresh(&self, old_token: &str) -> Result<String, IssuerError> {
        let principal = self.codec.decode(old_token)?;
        let token = self
            .codec
            .encode(&principal.username, principal.user_id, principal.role, self.ttl)?;
        Ok(token)
    }

    /// Admin-scoped refresh: identical to [`refresh`](Self::refresh) but the
    /// presented principal must already be ADMIN.
    pub fn refresh_admin(&self, old_token: &str) -> Result<String, IssuerError> {
        let principal = self.codec.decode(old_token)?;
        if !principal.is_admin() {
            warn!(user_id = principal.user_id, "admin refresh with non-admin token");
            return Err(IssuerError::InsufficientPrivilege(
                "admin refresh requires an admin token".to_string(),
            ));
        }
        let token = self
            .codec
            .encode(&principal.username, principal.user_id, principal.role, self.ttl)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn issuer() -> TokenIssuer {
        let store = AccountStore::in_memory().await.unwrap();
        let codec = TokenCodec::new("test-secret-for-unit-tests-minimum-32-chars-long");
        TokenIssuer::new(store, codec, Duration::hours(1))
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let issuer = issuer().await;
        issuer.register("alice", "password123").await.unwrap();

        let (token, account) = issuer.login("alice", "password123").await.unwrap();
        assert_eq!(account.role, Role::User);

        // Side effect: last login recorded.
        let reloaded = issuer
            .store()
            .find_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.last_login_at.is_some());

        // Token decodes back to the account.
        let principal = TokenCodec::new("test-secret-for-unit-tests-minimum-32-chars-long")
            .decode(&token)
            .unwrap();
        assert_eq!(principal.user_id, account.id);
        assert_eq!(principal.username, "alice");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let issuer = issuer().await;
        issuer.register("alice", "password123").await.unwrap();

        assert!(matches!(
            issuer.login("alice", "wrong").await,
            Err(IssuerError::BadCredential)
        ));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let issuer = issuer().await;
        assert!(matches!(
            issuer.login("ghost", "whatever").await,
            Err(IssuerError::BadCredential)
        ));
    }

    #[tokio::test]
    async fn test_login_disabled_account() {
        let issuer = issuer().await;
        let (_, account) = issuer.register("alice", "password123").await.unwrap();
        issuer.store().set_active(account.id, false).await.unwrap();

        assert!(matches!(
            issuer.login("alice", "password123").await,
            Err(IssuerError::BadCredential)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let issuer = issuer().await;
        issuer.register("alice", "password123").await.unwrap();
        assert!(matches!(
            issuer.register("alice", "other").await,
            Err(IssuerError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_keeps_claims() {
        let issuer = issuer().await;
        let (token, account) = issuer.register("alice", "password123").await.unwrap();

        let refreshed = issuer.refresh(&token).unwrap();
        let principal = TokenCodec::new("test-secret-for-unit-tests-minimum-32-chars-long")
            .decode(&refreshed)
            .unwrap();
        assert_eq!(principal.user_id, account.id);
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, Role::User);
    }

    #[tokio::test]
    async fn test_refresh_rejects_garbage() {
        let issuer = issuer().await;
        assert!(matches!(
            issuer.refresh("not-a-token"),
            Err(IssuerError::Credential(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_refresh_requires_admin() {
        let issuer = issuer().await;
        let (user_token, _) = issuer.register("alice", "password123").await.unwrap();

        assert!(matches!(
            issuer.refresh_admin(&user_token),
            Err(IssuerError::InsufficientPrivilege(_))
        ));

        // An actual admin can refresh on the admin path.
        let hash = bcrypt::hash("adminpass123", bcrypt::DEFAULT_COST).unwrap();
        issuer.store().ensure_admin("root", &hash).await.unwrap();
        let (admin_token, _) = issuer.login("root", "adminpass123").await.unwrap();
        assert!(issuer.refresh_admin(&admin_token).is_ok());
    }
}
