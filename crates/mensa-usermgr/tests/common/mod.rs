//! Test utilities and common setup.

use axum::Router;
use chrono::Duration;

use mensa_auth::{GuardConfig, GuardState, PublicPaths, TokenCodec};
use mensa_usermgr::issuer::TokenIssuer;
use mensa_usermgr::store::AccountStore;
use mensa_usermgr::{AppState, build_router};

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET)
}

/// Create a test application with an in-memory account store, a seeded
/// admin and a seeded regular user.
pub async fn test_app() -> Router {
    let store = AccountStore::in_memory().await.unwrap();

    let admin_hash = bcrypt::hash("adminpassword123", bcrypt::DEFAULT_COST).unwrap();
    store.ensure_admin("admin", &admin_hash).await.unwrap();

    let user_hash = bcrypt::hash("userpassword123", bcrypt::DEFAULT_COST).unwrap();
    store
        .create("user", &user_hash, mensa_auth::Role::User)
        .await
        .unwrap();

    let issuer = TokenIssuer::new(store, test_codec(), Duration::hours(1));

    let public_paths: Vec<String> = [
        "/health",
        "/auth/login",
        "/auth/register",
        "/auth/refresh",
        "/auth/admin/refresh",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let guard = GuardState::new(
        test_codec(),
        GuardConfig {
            public_paths: PublicPaths::parse(&public_paths).unwrap(),
            mesh_secret: None,
        },
    );

    let policy = mensa_auth::build_policy(
        public_paths
            .iter()
            .map(|p| mensa_auth::PolicyRule {
                pattern: p.clone(),
                method: None,
                require: "public".to_string(),
            })
            .collect(),
    )
    .unwrap();

    build_router(AppState { issuer }, guard, policy)
}
