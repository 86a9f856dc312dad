//! Test utilities and common setup.

use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;

use mensa_auth::{Claims, GuardConfig, GuardState, PublicPaths, Role, TokenCodec, build_policy};
use mensa_catalog::config;
use mensa_catalog::store::CatalogStore;
use mensa_catalog::{AppState, build_router};

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET)
}

/// Catalog app with the default public paths and policy, optionally
/// requiring gateway provenance for trusted headers.
pub async fn test_app(mesh_secret: Option<&str>) -> Router {
    let store = CatalogStore::in_memory().await.unwrap();

    let config: config::Config = toml::from_str(&format!("jwt_secret = \"{TEST_SECRET}\"")).unwrap();

    let guard = GuardState::new(
        test_codec(),
        GuardConfig {
            public_paths: PublicPaths::parse(&config.public_paths).unwrap(),
            mesh_secret: mesh_secret.map(|s| s.to_string()),
        },
    );
    let policy = build_policy(config.policy).unwrap();

    build_router(AppState { store }, guard, policy)
}

/// Mint a live token through the codec.
pub fn token_for(username: &str, user_id: i64, role: Role) -> String {
    test_codec()
        .encode(username, user_id, role, Duration::hours(1))
        .unwrap()
}

/// Hand-craft a signed token with arbitrary claims, bypassing the codec's
/// own validation. Used to produce expired and claim-less tokens.
pub fn raw_token(sub: &str, user_id: Option<Value>, role: Option<&str>, exp_offset_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        user_id,
        role: role.map(|r| r.to_string()),
        iat: now - 60,
        exp: now + exp_offset_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}
