//! End-to-end gateway tests against a live upstream.
//!
//! The upstream is a real axum server on an ephemeral port that echoes the
//! identity headers it received and counts hits, so tests can assert what
//! actually crossed the hop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::any,
};
use chrono::Duration;
use serde_json::{Value, json};
use tower::ServiceExt;

use mensa_auth::{Role, TokenCodec};
use mensa_gateway::build_router;
use mensa_gateway::config::{Config, RouteTarget};

const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

#[derive(Clone)]
struct UpstreamState {
    hits: Arc<AtomicUsize>,
}

async fn echo(State(state): State<UpstreamState>, headers: HeaderMap) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    Json(json!({
        "x_user_id": header_value("x-user-id"),
        "x_username": header_value("x-username"),
        "x_user_role": header_value("x-user-role"),
        "x_gateway_auth": header_value("x-gateway-auth"),
    }))
}

/// Bind an echo upstream on an ephemeral port; returns its base URL and the
/// hit counter.
async fn spawn_upstream() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo))
        .with_state(UpstreamState { hits: hits.clone() });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), hits)
}

async fn gateway_with(mesh_secret: Option<&str>) -> (Router, Arc<AtomicUsize>) {
    let (upstream, hits) = spawn_upstream().await;
    let config = Config {
        jwt_secret: TEST_SECRET.to_string(),
        mesh_secret: mesh_secret.map(|s| s.to_string()),
        public_paths: vec![
            "/auth/login".to_string(),
            "GET /cafeterias".to_string(),
            "/health".to_string(),
        ],
        routes: vec![
            RouteTarget {
                prefix: "/cafeterias".to_string(),
                upstream: upstream.clone(),
            },
            RouteTarget {
                prefix: "/auth".to_string(),
                upstream,
            },
        ],
    };
    (build_router(&config).unwrap(), hits)
}

fn admin_token() -> String {
    TokenCodec::new(TEST_SECRET)
        .encode("admin", 999, Role::Admin, Duration::hours(1))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Public path: forwarded without credentials, nothing stamped.
#[tokio::test]
async fn test_public_path_forwards_without_identity() {
    let (gateway, hits) = gateway_with(None).await;

    let response = gateway
        .oneshot(
            Request::builder()
                .uri("/cafeterias")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let json = body_json(response).await;
    assert_eq!(json["x_user_id"], Value::Null);
    assert_eq!(json["x_username"], Value::Null);
}

/// Authorized request: verified once, identity restated as headers, spoofed
/// values overwritten.
#[tokio::test]
async fn test_verified_request_is_stamped_and_spoof_overwritten() {
    let (gateway, _hits) = gateway_with(None).await;
    let token = admin_token();

    let response = gateway
        .oneshot(
            Request::builder()
                .uri("/cafeterias")
                .method(Method::POST)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header("X-User-Id", "1")
                .header("X-Username", "mallory")
                .header("X-User-Role", "ADMIN")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["x_user_id"], "999");
    assert_eq!(json["x_username"], "admin");
    assert_eq!(json["x_user_role"], "ADMIN");
    assert_eq!(json["x_gateway_auth"], Value::Null);
}

/// Missing credential on a protected path dies at the edge with the uniform
/// body; the upstream is never reached.
#[tokio::test]
async fn test_missing_token_never_reaches_upstream() {
    let (gateway, hits) = gateway_with(None).await;

    let response = gateway
        .oneshot(
            Request::builder()
                .uri("/cafeterias")
                .method(Method::POST)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Unauthorized");
    assert_eq!(json["message"], "Authentication required");
}

/// Tampered and non-Bearer credentials are the same uniform 401.
#[tokio::test]
async fn test_bad_credentials_are_uniform_401() {
    let (gateway, hits) = gateway_with(None).await;

    for auth_value in ["Bearer garbage.token.here", "Basic dXNlcjpwdw=="] {
        let response = gateway
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/cafeterias")
                    .method(Method::POST)
                    .header(header::AUTHORIZATION, auth_value)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Authentication required");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

/// Paths with no route entry are 404 once authenticated.
#[tokio::test]
async fn test_unrouted_path_is_404() {
    let (gateway, _hits) = gateway_with(None).await;
    let token = admin_token();

    let response = gateway
        .oneshot(
            Request::builder()
                .uri("/reviews/1")
                .method(Method::GET)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// With a mesh secret configured the provenance header is stamped alongside
/// the identity.
#[tokio::test]
async fn test_mesh_secret_is_stamped() {
    let (gateway, _hits) = gateway_with(Some("mesh-secret")).await;
    let token = admin_token();

    let response = gateway
        .oneshot(
            Request::builder()
                .uri("/cafeterias")
                .method(Method::POST)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header("X-Gateway-Auth", "forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["x_gateway_auth"], "mesh-secret");
}
