//! Edge tier for the mensa mesh.
//!
//! Authenticates every inbound request once, restates the identity as the
//! trusted header set, and forwards to the owning service from a static
//! route table.

pub mod config;
pub mod edge;
pub mod proxy;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::Response,
};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use mensa_auth::{PublicPaths, TokenCodec};

use config::Config;
use edge::{EdgeState, edge_guard};
use proxy::RouteTable;

/// Forwarding state behind the edge filter.
#[derive(Clone)]
pub struct ProxyState {
    table: RouteTable,
    http_client: Client<HttpConnector, Body>,
}

async fn forward_request(
    State(state): State<ProxyState>,
    req: Request<Body>,
) -> Result<Response, StatusCode> {
    let Some(upstream) = state.table.upstream_for(req.uri().path()) else {
        warn!(path = %req.uri().path(), "no upstream route");
        return Err(StatusCode::NOT_FOUND);
    };
    let upstream = upstream.to_string();
    proxy::forward(state.http_client.clone(), req, &upstream).await
}

/// Build the gateway router: one forwarding fallback wrapped by the edge
/// filter, tracing and CORS.
pub fn build_router(config: &Config) -> anyhow::Result<Router> {
    let codec = TokenCodec::new(&config.jwt_secret);
    let public = PublicPaths::parse(&config.public_paths)
        .map_err(|e| anyhow::anyhow!("invalid public path config: {e}"))?;
    let edge_state = EdgeState::new(codec, public, config.mesh_secret.clone());

    let http_client: Client<HttpConnector, Body> =
        Client::builder(TokioExecutor::new()).build_http();
    let proxy_state = ProxyState {
        table: RouteTable::new(config.routes.clone()),
        http_client,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .fallback(forward_request)
        .with_state(proxy_state)
        .layer(middleware::from_fn_with_state(edge_state, edge_guard))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}
