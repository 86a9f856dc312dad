//! Cafeteria and stall catalog service.
//!
//! A representative downstream service of the mesh: reads are public, writes
//! are admin-gated, favorites are per-principal. All identity work happens in
//! the shared guard and policy layers; handlers only see a fully-formed
//! principal or none.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use mensa_auth::{GuardState, RoutePolicy, enforce_policy, service_guard};

use store::CatalogStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: CatalogStore,
}

/// Build the catalog router with the standard filter stack: trace, guard,
/// policy, handlers.
pub fn build_router(state: AppState, guard: GuardState, policy: RoutePolicy) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/cafeterias", get(handlers::list_cafeterias))
        .route("/cafeterias", post(handlers::create_cafeteria))
        .route("/cafeterias/{id}", get(handlers::get_cafeteria))
        .route("/cafeterias/{id}", put(handlers::update_cafeteria))
        .route("/cafeterias/{id}", delete(handlers::delete_cafeteria))
        .route("/cafeterias/{id}/stalls", get(handlers::list_stalls))
        .route("/cafeterias/{id}/stalls", post(handlers::create_stall))
        .route("/favorites", get(handlers::list_favorites))
        .route("/favorites/{cafeteria_id}", post(handlers::add_favorite))
        .route(
            "/favorites/{cafeteria_id}",
            delete(handlers::remove_favorite),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(policy, enforce_policy))
        .layer(middleware::from_fn_with_state(guard, service_guard))
        .layer(TraceLayer::new_for_http())
}
