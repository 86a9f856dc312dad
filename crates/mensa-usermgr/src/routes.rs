//! Router assembly.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use mensa_auth::{GuardState, RoutePolicy, enforce_policy, service_guard};

use crate::AppState;
use crate::handlers;

/// Build the usermgr router.
///
/// Filter order is outermost-first: trace, then the guard establishing the
/// principal, then policy enforcement, then handlers.
pub fn build_router(state: AppState, guard: GuardState, policy: RoutePolicy) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/admin/refresh", post(handlers::refresh_admin))
        .route("/me", get(handlers::me))
        .with_state(state)
        .layer(middleware::from_fn_with_state(policy, enforce_policy))
        .layer(middleware::from_fn_with_state(guard, service_guard))
        .layer(TraceLayer::new_for_http())
}
