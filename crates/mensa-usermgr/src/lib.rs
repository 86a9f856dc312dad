//! Account and token issuance service for the mensa mesh.
//!
//! Holds the credential store and mints the signed tokens the rest of the
//! mesh verifies. Also wired with the standard service guard so `/me` and
//! future account routes see the same dual-path identity establishment as
//! every other service.

pub mod config;
pub mod handlers;
pub mod issuer;
pub mod routes;
pub mod store;

use issuer::TokenIssuer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: TokenIssuer,
}

pub use routes::build_router;
