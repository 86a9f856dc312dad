//! Shared identity layer for the mensa service mesh.
//!
//! Provides the pieces every service needs to render a go/no-go decision
//! without re-verifying signatures on each hop:
//! - token encode/decode with a shared symmetric key
//! - the trusted `X-User-*` header contract stamped by the gateway
//! - a per-service request guard with a dual verification path
//! - a declarative route policy consulted after the guard

mod error;
mod guard;
mod headers;
mod policy;
mod principal;
mod token;

pub use error::{AuthError, AuthErrorResponse};
pub use guard::{
    CurrentUser, GuardConfig, GuardState, PublicPaths, RequireAdmin, service_guard,
};
pub use headers::{
    GATEWAY_AUTH_HEADER, TrustedHeaders, USER_ID_HEADER, USER_ROLE_HEADER, USERNAME_HEADER,
};
pub use policy::{
    PolicyEntry, PolicyRule, Requirement, RoutePolicy, build_policy, enforce_policy,
};
pub use principal::{Principal, Role};
pub use token::{Claims, TokenCodec, bearer_token_from_header, resolve_secret};
