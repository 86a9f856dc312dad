//! Token encode/decode with the mesh-wide symmetric key.
//!
//! The codec is the only producer of [`Principal`]s from raw credentials.
//! Both the gateway and every service hold an identical codec built from the
//! same pre-shared secret (injected at deploy time); all operations are pure
//! CPU with no I/O.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::AuthError;
use crate::principal::{Principal, Role};

/// Claims carried inside a signed token.
///
/// `user_id` and `role` stay loosely typed here: different issuers in the
/// mesh's history have written the id as an integer or a numeric string, and
/// extraction (not deserialization) is where the shape is enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username.
    pub sub: String,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Resolve a configured secret, supporting `env:VAR_NAME` indirection so the
/// key itself stays out of config files.
pub fn resolve_secret(value: &str) -> Result<String, AuthError> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| AuthError::Internal(format!("environment variable {var} is not set"))),
        None => Ok(value.to_string()),
    }
}

/// Extract a Bearer token from an Authorization header value.
pub fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::MissingCredential)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredential);
    }

    let token = parts.next().ok_or(AuthError::MissingCredential)?;
    if token.is_empty() || parts.next().is_some() {
        return Err(AuthError::MissingCredential);
    }

    Ok(token)
}

/// Normalize the `userId` claim to an i64.
///
/// Accepted shapes are exactly a JSON integer and a numeric string; anything
/// else is rejected rather than coerced.
fn normalize_user_id(value: &Value) -> Result<i64, AuthError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| AuthError::InvalidClaim(format!("non-integer userId: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidClaim(format!("non-numeric userId: {s:?}"))),
        other => Err(AuthError::InvalidClaim(format!(
            "unsupported userId shape: {other}"
        ))),
    }
}

/// Symmetric token codec shared by the issuer, the gateway and every service.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a token for `subject` with a fresh `iat`/`exp` window.
    pub fn encode(
        &self,
        subject: &str,
        user_id: i64,
        role: Role,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        if ttl <= Duration::zero() {
            return Err(AuthError::InvalidClaim(format!(
                "non-positive ttl: {}s",
                ttl.num_seconds()
            )));
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            user_id: Some(Value::from(user_id)),
            role: Some(role.as_str().to_string()),
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Verify signature, structure and expiry, returning the raw claims.
    ///
    /// This is the coarse gate: a token can pass here and still fail claim
    /// extraction in [`decode`](Self::decode).
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::SignatureMismatch,
                _ => AuthError::MalformedToken,
            }
        })?;

        // jsonwebtoken treats exp == now as live; the contract here is that a
        // token is dead at exactly its expiry instant.
        if Utc::now().timestamp() >= data.claims.exp {
            return Err(AuthError::ExpiredToken);
        }

        Ok(data.claims)
    }

    /// Full decode: verified claims extracted into a [`Principal`].
    ///
    /// A token whose signature verifies but which lacks `sub`, `userId` or
    /// `role` is still invalid here.
    pub fn decode(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.decode_claims(token)?;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingClaim("sub"));
        }
        let user_id = claims
            .user_id
            .as_ref()
            .ok_or(AuthError::MissingClaim("userId"))
            .and_then(normalize_user_id)?;
        let role = claims
            .role
            .as_deref()
            .ok_or(AuthError::MissingClaim("role"))
            .and_then(Role::normalize)?;

        Ok(Principal {
            user_id,
            username: claims.sub,
            role,
        })
    }

    /// Boolean gate used by filters. Signature and expiry only; the failure
    /// taxonomy is logged, not returned.
    pub fn is_valid(&self, token: &str) -> bool {
        match self.decode_claims(token) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "token rejected");
                false
            }
        }
    }
}
