//! Request-scoped identity model.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Caller role. Closed set: anything else read off a token or header is a
/// hard failure, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Canonical claim/header form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a role string as it appears at any boundary: claim, trusted
    /// header or policy config. Accepts both the bare form (`ADMIN`) and the
    /// prefixed form (`ROLE_ADMIN`) in any case. Idempotent with respect to
    /// `as_str`.
    pub fn normalize(s: &str) -> Result<Role, AuthError> {
        let trimmed = s.trim();
        let bare = trimmed
            .strip_prefix("ROLE_")
            .or_else(|| trimmed.strip_prefix("role_"))
            .unwrap_or(trimmed);

        if bare.eq_ignore_ascii_case("user") {
            Ok(Role::User)
        } else if bare.eq_ignore_ascii_case("admin") {
            Ok(Role::Admin)
        } else {
            Err(AuthError::InvalidClaim(format!("unknown role: {trimmed}")))
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::normalize(s)
    }
}

impl TryFrom<String> for Role {
    type Error = AuthError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// The verified identity attached to a single request.
///
/// Produced only by `TokenCodec::decode` or by trusting the gateway-stamped
/// headers. Lives in request extensions for exactly one request; nothing may
/// hold one across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "USER");
        assert_eq!(Role::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_normalize_accepts_both_forms() {
        assert_eq!(Role::normalize("USER").unwrap(), Role::User);
        assert_eq!(Role::normalize("ADMIN").unwrap(), Role::Admin);
        assert_eq!(Role::normalize("ROLE_USER").unwrap(), Role::User);
        assert_eq!(Role::normalize("ROLE_ADMIN").unwrap(), Role::Admin);
        assert_eq!(Role::normalize("admin").unwrap(), Role::Admin);
        assert_eq!(Role::normalize(" role_admin ").unwrap(), Role::Admin);
    }

    #[test]
    fn test_normalize_rejects_unknown() {
        assert!(Role::normalize("root").is_err());
        assert!(Role::normalize("").is_err());
        assert!(Role::normalize("ROLE_").is_err());
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["USER", "ADMIN", "ROLE_USER", "role_admin"] {
            let once = Role::normalize(raw).unwrap();
            let twice = Role::normalize(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_principal_is_admin() {
        let p = Principal {
            user_id: 1,
            username: "alice".to_string(),
            role: Role::Admin,
        };
        assert!(p.is_admin());
    }
}
