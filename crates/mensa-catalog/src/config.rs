//! Catalog service configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use mensa_auth::PolicyRule;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Shared symmetric signing key (`env:VAR_NAME` supported). Needed only
    /// for the direct-call fallback path; header-trusted requests never touch
    /// it.
    pub jwt_secret: String,

    /// Mesh provenance secret; must match the gateway's (`env:` supported).
    /// Unset means headers are trusted on topology alone.
    #[serde(default)]
    pub mesh_secret: Option<String>,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,

    #[serde(default = "default_policy")]
    pub policy: Vec<PolicyRule>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mensa-catalog.db")
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "GET /cafeterias".to_string(),
    ]
}

fn default_policy() -> Vec<PolicyRule> {
    let rule = |pattern: &str, method: Option<&str>, require: &str| PolicyRule {
        pattern: pattern.to_string(),
        method: method.map(|m| m.to_string()),
        require: require.to_string(),
    };
    vec![
        rule("/health", None, "public"),
        // Catalog reads are open; every write under the same prefix needs
        // the admin role.
        rule("/cafeterias/**", Some("GET"), "public"),
        rule("/cafeterias/**", None, "admin"),
        // Favorites need a principal but any role will do; falls through to
        // the authenticated default.
    ]
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.jwt_secret = mensa_auth::resolve_secret(&config.jwt_secret)?;
        if let Some(secret) = &config.mesh_secret {
            config.mesh_secret = Some(mensa_auth::resolve_secret(secret)?);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use mensa_auth::{Requirement, build_policy};

    #[test]
    fn test_default_policy_shape() {
        let policy = build_policy(default_policy()).unwrap();
        assert_eq!(
            policy.requirement_for(&Method::GET, "/cafeterias/3"),
            Requirement::Public
        );
        assert_eq!(
            policy.requirement_for(&Method::POST, "/cafeterias"),
            Requirement::Admin
        );
        assert_eq!(
            policy.requirement_for(&Method::GET, "/favorites"),
            Requirement::Authenticated
        );
    }
}
