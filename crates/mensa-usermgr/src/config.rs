//! Usermgr configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use mensa_auth::PolicyRule;

/// Bootstrap admin credentials, applied once at startup if the account does
/// not exist yet.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Shared symmetric signing key (`env:VAR_NAME` supported).
    pub jwt_secret: String,

    /// Mesh provenance secret; must match the gateway's (`env:` supported).
    #[serde(default)]
    pub mesh_secret: Option<String>,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,

    /// Paths the guard skips identity establishment for.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,

    /// Route authorization table, first match wins.
    #[serde(default = "default_policy")]
    pub policy: Vec<PolicyRule>,

    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mensa-usermgr.db")
}

fn default_token_ttl_secs() -> i64 {
    60 * 60 * 24
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/auth/login".to_string(),
        "/auth/register".to_string(),
        "/auth/refresh".to_string(),
        "/auth/admin/refresh".to_string(),
    ]
}

fn default_policy() -> Vec<PolicyRule> {
    // The refresh endpoints stay policy-public: the issuer decodes the
    // presented token itself so that an expired token is 401 and a non-admin
    // token on the admin path is 403, per the issuance contract.
    let public = |pattern: &str| PolicyRule {
        pattern: pattern.to_string(),
        method: None,
        require: "public".to_string(),
    };
    vec![
        public("/health"),
        public("/auth/login"),
        public("/auth/register"),
        public("/auth/refresh"),
        public("/auth/admin/refresh"),
        // Everything else (e.g. /me) falls through to the authenticated
        // default.
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
