//! Gateway configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One forwarding rule: requests whose path starts with `prefix` go to
/// `upstream`. Longest prefix wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTarget {
    /// Path prefix, e.g. `/cafeterias`.
    pub prefix: String,
    /// Upstream base URL, e.g. `http://127.0.0.1:8081`.
    pub upstream: String,
}

/// Gateway configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shared symmetric signing key. Supports `env:VAR_NAME` indirection so
    /// the secret itself stays out of the config file.
    pub jwt_secret: String,

    /// Optional mesh provenance secret stamped as `X-Gateway-Auth` so
    /// services can verify headers really came from the edge tier. Also
    /// supports `env:VAR_NAME`.
    #[serde(default)]
    pub mesh_secret: Option<String>,

    /// Paths forwarded without any credential: `"/auth/login"` or
    /// `"GET /cafeterias"`.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,

    /// Forwarding table.
    #[serde(default)]
    pub routes: Vec<RouteTarget>,
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/auth/login".to_string(),
        "/auth/register".to_string(),
        "GET /cafeterias".to_string(),
        "GET /stalls".to_string(),
        "/health".to_string(),
        "/docs".to_string(),
    ]
}

impl Config {
    /// Load config from a TOML file and resolve `env:` secrets.
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

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            jwt_secret = "secret"

            [[routes]]
            prefix = "/auth"
            upstream = "http://127.0.0.1:8081"
            "#,
        )
        .unwrap();

        assert_eq!(config.jwt_secret, "secret");
        assert!(config.mesh_secret.is_none());
        assert_eq!(config.routes.len(), 1);
        assert!(config.public_paths.contains(&"/health".to_string()));
    }

    #[test]
    fn test_env_secret_resolution() {
        unsafe { std::env::set_var("MENSA_GW_TEST_SECRET", "from-env") };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "jwt_secret = \"env:MENSA_GW_TEST_SECRET\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.jwt_secret, "from-env");
    }
}
