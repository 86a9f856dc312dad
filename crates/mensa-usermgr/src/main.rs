use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mensa_auth::{GuardConfig, GuardState, PublicPaths, TokenCodec, build_policy};
use mensa_usermgr::config::Config;
use mensa_usermgr::issuer::TokenIssuer;
use mensa_usermgr::store::AccountStore;
use mensa_usermgr::{AppState, build_router};

#[derive(Parser, Debug)]
#[command(name = "mensa-usermgr")]
#[command(about = "Account and token issuance service for the mensa mesh")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "MENSA_USERMGR_PORT", default_value = "8081")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "MENSA_USERMGR_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Config file path
    #[arg(short, long, env = "MENSA_USERMGR_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, env = "MENSA_USERMGR_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mensa_usermgr=debug,mensa_auth=debug,tower_http=debug"
    } else {
        "mensa_usermgr=info,mensa_auth=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let store = AccountStore::open(&config.db_path).await?;
    if let Some(admin) = &config.bootstrap_admin {
        let hash = bcrypt::hash(&admin.password, bcrypt::DEFAULT_COST)?;
        store.ensure_admin(&admin.username, &hash).await?;
    }

    let codec = TokenCodec::new(&config.jwt_secret);
    let issuer = TokenIssuer::new(
        store,
        codec.clone(),
        Duration::seconds(config.token_ttl_secs),
    );

    let guard = GuardState::new(
        codec,
        GuardConfig {
            public_paths: PublicPaths::parse(&config.public_paths)
                .map_err(|e| anyhow::anyhow!("invalid public path config: {e}"))?,
            mesh_secret: config.mesh_secret.clone(),
        },
    );
    let policy =
        build_policy(config.policy.clone()).map_err(|e| anyhow::anyhow!("invalid policy: {e}"))?;

    let app = build_router(AppState { issuer }, guard, policy);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    info!("Starting mensa-usermgr on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
