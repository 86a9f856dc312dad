use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mensa_auth::{GuardConfig, GuardState, PublicPaths, TokenCodec, build_policy};
use mensa_catalog::config::Config;
use mensa_catalog::store::CatalogStore;
use mensa_catalog::{AppState, build_router};

#[derive(Parser, Debug)]
#[command(name = "mensa-catalog")]
#[command(about = "Cafeteria and stall catalog service for the mensa mesh")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "MENSA_CATALOG_PORT", default_value = "8082")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "MENSA_CATALOG_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Config file path
    #[arg(short, long, env = "MENSA_CATALOG_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, env = "MENSA_CATALOG_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mensa_catalog=debug,mensa_auth=debug,tower_http=debug"
    } else {
        "mensa_catalog=info,mensa_auth=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let store = CatalogStore::open(&config.db_path).await?;

    let guard = GuardState::new(
        TokenCodec::new(&config.jwt_secret),
        GuardConfig {
            public_paths: PublicPaths::parse(&config.public_paths)
                .map_err(|e| anyhow::anyhow!("invalid public path config: {e}"))?,
            mesh_secret: config.mesh_secret.clone(),
        },
    );
    let policy =
        build_policy(config.policy.clone()).map_err(|e| anyhow::anyhow!("invalid policy: {e}"))?;

    let app = build_router(AppState { store }, guard, policy);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    info!("Starting mensa-catalog on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
