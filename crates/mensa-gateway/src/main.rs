use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mensa_gateway::build_router;
use mensa_gateway::config::Config;

#[derive(Parser, Debug)]
#[command(name = "mensa-gateway")]
#[command(about = "Edge tier for the mensa service mesh")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "MENSA_GATEWAY_PORT", default_value = "8080")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "MENSA_GATEWAY_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Config file path
    #[arg(short, long, env = "MENSA_GATEWAY_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, env = "MENSA_GATEWAY_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mensa_gateway=debug,mensa_auth=debug,tower_http=debug"
    } else {
        "mensa_gateway=info,mensa_auth=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    info!(
        routes = config.routes.len(),
        provenance = config.mesh_secret.is_some(),
        "gateway configured"
    );

    let app = build_router(&config)?;

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    info!("Starting mensa-gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
