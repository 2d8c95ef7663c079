use anyhow::{Context, Result};
use arealine_voice::{create_router, AppState, AssistantSession, Config};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "arealine-voice")]
#[command(about = "AreaLine voice assistant service")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/arealine-voice")]
    config: String,

    /// Override the HTTP bind address (host:port)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("AreaLine Voice v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Grid: {}", cfg.grid.url);

    let bind = args
        .bind
        .unwrap_or_else(|| format!("{}:{}", cfg.service.http.bind, cfg.service.http.port));

    let assistant = Arc::new(AssistantSession::new(cfg)?);
    let router = create_router(AppState::new(assistant));

    info!("HTTP server listening on {}", bind);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    axum::serve(listener, router).await?;

    Ok(())
}
