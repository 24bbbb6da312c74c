//! `triage serve` -- run the HTTP API until Ctrl+C.
//!
//! Refuses to start when the model artifact is missing or does not match
//! the configured encoder; run `triage train` first.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use logtriage_core::AppContext;
use logtriage_services::{ApiState, build_router};

use super::load_config;

#[derive(Args)]
pub struct ServeArgs {
    /// Bind host (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn run(args: ServeArgs, config_flag: Option<&Path>) -> anyhow::Result<()> {
    let (mut config, _) = load_config(config_flag)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let cors_origins = config.server.cors_origins.clone();

    let ctx = AppContext::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("{e}; run `triage train` to create a model"))?;
    let router = build_router(ApiState::new(Arc::new(ctx)), &cors_origins);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
        on_signal.cancel();
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    info!("server stopped");
    Ok(())
}
