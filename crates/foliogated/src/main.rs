//! foliogated — the Foliogate daemon.
//!
//! Single binary serving the edge gateway: origin resolution, request
//! forwarding, diagnostics, and the gateway's own health endpoint.
//!
//! # Usage
//!
//! ```text
//! foliogated serve --port 4000
//! foliogated probe
//! ```

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tracing::info;

use foliogate_proxy::GatewayState;
use foliogate_resolve::{GatewayConfig, OriginResolver};

#[derive(Parser)]
#[command(name = "foliogated", about = "Foliogate edge gateway daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the gateway.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "4000")]
        port: u16,

        /// Backend port for the container and loopback candidates.
        #[arg(long)]
        backend_port: Option<u16>,

        /// Allowed CORS caller origin (repeatable).
        #[arg(long = "allowed-origin")]
        allowed_origins: Vec<String>,
    },
    /// Probe every candidate origin once and print the results.
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,foliogated=debug,foliogate=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            backend_port,
            allowed_origins,
        } => run_serve(port, backend_port, allowed_origins).await,
        Command::Probe => run_probe().await,
    }
}

async fn run_serve(
    port: u16,
    backend_port: Option<u16>,
    allowed_origins: Vec<String>,
) -> anyhow::Result<()> {
    info!("Foliogate gateway starting");

    let mut config = GatewayConfig::from_env();
    if let Some(backend_port) = backend_port {
        config.backend_port = backend_port;
    }
    if !allowed_origins.is_empty() {
        config.allowed_origins = allowed_origins;
    }

    let state = GatewayState::new(config);
    for candidate in state.resolver.candidates() {
        info!(origin = %candidate.url, source = ?candidate.source, "candidate origin");
    }

    let router = foliogate_api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
    })
    .await?;

    info!("gateway stopped");
    Ok(())
}

async fn run_probe() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env();
    let resolver = OriginResolver::new(&config);

    let results = resolver.probe_all().await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
