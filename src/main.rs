//! Pest management advisor service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (axum) ──▶ QueryOrchestrator ──▶ knowledge source
//!                                       │
//!                                       ▼
//!                               InferenceClient ──▶ cache (exact, semantic, disk)
//!                                       │
//!                                       ▼
//!                         circuit breaker ──▶ retry ──▶ inference backend
//!
//!     Background: NonBlockingInitializer (probe → provision), cache maintenance
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use pest_advisor::config::loader::resolve_config;
use pest_advisor::lifecycle::signals::wait_for_termination;
use pest_advisor::observability::{logging, metrics};
use pest_advisor::{Engine, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "pest-advisor")]
#[command(about = "Pest management advisory service", long_about = None)]
struct Args {
    /// TOML configuration file. Falls back to ADVISOR_CONFIG, then defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = args.config.or_else(|| std::env::var_os("ADVISOR_CONFIG").map(PathBuf::from));
    let config = resolve_config(config_path.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pest-advisor starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        backend = %config.backend.base_url,
        default_model = %config.backend.default_model,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let engine = Arc::new(Engine::new(config)?);
    let maintenance = engine.start(&shutdown);

    let server = HttpServer::new(engine);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_termination().await;
    shutdown.trigger();

    server_task.await??;
    if let Err(e) = maintenance.await {
        tracing::warn!(error = %e, "Cache maintenance task ended abnormally");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
