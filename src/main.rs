use clap::Parser;
use kv_composer::server::{Config, Server};
use kv_composer::storage::{KvService, KvStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    tracing::info!("Starting kv-server on {}", config.bind_addr);
    if config.enable_metrics {
        tracing::info!("API metrics enabled on /metrics");
    }
    if config.enable_pprof {
        tracing::info!("Runtime snapshots enabled on /debug/pprof");
    }

    // 1. Storage layer:
    let store = Arc::new(KvStore::new());

    // 2. Services:
    let mut server = Server::new(config.clone());
    server.register_service(&KvService::with_group(&config.kv_group, store))?;

    // 3. Interrupt -> graceful shutdown:
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received");
                shutdown.shutdown();
            }
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
    });

    // 4. Start HTTP server:
    tracing::info!("Press Ctrl+C to shutdown");
    if let Err(e) = server.run().await {
        tracing::error!("Fatal: {}", e);
        eprintln!("err: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
