use anyhow::{Context, Result};
use cachegrid::api;
use cachegrid::cache::memory::LocalCache;
use cachegrid::config::Config;
use cachegrid::membership::service::MembershipService;
use cachegrid::membership::types::NodeId;
use cachegrid::persistence::manager::PersistenceManager;
use cachegrid::replication::coordinator::ReplicationCoordinator;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            eprintln!(
                "Usage: cachegrid [--port N] [--eviction lru|lfu] [--max-items N] \
                 [--node-id ID] [--seed URL] [--data-dir DIR] [--replicas N] \
                 [--persistence on|off] [--check-interval SECS] [--save-interval SECS]"
            );
            std::process::exit(1);
        }
    };

    let node_id = config
        .node_id
        .clone()
        .map(NodeId)
        .unwrap_or_else(NodeId::new);
    let address = format!("http://127.0.0.1:{}", config.port);

    tracing::info!("starting node {} ({:?} eviction, capacity {})", node_id, config.eviction, config.max_items);

    // 1. Local store:
    let cache = Arc::new(LocalCache::new(config.eviction, config.max_items));

    // 2. Cluster view + hash ring:
    let membership = MembershipService::new(node_id.clone(), address.clone(), config.check_interval);

    // 3. Replication fan-out:
    let replication = ReplicationCoordinator::new(cache.clone(), membership.clone(), config.replicas);

    // 4. Persistence (restore + periodic snapshots), if enabled:
    let persistence = if config.persistence {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", config.data_dir.display()))?;
        let file_path = config.data_dir.join(format!("cache-{}.json", node_id));
        let manager = PersistenceManager::new(cache.clone(), file_path, config.save_interval);
        manager.start().await;
        Some(manager)
    } else {
        None
    };

    // 5. Background membership loops:
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    membership.clone().start(shutdown_rx);

    // 6. Join the cluster through the seed node, if one was given:
    if let Some(seed) = config.seed.clone() {
        let membership = membership.clone();
        tokio::spawn(async move {
            // Give our own listener a moment before announcing ourselves.
            tokio::time::sleep(Duration::from_secs(1)).await;
            if let Err(e) = membership.join_seed(&seed).await {
                tracing::error!("joining the cluster failed: {e:#}");
            }
        });
    }

    // 7. HTTP server:
    let app = api::build_router(cache, membership, replication);
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    tracing::info!("node {} listening on {} ({})", node_id, bind_addr, address);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    // 8. Stop background loops; persistence takes its final snapshot.
    let _ = shutdown_tx.send(true);
    if let Some(manager) = persistence {
        manager.stop().await;
    }

    tracing::info!("node {} stopped", node_id);
    Ok(())
}
