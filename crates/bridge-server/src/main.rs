mod config;
mod console;
mod emit;
mod mappings;
mod session;

use std::sync::Arc;

use bridge_world::block_registry::BlockRegistry;
use bridge_world::physics::PlayerPhysics;
use bytes::Bytes;
use config::BridgeConfig;
use emit::PacketEmitter;
use glam::DVec3;
use mappings::BlockMappings;
use session::Session;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() {
    let config = match BridgeConfig::load_or_default("bridge.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load bridge.toml: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Bridge v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Piston events: {:?}, tick: {} ms, event queue: {}",
        config.pistons.event_source,
        config.session.tick_interval_ms,
        config.session.event_queue_capacity
    );

    let registry = if config.blocks.data_path.is_empty() {
        BlockRegistry::vanilla()
    } else {
        match BlockRegistry::load(&config.blocks.data_path) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Failed to load {}: {e}", config.blocks.data_path);
                std::process::exit(1);
            }
        }
    };
    let registry = Arc::new(registry);
    let mappings = Arc::new(BlockMappings::new(&registry));
    info!(
        "Block registry: {} states, moving block runtime id {:#x}",
        registry.len(),
        mappings.moving_block_runtime_id()
    );

    // Client-bound packets; the transport is attached by the proxy front end.
    let (packet_tx, mut packet_rx) = mpsc::unbounded_channel::<Bytes>();
    tokio::spawn(async move {
        while let Some(packet) = packet_rx.recv().await {
            debug!(len = packet.len(), "client-bound packet");
        }
    });

    let (event_tx, event_rx) = mpsc::channel(config.session.event_queue_capacity);
    let player = PlayerPhysics::at_feet(1, DVec3::new(0.5, 64.0, 0.5));
    let session = Session::new(
        registry.clone(),
        PacketEmitter::new(mappings, packet_tx),
        player,
        config.pistons.event_source,
    );
    let mut session_task = tokio::spawn(session.run(event_rx, config.session.tick_interval()));

    // Console: read events from stdin
    let console_registry = registry.clone();
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match console::parse(&line, &console_registry) {
                Ok(Some(event)) => {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{e}"),
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        result = &mut session_task => {
            match result {
                Ok(Ok(())) => info!("Session ended"),
                Ok(Err(e)) => warn!("Session ended: {e}"),
                Err(e) => warn!("Session task failed: {e}"),
            }
        }
    }
    info!("Bridge shut down.");
}
