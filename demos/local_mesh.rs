//! Three nodes streaming to each other over an in-process network
//!
//! Run with: cargo run --example local_mesh [SECONDS]
//!
//! Each node joins the same memory network, discovers the other two, dials
//! them and starts pushing its test pattern. After SECONDS (default 5) or
//! Ctrl+C the nodes shut down and the render counts are printed.
//!
//! Set RUST_LOG=framemesh=debug to see every dial and session change.

use std::sync::Arc;
use std::time::Duration;

use framemesh::media::{FrameGeometry, MemorySink, TestPatternSource};
use framemesh::protocol::constants::PROTOCOL_ID;
use framemesh::transport::{MemoryNetwork, MemoryTransport};
use framemesh::{Node, NodeConfig, PeerId};
use tokio::sync::watch;

const NODES: [&str; 3] = ["QmAlice", "QmBob", "QmCarol"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seconds: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 5,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("framemesh=info".parse()?),
        )
        .init();

    let network = MemoryNetwork::new().identify_delay(Duration::from_millis(50));
    let config = NodeConfig::default()
        .geometry(FrameGeometry::new(64, 64)?)
        .send_interval(Duration::from_millis(100));

    println!("framemesh local mesh");
    println!("====================");
    println!("Nodes:    {}", NODES.join(", "));
    println!("Protocol: {}", config.protocol_id);
    println!("Running for {}s, press Ctrl+C to stop early...", seconds);
    println!();

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut nodes: Vec<Arc<Node<MemoryTransport, MemorySink>>> = Vec::new();
    let mut tasks = Vec::new();

    for (seed, id) in NODES.iter().enumerate() {
        let transport = network.join(*id, &[PROTOCOL_ID]);
        let node = Arc::new(Node::new(
            config.clone(),
            transport,
            Arc::new(MemorySink::new()),
        ));

        let runner = Arc::clone(&node);
        let mut stop = stop_rx.clone();
        let source = TestPatternSource::new(seed as u8 * 40).with_warmup(3);
        tasks.push(tokio::spawn(async move {
            runner
                .run_until(source, async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                })
                .await
        }));
        nodes.push(node);
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    // Report before shutdown tears the render targets down
    for node in &nodes {
        let local = node.local_peer_id();
        let stats = node.stats().await;
        println!(
            "{}: sessions={} ticks={} frames_received={} ({:.1}/s)",
            local,
            stats.active_sessions,
            stats.ticks,
            stats.frames_received,
            stats.receive_rate(),
        );
        for id in NODES {
            let peer = PeerId::new(id);
            println!("    {:<8} rendered {}", peer, node.sink().frames_rendered(&peer));
        }
    }

    let _ = stop_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await? {
            eprintln!("Node error: {}", e);
        }
    }

    Ok(())
}
