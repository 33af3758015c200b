//! Example: one chat node sharing a room with every other node on the prefix
//!
//! Start two or more copies against the same Redis and type lines into any of
//! them; each line is broadcast to the room on all nodes.
//!
//! Run with: ROOMS_PREFIX=demo cargo run --example chat_node -- lobby

use redis_rooms::{AdapterConfig, ChannelSocket, RoomsAdapter, Socket};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,redis_rooms=debug"));
    fmt().with_env_filter(env_filter).with_target(false).init();

    let room = std::env::args().nth(1).unwrap_or_else(|| "lobby".to_string());
    let config = AdapterConfig::from_env()?;

    let adapter = RoomsAdapter::connect(&config).await?;
    println!("Node {} joined room '{}'", adapter.node_id(), room);

    let (socket, mut frames) = ChannelSocket::random();
    let socket_id = socket.id().to_string();
    adapter.join(&room, Arc::new(socket)).await;

    let printer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            println!("<- {}", frame);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                // exclude our own socket so typed lines are not echoed back
                let report = adapter
                    .broadcast(Some(&socket_id), &room, "chat", vec![line.into()])
                    .await;
                if !report.published {
                    eprintln!("warning: message was not mirrored to other nodes");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    adapter.leave_all(&socket_id).await;
    let exit = adapter.shutdown().await;
    println!("Relay stopped: {:?}", exit);
    printer.abort();

    Ok(())
}
