//! Cross-process socket rooms over Redis Pub/Sub
//!
//! Lets several server processes share one logical set of rooms: a broadcast to
//! a room on any process reaches every socket in that room on every process.
//!
//! # Architecture
//!
//! ```text
//! Process A:
//!   1. broadcast(room, event, args)
//!   2. Deliver to A's local sockets in room
//!   3. PUBLISH socket.io#<node-a> {"args": [...], "opts": [room, event]}
//!      ↓
//! Redis Pub/Sub (PSUBSCRIBE socket.io#*, every process including A)
//!      ↓
//! Process A: channel suffix is its own node id -> echo dropped
//! Process B, C, ...:
//!   4. Decode envelope
//!   5. Deliver to local sockets in room, never publish again
//! ```
//!
//! # Example
//!
//! ```no_run
//! use redis_rooms::{AdapterConfig, ChannelSocket, RoomsAdapter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let adapter = RoomsAdapter::connect(&AdapterConfig::default()).await?;
//!
//!     let (socket, mut frames) = ChannelSocket::new("client-1");
//!     adapter.join("lobby", Arc::new(socket)).await;
//!
//!     // Reaches "lobby" members on every process
//!     adapter.broadcast(None, "lobby", "chat", vec!["hello".into()]).await;
//!
//!     while let Some(frame) = frames.recv().await {
//!         println!("{}", frame);
//!     }
//!     Ok(())
//! }
//! ```

mod adapter;
pub mod config;
pub mod coordinator;
pub mod envelope;
mod error;
pub mod node;
pub mod registry;
pub mod relay;
pub mod socket;
mod stats;
pub mod transport;

pub use adapter::RoomsAdapter;
pub use config::AdapterConfig;
pub use coordinator::{BroadcastCoordinator, BroadcastReport, Origin};
pub use envelope::BroadcastEnvelope;
pub use error::RoomsError;
pub use node::{ChannelKey, NodeId};
pub use registry::RoomRegistry;
pub use relay::{RelayExit, RelayState, RemoteMessageRelay};
pub use socket::{ChannelSocket, Socket};
pub use stats::{RoomsStats, StatsCollector};
pub use transport::{EventStream, MemoryPubSub, PubSubEvent, Publisher, SubscriptionKind};

pub type Result<T> = std::result::Result<T, RoomsError>;
