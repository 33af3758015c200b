//! Adapter wiring: registry, coordinator and relay behind one handle

use crate::config::AdapterConfig;
use crate::coordinator::{BroadcastCoordinator, BroadcastReport, Origin};
use crate::node::{subscription_pattern, ChannelKey, NodeId};
use crate::registry::RoomRegistry;
use crate::relay::{RelayExit, RemoteMessageRelay};
use crate::socket::Socket;
use crate::stats::{RoomsStats, StatsCollector};
use crate::transport::{
    redis_subscribe, EventStream, PubSubEvent, Publisher, RedisPublisher, SubscriptionKind,
};
use crate::Result;
use futures_util::stream::{self, StreamExt};
use redis::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Room adapter shared by every process using the same prefix
///
/// Owns the local room registry, the broadcast coordinator and the background
/// relay task. Dropping the adapter stops the relay.
pub struct RoomsAdapter {
    node_id: NodeId,
    coordinator: Arc<BroadcastCoordinator>,
    stats: StatsCollector,
    shutdown_tx: watch::Sender<()>,
    relay: JoinHandle<RelayExit>,
}

impl RoomsAdapter {
    /// Connect to Redis with one publishing and one subscribing connection
    ///
    /// Fails if either connection or the pattern subscription cannot be
    /// established.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use redis_rooms::{AdapterConfig, RoomsAdapter};
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let adapter = RoomsAdapter::connect(&AdapterConfig::default()).await?;
    /// adapter.broadcast(None, "lobby", "chat", vec!["hello".into()]).await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &AdapterConfig) -> Result<Self> {
        let client = Client::open(config.redis_url())?;
        let publisher = RedisPublisher::connect(client.clone()).await?;
        let events = redis_subscribe(&client, &config.pattern()).await?;

        info!(
            host = %config.host,
            port = config.port,
            prefix = %config.prefix,
            "Connected room adapter to Redis"
        );

        Ok(Self::with_transport(&config.prefix, Arc::new(publisher), events))
    }

    /// Build over any transport; `events` must already be subscribed to
    /// `prefix#*`. Must be called within a Tokio runtime.
    pub fn with_transport(
        prefix: &str,
        publisher: Arc<dyn Publisher>,
        events: EventStream,
    ) -> Self {
        let node_id = NodeId::new();
        let channel = ChannelKey::new(prefix, &node_id);
        let stats = StatsCollector::new();

        let coordinator = Arc::new(BroadcastCoordinator::new(
            RoomRegistry::new(),
            publisher,
            channel.clone(),
            stats.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let events = until_shutdown(events, subscription_pattern(prefix), shutdown_rx);

        let relay =
            RemoteMessageRelay::new(node_id.clone(), Arc::clone(&coordinator), stats.clone())
                .spawn(events);

        info!(node_id = %node_id, channel = %channel, "Room adapter started");

        Self {
            node_id,
            coordinator,
            stats,
            shutdown_tx,
            relay,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn channel(&self) -> &ChannelKey {
        self.coordinator.channel()
    }

    pub async fn join(&self, room: &str, socket: Arc<dyn Socket>) {
        self.coordinator.registry().join(room, socket).await;
    }

    pub async fn leave(&self, room: &str, socket_id: &str) {
        self.coordinator.registry().leave(room, socket_id).await;
    }

    /// Remove a disconnected socket from all rooms
    pub async fn leave_all(&self, socket_id: &str) -> Vec<String> {
        self.coordinator.registry().leave_all(socket_id).await
    }

    pub async fn members_of(&self, room: &str) -> Vec<Arc<dyn Socket>> {
        self.coordinator.registry().members_of(room).await
    }

    pub async fn rooms(&self) -> Vec<String> {
        self.coordinator.registry().rooms().await
    }

    /// Broadcast to `room` on every node, skipping the socket with id `exclude`
    pub async fn broadcast(
        &self,
        exclude: Option<&str>,
        room: &str,
        event: &str,
        args: Vec<Value>,
    ) -> BroadcastReport {
        self.coordinator
            .broadcast(exclude, room, event, args, Origin::Local)
            .await
    }

    pub fn stats(&self) -> RoomsStats {
        self.stats.snapshot()
    }

    /// Whether cross-node mirroring has stopped; local broadcast keeps working
    pub fn relay_finished(&self) -> bool {
        self.relay.is_finished()
    }

    /// Stop the relay and wait for it to exit
    pub async fn shutdown(self) -> RelayExit {
        let _ = self.shutdown_tx.send(());

        match self.relay.await {
            Ok(exit) => {
                info!(node_id = %self.node_id, reason = ?exit, "Room adapter shut down");
                exit
            }
            Err(e) => {
                error!(error = %e, node_id = %self.node_id, "Relay task failed");
                RelayExit::StreamClosed
            }
        }
    }
}

/// Append a zero-count unsubscribe to `events` once shutdown is signalled or
/// the adapter is dropped
fn until_shutdown(
    events: EventStream,
    pattern: String,
    mut shutdown: watch::Receiver<()>,
) -> EventStream {
    let unsubscribed = stream::once(async move {
        // Err means the sender was dropped, which is also a shutdown
        let _ = shutdown.changed().await;
        PubSubEvent::Subscription {
            kind: SubscriptionKind::PUnsubscribe,
            channel: pattern,
            count: 0,
        }
    });

    stream::select(events, unsubscribed).boxed()
}
