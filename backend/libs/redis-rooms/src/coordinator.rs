//! Broadcast fan-out
//!
//! Delivers to local room members first, then mirrors locally originated
//! broadcasts onto this node's channel.

use crate::envelope::BroadcastEnvelope;
use crate::node::ChannelKey;
use crate::registry::RoomRegistry;
use crate::stats::StatsCollector;
use crate::transport::Publisher;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Where a broadcast came from
///
/// Passed per call; a broadcast decoded from another node is never published again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Requested by this node's surrounding framework
    Local,
    /// Decoded from another node's envelope
    Remote,
}

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sockets that accepted the event
    pub delivered: usize,
    /// Sockets whose emit failed
    pub failed: usize,
    /// Whether an envelope was handed to the transport successfully
    pub published: bool,
}

pub struct BroadcastCoordinator {
    registry: RoomRegistry,
    publisher: Arc<dyn Publisher>,
    channel: ChannelKey,
    stats: StatsCollector,
}

impl BroadcastCoordinator {
    pub fn new(
        registry: RoomRegistry,
        publisher: Arc<dyn Publisher>,
        channel: ChannelKey,
        stats: StatsCollector,
    ) -> Self {
        Self {
            registry,
            publisher,
            channel,
            stats,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn channel(&self) -> &ChannelKey {
        &self.channel
    }

    /// Deliver `event` to every member of `room` except `exclude`, then publish
    /// if the broadcast originated locally.
    ///
    /// Per-socket and publish failures are logged and reported, never returned.
    pub async fn broadcast(
        &self,
        exclude: Option<&str>,
        room: &str,
        event: &str,
        args: Vec<Value>,
        origin: Origin,
    ) -> BroadcastReport {
        let members = self.registry.members_of(room).await;
        let mut report = BroadcastReport::default();

        for socket in members
            .iter()
            .filter(|socket| exclude != Some(socket.id()))
        {
            match socket.emit(event, &args) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        error = %e,
                        socket_id = %socket.id(),
                        room = %room,
                        event = %event,
                        "Failed to deliver broadcast to socket"
                    );
                }
            }
        }

        self.stats.record_deliveries(report.delivered, report.failed);

        debug!(
            room = %room,
            event = %event,
            origin = ?origin,
            delivered = report.delivered,
            failed = report.failed,
            "Local delivery complete"
        );

        if origin == Origin::Local {
            self.stats.record_local_broadcast();
            report.published = self.publish(room, event, args).await;
        }

        report
    }

    async fn publish(&self, room: &str, event: &str, args: Vec<Value>) -> bool {
        let payload = match BroadcastEnvelope::new(room, event, args).encode() {
            Ok(p) => p,
            Err(e) => {
                self.stats.record_publish_error();
                error!(error = %e, room = %room, event = %event, "Failed to encode envelope");
                return false;
            }
        };

        match self.publisher.publish(self.channel.as_str(), payload).await {
            Ok(receivers) => {
                self.stats.record_publish();
                debug!(
                    channel = %self.channel,
                    room = %room,
                    event = %event,
                    receivers = receivers,
                    "Broadcast envelope published"
                );
                true
            }
            Err(e) => {
                self.stats.record_publish_error();
                error!(
                    error = %e,
                    channel = %self.channel,
                    room = %room,
                    event = %event,
                    "Failed to publish broadcast envelope"
                );
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::socket::{ChannelSocket, Socket};
    use crate::{Result, RoomsError};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::Mutex;

    /// Publisher that records every publish
    #[derive(Default)]
    pub(crate) struct RecordingPublisher {
        pub(crate) published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize> {
            self.published
                .lock()
                .await
                .push((channel.to_string(), payload));
            Ok(1)
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl Publisher for FailingPublisher {
        async fn publish(&self, _channel: &str, _payload: Vec<u8>) -> Result<usize> {
            Err(RoomsError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection reset",
            ))))
        }
    }

    pub(crate) fn coordinator(publisher: Arc<dyn Publisher>) -> BroadcastCoordinator {
        BroadcastCoordinator::new(
            RoomRegistry::new(),
            publisher,
            ChannelKey::new("socket.io", &NodeId::from("node-a")),
            StatsCollector::new(),
        )
    }

    pub(crate) async fn join(
        coordinator: &BroadcastCoordinator,
        room: &str,
        id: &str,
    ) -> UnboundedReceiver<String> {
        let (socket, rx) = ChannelSocket::new(id);
        coordinator.registry().join(room, Arc::new(socket)).await;
        rx
    }

    #[tokio::test]
    async fn test_local_broadcast_delivers_and_publishes_once() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = coordinator(publisher.clone());
        let mut a = join(&coordinator, "lobby", "a").await;
        let mut b = join(&coordinator, "lobby", "b").await;
        let mut c = join(&coordinator, "lobby", "c").await;

        let report = coordinator
            .broadcast(None, "lobby", "chat", vec![json!("hi")], Origin::Local)
            .await;

        assert_eq!(report.delivered, 3);
        assert!(report.published);
        for rx in [&mut a, &mut b, &mut c] {
            assert_eq!(rx.try_recv().unwrap(), r#"["chat","hi"]"#);
        }

        let published = publisher.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "socket.io#node-a");
        let envelope = BroadcastEnvelope::decode(&published[0].1).unwrap();
        assert_eq!(envelope, BroadcastEnvelope::new("lobby", "chat", vec![json!("hi")]));
    }

    #[tokio::test]
    async fn test_excluded_socket_is_skipped() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = coordinator(publisher.clone());
        let mut a = join(&coordinator, "lobby", "a").await;
        let mut b = join(&coordinator, "lobby", "b").await;

        let report = coordinator
            .broadcast(Some("a"), "lobby", "chat", vec![], Origin::Local)
            .await;

        assert_eq!(report.delivered, 1);
        assert!(a.try_recv().is_err());
        assert_eq!(b.try_recv().unwrap(), r#"["chat"]"#);
        assert_eq!(publisher.published.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_excluding_non_member_delivers_to_all() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = coordinator(publisher);
        let _a = join(&coordinator, "lobby", "a").await;
        let _b = join(&coordinator, "lobby", "b").await;

        let report = coordinator
            .broadcast(Some("stranger"), "lobby", "chat", vec![], Origin::Local)
            .await;
        assert_eq!(report.delivered, 2);
    }

    #[tokio::test]
    async fn test_remote_origin_is_not_republished() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = coordinator(publisher.clone());
        let mut a = join(&coordinator, "lobby", "a").await;

        let report = coordinator
            .broadcast(None, "lobby", "chat", vec![json!("x")], Origin::Remote)
            .await;

        assert_eq!(report.delivered, 1);
        assert!(!report.published);
        assert_eq!(a.try_recv().unwrap(), r#"["chat","x"]"#);
        assert!(publisher.published.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_room_still_publishes() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = coordinator(publisher.clone());

        let report = coordinator
            .broadcast(None, "nobody-here", "chat", vec![], Origin::Local)
            .await;

        assert_eq!(report.delivered, 0);
        assert!(report.published);
        assert_eq!(publisher.published.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_socket_does_not_block_others() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = coordinator(publisher.clone());
        let dead = join(&coordinator, "lobby", "dead").await;
        drop(dead);
        let mut live = join(&coordinator, "lobby", "live").await;

        let report = coordinator
            .broadcast(None, "lobby", "chat", vec![], Origin::Local)
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(report.published);
        assert_eq!(live.try_recv().unwrap(), r#"["chat"]"#);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_local_delivery() {
        let coordinator = coordinator(Arc::new(FailingPublisher));
        let mut a = join(&coordinator, "lobby", "a").await;

        let report = coordinator
            .broadcast(None, "lobby", "chat", vec![], Origin::Local)
            .await;

        assert_eq!(report.delivered, 1);
        assert!(!report.published);
        assert_eq!(a.try_recv().unwrap(), r#"["chat"]"#);
        assert_eq!(coordinator.stats.snapshot().publish_errors, 1);
    }

    #[tokio::test]
    async fn test_exclusion_matches_by_id_not_handle() {
        let publisher = Arc::new(RecordingPublisher::default());
        let coordinator = coordinator(publisher);
        let mut a = join(&coordinator, "lobby", "a").await;

        // a fresh handle with the same id replaces the old one
        let (replacement, mut replacement_rx) = ChannelSocket::new("a");
        let exclude = replacement.id().to_string();
        coordinator.registry().join("lobby", Arc::new(replacement)).await;

        let report = coordinator
            .broadcast(Some(&exclude), "lobby", "chat", vec![], Origin::Local)
            .await;

        assert_eq!(report.delivered, 0);
        assert!(a.try_recv().is_err());
        assert!(replacement_rx.try_recv().is_err());
    }
}
