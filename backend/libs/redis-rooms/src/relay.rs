//! Remote message relay
//!
//! Consumes the pattern subscription, drops this node's own echoes and replays
//! other nodes' envelopes into local delivery only.
//!
//! ```text
//! Subscribed --pattern message (own channel)----> Subscribed  (echo dropped)
//! Subscribed --pattern message (undecodable)-----> Subscribed  (logged)
//! Subscribed --pattern message (foreign)---------> Subscribed  (local delivery)
//! Subscribed --message---------------------------> Subscribed  (logged)
//! Subscribed --subscription, count > 0-----------> Subscribed
//! Subscribed --subscription, count == 0----------> Terminated
//! Subscribed --error-----------------------------> Terminated
//! ```

use crate::coordinator::{BroadcastCoordinator, Origin};
use crate::envelope::BroadcastEnvelope;
use crate::node::{is_self_echo, NodeId};
use crate::stats::StatsCollector;
use crate::transport::{EventStream, PubSubEvent};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why the relay stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayExit {
    /// Subscription count dropped to zero
    Unsubscribed,
    /// Transport reported an error
    TransportError(String),
    /// Event stream ended without a terminal event
    StreamClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    Subscribed,
    /// Final; the relay never reconnects on its own
    Terminated(RelayExit),
}

pub struct RemoteMessageRelay {
    node_id: NodeId,
    coordinator: Arc<BroadcastCoordinator>,
    stats: StatsCollector,
}

impl RemoteMessageRelay {
    pub fn new(
        node_id: NodeId,
        coordinator: Arc<BroadcastCoordinator>,
        stats: StatsCollector,
    ) -> Self {
        Self {
            node_id,
            coordinator,
            stats,
        }
    }

    /// Apply one subscription event while `Subscribed`
    pub async fn handle(&self, event: PubSubEvent) -> RelayState {
        match event {
            PubSubEvent::PatternMessage {
                channel, payload, ..
            } => {
                self.on_pattern_message(&channel, &payload).await;
                RelayState::Subscribed
            }
            PubSubEvent::Message { channel, payload } => {
                info!(
                    channel = %channel,
                    payload_len = payload.len(),
                    "Message on subscription connection"
                );
                RelayState::Subscribed
            }
            PubSubEvent::Subscription {
                kind,
                channel,
                count,
            } => {
                info!(kind = %kind, channel = %channel, count = count, "Subscription status");
                if count == 0 {
                    RelayState::Terminated(RelayExit::Unsubscribed)
                } else {
                    RelayState::Subscribed
                }
            }
            PubSubEvent::Error(e) => {
                error!(error = %e, "Subscription transport error");
                RelayState::Terminated(RelayExit::TransportError(e))
            }
        }
    }

    async fn on_pattern_message(&self, channel: &str, payload: &[u8]) {
        if is_self_echo(channel, &self.node_id) {
            self.stats.record_echo();
            debug!(channel = %channel, "Ignoring own broadcast");
            return;
        }

        let envelope = match BroadcastEnvelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.record_decode_error();
                warn!(
                    error = %e,
                    channel = %channel,
                    payload_len = payload.len(),
                    "Dropping undecodable broadcast envelope"
                );
                return;
            }
        };

        self.stats.record_relayed();

        let BroadcastEnvelope {
            args,
            opts: (room, event),
        } = envelope;

        let report = self
            .coordinator
            .broadcast(None, &room, &event, args, Origin::Remote)
            .await;

        debug!(
            channel = %channel,
            room = %room,
            event = %event,
            delivered = report.delivered,
            "Relayed remote broadcast"
        );
    }

    /// Drive the relay until a terminal event or the end of the stream
    pub async fn run(self, mut events: EventStream) -> RelayExit {
        info!(node_id = %self.node_id, "Remote message relay started");

        loop {
            let Some(event) = events.next().await else {
                warn!(node_id = %self.node_id, "Subscription stream ended");
                return RelayExit::StreamClosed;
            };

            if let RelayState::Terminated(exit) = self.handle(event).await {
                warn!(node_id = %self.node_id, reason = ?exit, "Remote message relay terminated");
                return exit;
            }
        }
    }

    pub fn spawn(self, events: EventStream) -> JoinHandle<RelayExit> {
        tokio::spawn(self.run(events))
    }
}
