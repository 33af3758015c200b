//! Pub/sub transport
//!
//! Publishing goes through the [`Publisher`] trait; the receiving side is a
//! stream of [`PubSubEvent`]s. Publish and subscribe always use separate
//! connections so a long-lived receive never blocks a publish.

use crate::Result;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Msg};
use std::fmt;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Stream of events from a pattern subscription
pub type EventStream = BoxStream<'static, PubSubEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    Subscribe,
    Unsubscribe,
    PSubscribe,
    PUnsubscribe,
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionKind::Subscribe => write!(f, "subscribe"),
            SubscriptionKind::Unsubscribe => write!(f, "unsubscribe"),
            SubscriptionKind::PSubscribe => write!(f, "psubscribe"),
            SubscriptionKind::PUnsubscribe => write!(f, "punsubscribe"),
        }
    }
}

/// Event observed on a subscription connection
#[derive(Debug, Clone, PartialEq)]
pub enum PubSubEvent {
    /// Publish matched through a pattern subscription
    PatternMessage {
        pattern: String,
        channel: String,
        payload: Vec<u8>,
    },
    /// Publish on a directly subscribed channel
    Message { channel: String, payload: Vec<u8> },
    /// Subscription status change; `count` is the number of remaining subscriptions
    Subscription {
        kind: SubscriptionKind,
        channel: String,
        count: usize,
    },
    /// Connection-level failure
    Error(String),
}

/// Publishing half of the transport
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` on `channel`
    ///
    /// Returns number of subscribers that received the message
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize>;
}

/// Redis publisher on its own managed connection
#[derive(Clone)]
pub struct RedisPublisher {
    connection: ConnectionManager,
}

impl RedisPublisher {
    pub async fn connect(client: Client) -> Result<Self> {
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl Publisher for RedisPublisher {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize> {
        let mut conn = self.connection.clone();
        let receivers: usize = conn.publish(channel, payload).await?;
        Ok(receivers)
    }
}

/// Open a dedicated pub/sub connection and subscribe to `pattern`
///
/// The returned stream ends with an [`PubSubEvent::Error`] once the connection
/// closes.
pub async fn redis_subscribe(client: &Client, pattern: &str) -> Result<EventStream> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(pattern).await?;

    info!(pattern = %pattern, "Subscribed to room broadcasts");

    let closed = stream::once(async {
        PubSubEvent::Error("subscription connection closed".to_string())
    });

    Ok(pubsub
        .into_on_message()
        .map(|msg| event_from_msg(&msg))
        .chain(closed)
        .boxed())
}

fn event_from_msg(msg: &Msg) -> PubSubEvent {
    let channel = msg.get_channel_name().to_string();
    let payload = msg.get_payload_bytes().to_vec();

    if msg.from_pattern() {
        PubSubEvent::PatternMessage {
            pattern: msg.get_pattern::<String>().unwrap_or_default(),
            channel,
            payload,
        }
    } else {
        PubSubEvent::Message { channel, payload }
    }
}

/// In-process transport over a Tokio broadcast channel
///
/// Behaves like a single Redis server shared by every adapter built on a clone
/// of it. Supports exact channels and trailing-`*` patterns.
#[derive(Clone)]
pub struct MemoryPubSub {
    sender: broadcast::Sender<(String, Vec<u8>)>,
}

impl MemoryPubSub {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to `pattern`; the subscription is live before this returns
    pub fn subscribe_pattern(&self, pattern: &str) -> EventStream {
        let rx = self.sender.subscribe();
        let pattern = pattern.to_string();

        stream::unfold(rx, move |mut rx| {
            let pattern = pattern.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok((channel, payload)) => {
                            if pattern_matches(&pattern, &channel) {
                                let event = PubSubEvent::PatternMessage {
                                    pattern,
                                    channel,
                                    payload,
                                };
                                return Some((event, rx));
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "In-memory subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        })
        .boxed()
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Publisher for MemoryPubSub {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize> {
        // send only fails when nobody is subscribed
        Ok(self
            .sender
            .send((channel.to_string(), payload))
            .unwrap_or(0))
    }
}

fn pattern_matches(pattern: &str, channel: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => channel == pattern,
    }
}
