//! Node identity and channel naming
//!
//! Every node publishes on `<prefix>#<node-id>` and subscribes to `<prefix>#*`,
//! so it also receives its own publishes and must recognise them.

use std::fmt;
use uuid::Uuid;

pub const CHANNEL_SEPARATOR: char = '#';

/// Process-unique identifier, generated once at startup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Channel this node publishes on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelKey(String);

impl ChannelKey {
    pub fn new(prefix: &str, node_id: &NodeId) -> Self {
        Self(format!("{}{}{}", prefix, CHANNEL_SEPARATOR, node_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the wildcard pattern covering every node's channel
///
/// # Example
///
/// ```
/// use redis_rooms::node::subscription_pattern;
///
/// assert_eq!(subscription_pattern("socket.io"), "socket.io#*");
/// ```
pub fn subscription_pattern(prefix: &str) -> String {
    format!("{}{}*", prefix, CHANNEL_SEPARATOR)
}

/// Node id a channel belongs to: the text after the last separator
///
/// # Example
///
/// ```
/// use redis_rooms::node::origin_node;
///
/// assert_eq!(origin_node("socket.io#abc"), Some("abc"));
/// assert_eq!(origin_node("a#b#abc"), Some("abc"));
/// assert_eq!(origin_node("no-separator"), None);
/// ```
pub fn origin_node(channel: &str) -> Option<&str> {
    channel
        .rsplit_once(CHANNEL_SEPARATOR)
        .map(|(_, node)| node)
}

/// Whether `channel` carries messages this node published itself
pub fn is_self_echo(channel: &str, own: &NodeId) -> bool {
    origin_node(channel) == Some(own.as_str())
}
