//! Local socket capability
//!
//! Sockets are owned by the surrounding transport layer; the room registry only
//! keeps shared handles to them for routing.

use crate::{Result, RoomsError};
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// A connected client that can receive events
pub trait Socket: Send + Sync {
    /// Stable id; exclusion and membership are matched on this, not on the handle
    fn id(&self) -> &str;

    /// Deliver `event` with `args` to the client
    fn emit(&self, event: &str, args: &[Value]) -> Result<()>;
}

/// Socket backed by an unbounded channel
///
/// Each emit is framed as the JSON text `[event, ...args]` and handed to the
/// receiver, which is typically drained by a WebSocket writer task.
#[derive(Clone)]
pub struct ChannelSocket {
    id: String,
    sender: UnboundedSender<String>,
}

impl ChannelSocket {
    pub fn new(id: impl Into<String>) -> (Self, UnboundedReceiver<String>) {
        let (sender, rx) = unbounded_channel();
        (
            Self {
                id: id.into(),
                sender,
            },
            rx,
        )
    }

    /// Socket with a random id
    pub fn random() -> (Self, UnboundedReceiver<String>) {
        Self::new(Uuid::new_v4().to_string())
    }
}

impl Socket for ChannelSocket {
    fn id(&self) -> &str {
        &self.id
    }

    fn emit(&self, event: &str, args: &[Value]) -> Result<()> {
        let mut frame = Vec::with_capacity(args.len() + 1);
        frame.push(Value::String(event.to_string()));
        frame.extend(args.iter().cloned());

        let text = serde_json::to_string(&frame)?;
        self.sender
            .send(text)
            .map_err(|_| RoomsError::SocketClosed(self.id.clone()))
    }
}

impl std::fmt::Debug for ChannelSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSocket")
            .field("id", &self.id)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emit_frames_event_and_args() {
        let (socket, mut rx) = ChannelSocket::new("s1");
        socket.emit("chat", &[json!("hi"), json!(2)]).unwrap();

        assert_eq!(rx.try_recv().unwrap(), r#"["chat","hi",2]"#);
    }

    #[test]
    fn test_emit_without_args() {
        let (socket, mut rx) = ChannelSocket::new("s1");
        socket.emit("ping", &[]).unwrap();

        assert_eq!(rx.try_recv().unwrap(), r#"["ping"]"#);
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (socket, rx) = ChannelSocket::new("gone");
        drop(rx);

        let err = socket.emit("ping", &[]).unwrap_err();
        assert!(matches!(err, RoomsError::SocketClosed(id) if id == "gone"));
    }

    #[test]
    fn test_random_ids_differ() {
        let (a, _rx_a) = ChannelSocket::random();
        let (b, _rx_b) = ChannelSocket::random();
        assert_ne!(a.id(), b.id());
    }
}
