//! Wire payload mirrored between nodes
//!
//! ```text
//! {"args": [...], "opts": [room, event]}
//! ```

use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Broadcast mirrored onto the shared channel
///
/// `opts` is a fixed pair so that a payload with missing, extra or non-string
/// routing options fails to decode instead of routing to an empty room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub args: Vec<Value>,
    pub opts: (String, String),
}

impl BroadcastEnvelope {
    pub fn new(room: impl Into<String>, event: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            args,
            opts: (room.into(), event.into()),
        }
    }

    pub fn room(&self) -> &str {
        &self.opts.0
    }

    pub fn event(&self) -> &str {
        &self.opts.1
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

// Nodes that broadcast without arguments send `"args": null`
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}
