use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventError;

pub const SYSTEM_CREATED: &str = "SYSTEM_CREATED";
pub const SYSTEM_REMOVED: &str = "SYSTEM_REMOVED";
pub const SYSTEM_UPDATED: &str = "SYSTEM_UPDATED";

/// Client-to-server message carrying a fresh access token.
pub const UPDATE_TOKEN: &str = "UPDATE_TOKEN";

/// A server-pushed event, `{ "name": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Parse a text frame from the socket.
    pub fn from_frame(text: &str) -> Result<Self, EventError> {
        serde_json::from_str(text).map_err(|e| EventError::Malformed(e.to_string()))
    }

    /// The `id` of the payload, as a string whether sent as string or number.
    pub fn payload_id(&self) -> Option<String> {
        match self.payload.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn update_token(token: Option<&str>) -> Self {
        Self::new(UPDATE_TOKEN, token.map(Value::from).unwrap_or(Value::Null))
    }

    pub fn is_system_event(&self) -> bool {
        matches!(self.name.as_str(), SYSTEM_CREATED | SYSTEM_REMOVED | SYSTEM_UPDATED)
    }
}
