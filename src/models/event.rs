use serde::{Deserialize, Serialize};

// ===== INBOUND EVENT MODELS =====

/// Message type as normalized by the ingestion boundary. Only `Text` events
/// reach the pipeline; everything else is dropped by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Text,
    Image,
    Voice,
    Event,
    Other,
}

impl EventKind {
    /// Map the platform's MsgType string to a kind, unknown types to `Other`.
    pub fn from_msg_type(msg_type: &str) -> Self {
        match msg_type {
            "text" => Self::Text,
            "image" => Self::Image,
            "voice" => Self::Voice,
            "event" => Self::Event,
            _ => Self::Other,
        }
    }
}

/// One normalized webhook event, already authenticated and parsed upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    pub actor_id: String,
    pub text: String,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn text(actor_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            text: text.into(),
            kind: EventKind::Text,
        }
    }
}

// ===== CONVERSATION MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of a conversation transcript, JSON-serialized into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}
