//! Core types for the chat store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::data_part::DataPart;

/// Unique, stable identifier for a message.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a message ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the message ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Author role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One ordered piece of message content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    ToolCall {
        call_id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        call_id: String,
        #[serde(default)]
        output: Value,
        #[serde(default)]
        is_error: bool,
    },
    Data {
        data_type: String,
        payload: Value,
    },
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A chat message.
///
/// The identifier never changes once the message exists in a store; the
/// parts are rewritten in place while the message streams.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message with no content parts.
    pub fn new(id: impl Into<MessageId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            parts: Vec::new(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a single-text-part user message.
    pub fn user(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self::new(id, Role::User).with_part(MessagePart::text(text))
    }

    /// Creates a single-text-part assistant message.
    pub fn assistant(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant).with_part(MessagePart::text(text))
    }

    /// Creates a single-text-part system message.
    pub fn system(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self::new(id, Role::System).with_part(MessagePart::text(text))
    }

    pub fn with_part(mut self, part: MessagePart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Concatenation of every text part, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Appends streamed text to the trailing text part, opening one if needed.
    pub fn push_text(&mut self, delta: &str) {
        match self.parts.last_mut() {
            Some(MessagePart::Text { text }) => text.push_str(delta),
            _ => self.parts.push(MessagePart::text(delta)),
        }
    }

    /// Compares everything except the creation timestamp.
    pub fn same_content(&self, other: &Message) -> bool {
        self.id == other.id
            && self.role == other.role
            && self.parts == other.parts
            && self.metadata == other.metadata
    }
}

/// Lifecycle status of the store as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    #[default]
    Idle,
    Submitted,
    Streaming,
    Ready,
    Error,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitted => "submitted",
            Self::Streaming => "streaming",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "submitted" => Self::Submitted,
            "streaming" => Self::Streaming,
            "ready" => Self::Ready,
            "error" => Self::Error,
            _ => Self::Idle,
        }
    }

    /// True while a request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitted | Self::Streaming)
    }
}

/// A committed change, queued for the next notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A new message was appended at `index`.
    Inserted { id: MessageId, index: usize },
    /// An existing message was rewritten in place.
    Updated { id: MessageId, index: usize },
    /// A message was removed.
    Removed { id: MessageId, index: usize },
    /// A message was moved between positions.
    Moved { id: MessageId, from: usize, to: usize },
    /// The whole sequence was replaced (replace-all, reset, hydration).
    Replaced { count: usize },
    /// The transport status changed.
    StatusChanged { status: StoreStatus },
    /// A data part was ingested.
    DataPartIngested { data_type: String, sequence: u64 },
    /// The latest entry of a data part type was cleared.
    DataPartCleared { data_type: String },
}

/// An inbound delta from the transport layer.
#[derive(Debug, Clone)]
pub enum TransportDelta {
    /// Insert or update a message.
    Upsert(Message),
    /// Status transition (submitted, streaming, ready).
    Status(StoreStatus),
    /// The transport reported a failure.
    Failed(String),
    /// An out-of-band data part.
    DataPart(DataPart),
}
