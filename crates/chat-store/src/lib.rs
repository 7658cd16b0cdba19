//! # Chat Store
//!
//! An in-memory message log for streaming chat clients. Mutations commit
//! immediately, notifications are batched, and reads are served from
//! memoized and windowed views.
//!
//! ## Non-negotiable Principles
//!
//! - **Reads see committed state** - No read waits for a notification tick
//! - **Ids are stable** - A message id never changes and never maps to two slots
//! - **Notifications reflect committed reality** - Published after the commit, in commit order
//! - **Derived values are cached, never authoritative** - Selectors can always be recomputed
//!
//! ## Architecture
//!
//! ```text
//! WRITE:
//!   mutation → index + generation → batcher → tick → notification
//!
//! READ:
//!   get / slice / select / window
//!
//! SIDE CHANNEL:
//!   data part → registry (latest by sequence + history)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chat_store::{ChatStore, Message, StoreConfig};
//!
//! let store = ChatStore::immediate(StoreConfig::unbatched());
//! let updates = store.subscribe();
//!
//! store.upsert(Message::user("u1", "Hello!"));
//! store.upsert(Message::assistant("a1", ""));
//! store.append_text(&"a1".into(), "Hi there");
//!
//! assert_eq!(store.count(), 2);
//! assert_eq!(store.get(&"a1".into()).unwrap().text(), "Hi there");
//! assert_eq!(updates.drain().len(), 3);
//! ```
//!
//! ## Crate Structure
//!
//! - [`store`] - The store core
//! - [`index`] - Id to position index
//! - [`batch`] - Notification batching and tick schedulers
//! - [`live`] - Subscriptions
//! - [`selector`] - Memoized derivations
//! - [`window`] - Virtualized windows
//! - [`data_part`] - Out-of-band data parts
//! - [`view`] - Borrowed read views
//! - [`types`] - Core types
//! - [`config`] - Configuration

pub mod batch;
pub mod config;
pub mod data_part;
pub mod index;
pub mod live;
pub mod selector;
pub mod store;
pub mod types;
pub mod view;
pub mod window;

#[cfg(test)]
mod tests;

pub use batch::{ImmediateScheduler, ManualScheduler, TickScheduler, TokioScheduler, UpdateBatcher};
pub use config::{HydrationPolicy, SelectorConfig, StoreConfig};
pub use data_part::{
    data_tag, DataPart, DataPartCursor, DataPartRegistry, DataPartWriter, IngestOutcome,
    DATA_PART_PREFIX,
};
pub use live::{Notification, Subscription};
pub use selector::{EqualityMode, SelectOptions, SelectorCache, SelectorStats};
pub use store::{ChatStore, HydrateOutcome, UpsertOutcome};
pub use types::{
    Message, MessageId, MessagePart, Role, StoreChange, StoreStatus, TransportDelta,
};
pub use view::StoreView;
pub use window::{VirtualWindow, WindowSlice};

/// Errors that can occur in the chat store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No message with this id is committed.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    Config(String),

    /// Config file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
