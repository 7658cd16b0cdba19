//! Behavioural tests for the chat store.
//!
//! Test organization, by concern:
//!
//! - `indexing.rs`       - Upsert, lookup, identity and index consistency
//! - `batching.rs`       - Notification coalescing and scheduler behaviour
//! - `selectors.rs`      - Memoized derivations through the store
//! - `virtualization.rs` - Slices and virtual windows
//! - `data_parts.rs`     - Out-of-band data part ordering and history
//! - `hydration.rs`      - Reset and hydration policy
//! - `concurrency.rs`    - Shared readers and writers across threads

mod data_parts;
mod selectors;

use std::sync::Arc;

use crate::{ChatStore, Message, StoreConfig, StoreStatus, TransportDelta};

/// Builds a store with `n` user messages `m0..m{n-1}`.
pub(crate) fn seeded_store(n: usize) -> Arc<ChatStore> {
    let store = ChatStore::immediate(StoreConfig::default());
    for i in 0..n {
        store.upsert(Message::user(format!("m{i}"), format!("message {i}")));
    }
    store
}

/// A full streamed exchange driven through the transport surface.
#[test]
fn streamed_exchange_workflow() {
    let store = ChatStore::immediate(StoreConfig::default());
    let updates = store.subscribe();

    store.apply(TransportDelta::Upsert(Message::user("u1", "What is Rust?")));
    store.apply(TransportDelta::Status(StoreStatus::Submitted));
    store.apply(TransportDelta::Upsert(Message::assistant("a1", "")));
    store.apply(TransportDelta::Status(StoreStatus::Streaming));
    for token in ["A ", "systems ", "language."] {
        store.append_text(&"a1".into(), token);
    }
    store.apply(TransportDelta::Status(StoreStatus::Ready));

    assert_eq!(store.count(), 2);
    assert_eq!(store.status(), StoreStatus::Ready);
    assert_eq!(
        store.get(&"a1".into()).unwrap().text(),
        "A systems language."
    );

    let notifications = updates.drain();
    let last = notifications.last().unwrap();
    assert_eq!(last.generation, store.generation());
    let total: usize = notifications.iter().map(|n| n.changes.len()).sum();
    assert_eq!(total, 8);
}
