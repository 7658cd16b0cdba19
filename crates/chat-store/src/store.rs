//! The chat store - owner of the message log.
//!
//! The store coordinates committed state, derived reads, and notifications.
//!
//! # Write Path (strict order)
//!
//! 1. Apply the mutation under the write lock and advance the generation
//! 2. Queue the committed change in the batcher
//! 3. Request a tick (first change of a batch) or flush inline (batching off)
//!
//! Reads always see the last committed mutation. Only the notification is
//! deferred, never the data.
//!
//! # Lookups
//!
//! A lookup miss is a normal state while a response streams in, so `get`
//! returns `Option` rather than an error.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::batch::{ImmediateScheduler, TickScheduler, UpdateBatcher};
use crate::config::StoreConfig;
use crate::data_part::{DataPart, DataPartCursor, IngestOutcome};
use crate::index::MessageIndex;
use crate::live::{Notification, NotificationHub, Subscription};
use crate::selector::{SelectOptions, SelectorCache, SelectorStats};
use crate::types::{Message, MessageId, StoreChange, StoreStatus, TransportDelta};
use crate::view::{StoreState, StoreView};
use crate::{StoreError, StoreResult};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was new; the message was appended at `index`.
    Inserted { index: usize },
    /// The id was known; the message was replaced in place.
    Updated { index: usize },
    /// The id was known and the content identical; nothing was committed.
    Unchanged { index: usize },
}

impl UpsertOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Inserted { index } | Self::Updated { index } | Self::Unchanged { index } => {
                *index
            }
        }
    }
}

/// What a hydration call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// The snapshot replaced the committed messages.
    Applied { count: usize },
    /// The committed messages were kept.
    Preserved { count: usize },
}

/// The chat store.
///
/// Always handled through an `Arc`: scheduled ticks hold a weak reference
/// back to the store so they can flush once the tick fires.
pub struct ChatStore {
    state: RwLock<StoreState>,
    initial: RwLock<Vec<Message>>,
    batcher: UpdateBatcher<StoreChange>,
    hub: NotificationHub,
    selectors: Mutex<SelectorCache>,
    scheduler: Arc<dyn TickScheduler>,
    config: StoreConfig,
    this: Weak<ChatStore>,
}

impl ChatStore {
    /// Creates an empty store.
    pub fn new(config: StoreConfig, scheduler: Arc<dyn TickScheduler>) -> Arc<Self> {
        Self::with_initial(config, scheduler, Vec::new())
    }

    /// Creates an empty store whose ticks run inline.
    ///
    /// Useful for testing.
    pub fn immediate(config: StoreConfig) -> Arc<Self> {
        Self::new(config, Arc::new(ImmediateScheduler))
    }

    /// Creates a store seeded with `initial`, which `reset(None)` restores.
    pub fn with_initial(
        config: StoreConfig,
        scheduler: Arc<dyn TickScheduler>,
        initial: Vec<Message>,
    ) -> Arc<Self> {
        let (messages, index) = build_sequence(initial.clone());
        let state = StoreState {
            messages,
            index,
            ..StoreState::default()
        };
        let selectors = SelectorCache::new(config.selector);

        Arc::new_cyclic(|this| Self {
            state: RwLock::new(state),
            initial: RwLock::new(initial),
            batcher: UpdateBatcher::new(),
            hub: NotificationHub::new(),
            selectors: Mutex::new(selectors),
            scheduler,
            config,
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Inserts the message if its id is unknown, else replaces it in place.
    pub fn upsert(&self, message: Message) -> UpsertOutcome {
        let (outcome, change) = {
            let mut state = self.state.write();
            match state.index.get(&message.id) {
                Some(index) if state.messages[index].same_content(&message) => {
                    return UpsertOutcome::Unchanged { index };
                }
                Some(index) => {
                    let id = message.id.clone();
                    state.messages[index] = Arc::new(message);
                    state.generation += 1;
                    (
                        UpsertOutcome::Updated { index },
                        StoreChange::Updated { id, index },
                    )
                }
                None => {
                    let index = state.messages.len();
                    let id = message.id.clone();
                    state.index.insert(id.clone(), index);
                    state.messages.push(Arc::new(message));
                    state.generation += 1;
                    (
                        UpsertOutcome::Inserted { index },
                        StoreChange::Inserted { id, index },
                    )
                }
            }
        };
        self.enqueue(change);
        outcome
    }

    /// Edits a message in place. The identifier cannot be changed.
    ///
    /// Returns false if the id is unknown.
    pub fn edit(&self, id: &MessageId, f: impl FnOnce(&mut Message)) -> bool {
        let change = {
            let mut state = self.state.write();
            let Some(index) = state.index.get(id) else {
                return false;
            };
            let message = Arc::make_mut(&mut state.messages[index]);
            f(message);
            if &message.id != id {
                warn!(message_id = %id, attempted = %message.id, "chat-store: edit tried to change a message id");
                message.id = id.clone();
            }
            state.generation += 1;
            StoreChange::Updated {
                id: id.clone(),
                index,
            }
        };
        self.enqueue(change);
        true
    }

    /// Appends streamed text to a message's trailing text part.
    pub fn append_text(&self, id: &MessageId, delta: &str) -> bool {
        self.edit(id, |message| message.push_text(delta))
    }

    /// Removes a message, shifting later messages up by one.
    pub fn remove(&self, id: &MessageId) -> Option<Message> {
        let (removed, change) = {
            let mut state = self.state.write();
            let index = state.index.get(id)?;
            let removed = state.messages.remove(index);
            let StoreState {
                messages,
                index: positions,
                ..
            } = &mut *state;
            positions.remove(id, index, messages[index..].iter().map(|m| &m.id));
            state.generation += 1;
            (
                removed,
                StoreChange::Removed {
                    id: id.clone(),
                    index,
                },
            )
        };
        self.enqueue(change);
        Some(Arc::unwrap_or_clone(removed))
    }

    /// Moves a message to `to` (clamped to the last slot).
    pub fn move_to(&self, id: &MessageId, to: usize) -> StoreResult<usize> {
        let (to, change) = {
            let mut state = self.state.write();
            let from = state
                .index
                .get(id)
                .ok_or_else(|| StoreError::MessageNotFound(id.clone()))?;
            let to = to.min(state.messages.len() - 1);
            if from == to {
                return Ok(to);
            }
            let message = state.messages.remove(from);
            state.messages.insert(to, message);

            let (low, high) = (from.min(to), from.max(to));
            let StoreState {
                messages,
                index: positions,
                ..
            } = &mut *state;
            positions.renumber(low, messages[low..=high].iter().map(|m| &m.id));
            state.generation += 1;
            (
                to,
                StoreChange::Moved {
                    id: id.clone(),
                    from,
                    to,
                },
            )
        };
        self.enqueue(change);
        Ok(to)
    }

    /// Replaces the whole sequence and rebuilds the index in one commit.
    pub fn replace_all(&self, messages: Vec<Message>) {
        let count = {
            let mut state = self.state.write();
            let (messages, index) = build_sequence(messages);
            state.messages = messages;
            state.index = index;
            state.generation += 1;
            state.messages.len()
        };
        self.enqueue(StoreChange::Replaced { count });
    }

    /// Restores an initial snapshot: `initial` if given (it becomes the new
    /// reset target), else the snapshot the store was created with.
    ///
    /// Status, error, data parts and cached selectors are cleared too.
    pub fn reset(&self, initial: Option<Vec<Message>>) {
        let snapshot = match initial {
            Some(initial) => {
                *self.initial.write() = initial.clone();
                initial
            }
            None => self.initial.read().clone(),
        };

        let count = {
            let mut state = self.state.write();
            let (messages, index) = build_sequence(snapshot);
            state.messages = messages;
            state.index = index;
            state.status = StoreStatus::Idle;
            state.error = None;
            state.data_parts.reset();
            state.generation += 1;
            state.messages.len()
        };
        self.selectors.lock().clear();

        info!(count, "chat-store: reset");
        self.enqueue(StoreChange::Replaced { count });
    }

    /// Loads a snapshot (for example one rendered elsewhere) unless the
    /// hydration policy says to keep what is already committed.
    pub fn hydrate(&self, snapshot: Vec<Message>) -> HydrateOutcome {
        let policy = self.config.hydration;
        let current = self.count();

        let preserve = current > 0
            && ((snapshot.is_empty() && policy.preserve_on_empty)
                || (!snapshot.is_empty() && snapshot.len() < current && policy.preserve_on_shorter));

        if preserve {
            info!(
                current,
                incoming = snapshot.len(),
                "chat-store: hydration kept existing messages"
            );
            return HydrateOutcome::Preserved { count: current };
        }

        let count = snapshot.len();
        self.replace_all(snapshot);
        info!(count, "chat-store: hydrated");
        HydrateOutcome::Applied { count }
    }

    /// Records a status transition from the transport.
    ///
    /// Any status other than `Error` clears the last error.
    pub fn set_status(&self, status: StoreStatus) {
        {
            let mut state = self.state.write();
            if state.status == status {
                return;
            }
            state.status = status;
            if status != StoreStatus::Error {
                state.error = None;
            }
            state.generation += 1;
        }
        self.enqueue(StoreChange::StatusChanged { status });
    }

    /// Marks the store failed. Messages stay readable.
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "chat-store: transport reported failure");
        {
            let mut state = self.state.write();
            state.status = StoreStatus::Error;
            state.error = Some(reason);
            state.generation += 1;
        }
        self.enqueue(StoreChange::StatusChanged {
            status: StoreStatus::Error,
        });
    }

    /// Ingests an out-of-band data part.
    pub fn ingest_data_part(&self, part: DataPart) -> IngestOutcome {
        let data_type = part.data_type.clone();
        let sequence = part.sequence;
        let outcome = {
            let mut state = self.state.write();
            let outcome = state.data_parts.ingest(part);
            state.generation += 1;
            outcome
        };
        if let IngestOutcome::Stale { latest_sequence } = outcome {
            warn!(
                data_type = %data_type,
                sequence,
                latest_sequence,
                "chat-store: stale data part kept in history only"
            );
        }
        self.enqueue(StoreChange::DataPartIngested {
            data_type,
            sequence,
        });
        outcome
    }

    /// Clears the latest entry for a data part type.
    pub fn clear_data_part(&self, data_type: &str) -> Option<DataPart> {
        let removed = {
            let mut state = self.state.write();
            let removed = state.data_parts.clear(data_type)?;
            state.generation += 1;
            removed
        };
        self.enqueue(StoreChange::DataPartCleared {
            data_type: data_type.to_string(),
        });
        Some(removed)
    }

    /// Applies one delta from the transport feed.
    pub fn apply(&self, delta: TransportDelta) {
        match delta {
            TransportDelta::Upsert(message) => {
                self.upsert(message);
            }
            TransportDelta::Status(status) => self.set_status(status),
            TransportDelta::Failed(reason) => self.fail(reason),
            TransportDelta::DataPart(part) => {
                self.ingest_data_part(part);
            }
        }
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    fn enqueue(&self, change: StoreChange) {
        debug!(change = ?change, "chat-store: committed");
        let first_of_batch = self.batcher.schedule(change);

        if !self.config.batching {
            self.flush();
        } else if first_of_batch {
            let this = self.this.clone();
            self.scheduler.schedule(Box::new(move || {
                if let Some(store) = this.upgrade() {
                    store.flush();
                }
            }));
        }
    }

    /// Publishes every queued change as one notification.
    ///
    /// Returns the number of changes delivered.
    pub fn flush(&self) -> usize {
        let mut generation = 0;
        let delivered = self.batcher.flush(|changes| {
            generation = self.state.read().generation;
            debug!(generation, changes = changes.len(), "chat-store: notifying");
            self.hub.publish(Notification {
                generation,
                changes,
            });
        });
        if delivered > 0 {
            let evicted = self.selectors.lock().evict_idle(generation);
            if evicted > 0 {
                debug!(evicted, generation, "chat-store: evicted idle selectors");
            }
        }
        delivered
    }

    /// Flushes anything still queued so the current state counts as settled.
    pub fn settle(&self) -> usize {
        self.flush()
    }

    /// Number of changes waiting for the next notification.
    pub fn pending_changes(&self) -> usize {
        self.batcher.pending()
    }

    /// Subscribes to notifications published after this call.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Runs `f` against one consistent view of committed state.
    ///
    /// `f` must not call back into the store's write path.
    pub fn read<R>(&self, f: impl FnOnce(StoreView<'_>) -> R) -> R {
        let state = self.state.read();
        f(StoreView::new(&state))
    }

    /// Looks up a message by id in constant time.
    ///
    /// `None` is the normal answer for an id that has not streamed in yet.
    pub fn get(&self, id: &MessageId) -> Option<Arc<Message>> {
        self.read(|view| view.get(id).cloned())
    }

    /// Current slot of `id` in display order.
    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.state.read().index.get(id)
    }

    /// Whether a message with this id is committed.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.state.read().index.contains(id)
    }

    /// Number of committed messages. Equals the number of distinct ids.
    pub fn count(&self) -> usize {
        self.state.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Message ids in display order.
    pub fn ids(&self) -> Vec<MessageId> {
        self.read(|view| view.ids().cloned().collect())
    }

    /// Every message in display order. The `Arc`s are shared with the store,
    /// so this copies pointers, not content.
    pub fn messages(&self) -> Vec<Arc<Message>> {
        self.read(|view| view.messages().to_vec())
    }

    /// Messages in `[start, end)`, clamped. Cost is proportional to the range.
    pub fn slice(&self, start: usize, end: usize) -> Vec<Arc<Message>> {
        self.read(|view| view.slice(start, end).to_vec())
    }

    /// Ids in `[start, end)`, clamped.
    pub fn slice_ids(&self, start: usize, end: usize) -> Vec<MessageId> {
        self.read(|view| {
            view.slice(start, end)
                .iter()
                .map(|message| message.id.clone())
                .collect()
        })
    }

    /// The most recent message, usually the one being streamed.
    pub fn last(&self) -> Option<Arc<Message>> {
        self.read(|view| view.last().cloned())
    }

    /// Transport status as last reported through `set_status` or `fail`.
    pub fn status(&self) -> StoreStatus {
        self.state.read().status
    }

    /// Reason recorded by the last `fail`, cleared by any non-error status.
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// Advances by one on every committed mutation.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Latest part of `data_type`, decided by sequence number.
    pub fn data_part(&self, data_type: &str) -> Option<DataPart> {
        self.read(|view| view.data_part(data_type).cloned())
    }

    /// Latest part of every type, ordered by type.
    pub fn latest_data_parts(&self) -> Vec<DataPart> {
        self.read(|view| view.data_parts().latest_all().into_iter().cloned().collect())
    }

    /// The chronological data part log.
    pub fn data_parts(&self) -> Vec<DataPart> {
        self.read(|view| view.data_parts().all().to_vec())
    }

    /// Data parts that arrived after `cursor`.
    pub fn data_parts_since(&self, cursor: DataPartCursor) -> (Vec<DataPart>, DataPartCursor) {
        self.read(|view| {
            let (parts, next) = view.data_parts().since(cursor);
            (parts.to_vec(), next)
        })
    }

    // ========================================================================
    // Selectors
    // ========================================================================

    /// Memoized derivation keyed by `key` and guarded by `deps`.
    ///
    /// With unchanged deps the cached `Arc` is returned and `derive` is not
    /// called, even if the store changed in between; use
    /// [`ChatStore::select_tracked`] to follow store data as well.
    pub fn select<T, E>(
        &self,
        key: &str,
        deps: &[Value],
        options: SelectOptions,
        derive: impl FnOnce(StoreView<'_>) -> Result<T, E>,
    ) -> Result<Arc<T>, E>
    where
        T: PartialEq + Send + Sync + 'static,
    {
        let generation = self.generation();
        if let Some(cached) = self.selectors.lock().lookup::<T>(key, deps, generation) {
            return Ok(cached);
        }

        let (value, generation) = {
            let state = self.state.read();
            (derive(StoreView::new(&state))?, state.generation)
        };
        Ok(self
            .selectors
            .lock()
            .store(key, deps, generation, options, value))
    }

    /// Like [`ChatStore::select`], with the store generation folded into the
    /// fingerprint so any committed mutation triggers a re-derivation.
    pub fn select_tracked<T, E>(
        &self,
        key: &str,
        deps: &[Value],
        options: SelectOptions,
        derive: impl FnOnce(StoreView<'_>) -> Result<T, E>,
    ) -> Result<Arc<T>, E>
    where
        T: PartialEq + Send + Sync + 'static,
    {
        let mut fingerprint = deps.to_vec();
        fingerprint.push(Value::from(self.generation()));
        self.select(key, &fingerprint, options, derive)
    }

    /// Drops the cached value for `key`; the next `select` re-derives.
    pub fn invalidate_selector(&self, key: &str) -> bool {
        self.selectors.lock().invalidate(key)
    }

    /// Number of cached selector entries.
    pub fn selector_count(&self) -> usize {
        self.selectors.lock().len()
    }

    /// Selector hit, miss and eviction counters.
    pub fn selector_stats(&self) -> SelectorStats {
        self.selectors.lock().stats()
    }
}

impl std::fmt::Debug for ChatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ChatStore")
            .field("messages", &state.messages.len())
            .field("generation", &state.generation)
            .field("status", &state.status)
            .field("pending_changes", &self.batcher.pending())
            .field("config", &self.config)
            .finish()
    }
}

/// Builds a sequence and its index. A repeated id updates the earlier slot.
fn build_sequence(messages: Vec<Message>) -> (Vec<Arc<Message>>, MessageIndex) {
    let mut sequence: Vec<Arc<Message>> = Vec::with_capacity(messages.len());
    let mut index = MessageIndex::new();
    for message in messages {
        match index.get(&message.id) {
            Some(position) => sequence[position] = Arc::new(message),
            None => {
                index.insert(message.id.clone(), sequence.len());
                sequence.push(Arc::new(message));
            }
        }
    }
    (sequence, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn store() -> Arc<ChatStore> {
        ChatStore::immediate(StoreConfig::default())
    }

    #[test]
    fn upsert_inserts_then_updates_in_place() {
        let store = store();
        assert_eq!(
            store.upsert(Message::user("u1", "hi")),
            UpsertOutcome::Inserted { index: 0 }
        );
        assert_eq!(
            store.upsert(Message::assistant("a1", "he")),
            UpsertOutcome::Inserted { index: 1 }
        );
        assert_eq!(
            store.upsert(Message::assistant("a1", "hello")),
            UpsertOutcome::Updated { index: 1 }
        );

        assert_eq!(store.count(), 2);
        assert_eq!(store.get(&"a1".into()).unwrap().text(), "hello");
        assert_eq!(store.ids(), vec![MessageId::from("u1"), MessageId::from("a1")]);
    }

    #[test]
    fn identical_upsert_is_a_no_op() {
        let store = store();
        let message = Message::user("u1", "hi");
        store.upsert(message.clone());
        let generation = store.generation();

        assert_eq!(store.upsert(message), UpsertOutcome::Unchanged { index: 0 });
        assert_eq!(store.generation(), generation);
        assert_eq!(store.position(&"u1".into()), Some(0));
    }

    #[test]
    fn get_unknown_id_is_none() {
        let store = store();
        assert!(store.get(&"nope".into()).is_none());
    }

    #[test]
    fn edit_cannot_change_identifier() {
        let store = store();
        store.upsert(Message::assistant("a1", "x"));
        assert!(store.edit(&"a1".into(), |message| {
            message.id = MessageId::from("hijacked");
            message.role = Role::System;
        }));

        let message = store.get(&"a1".into()).unwrap();
        assert_eq!(message.role, Role::System);
        assert!(store.get(&"hijacked".into()).is_none());
        assert!(!store.edit(&"missing".into(), |_| {}));
    }

    #[test]
    fn append_text_streams_into_message() {
        let store = store();
        store.upsert(Message::assistant("a1", ""));
        for token in ["Hel", "lo", ", ", "world"] {
            assert!(store.append_text(&"a1".into(), token));
        }
        assert_eq!(store.get(&"a1".into()).unwrap().text(), "Hello, world");
    }

    #[test]
    fn remove_reindexes_following_messages() {
        let store = store();
        for id in ["a", "b", "c", "d"] {
            store.upsert(Message::user(id, id));
        }
        let removed = store.remove(&"b".into()).unwrap();
        assert_eq!(removed.id, MessageId::from("b"));
        assert!(store.remove(&"b".into()).is_none());

        assert_eq!(store.count(), 3);
        assert_eq!(store.position(&"a".into()), Some(0));
        assert_eq!(store.position(&"c".into()), Some(1));
        assert_eq!(store.position(&"d".into()), Some(2));
    }

    #[test]
    fn move_to_reorders_and_reindexes() {
        let store = store();
        for id in ["a", "b", "c", "d"] {
            store.upsert(Message::user(id, id));
        }
        assert_eq!(store.move_to(&"d".into(), 1).unwrap(), 1);
        let ids: Vec<_> = store.ids().into_iter().map(|id| id.0).collect();
        assert_eq!(ids, vec!["a", "d", "b", "c"]);
        for (position, id) in store.ids().iter().enumerate() {
            assert_eq!(store.position(id), Some(position));
        }

        assert_eq!(store.move_to(&"a".into(), 99).unwrap(), 3);
        assert!(matches!(
            store.move_to(&"zz".into(), 0),
            Err(StoreError::MessageNotFound(_))
        ));
    }

    #[test]
    fn replace_all_rebuilds_index() {
        let store = store();
        store.upsert(Message::user("old", "x"));
        store.replace_all(vec![Message::user("n1", "a"), Message::user("n2", "b")]);

        assert!(store.get(&"old".into()).is_none());
        assert_eq!(store.position(&"n2".into()), Some(1));
    }

    #[test]
    fn replace_all_collapses_duplicate_ids() {
        let store = store();
        store.replace_all(vec![
            Message::user("a", "first"),
            Message::user("b", "b"),
            Message::user("a", "second"),
        ]);
        assert_eq!(store.count(), 2);
        assert_eq!(store.position(&"a".into()), Some(0));
        assert_eq!(store.get(&"a".into()).unwrap().text(), "second");
    }

    #[test]
    fn failure_keeps_messages_readable() {
        let store = store();
        store.upsert(Message::user("u1", "hi"));
        store.set_status(StoreStatus::Streaming);
        store.fail("connection reset");

        assert_eq!(store.status(), StoreStatus::Error);
        assert_eq!(store.error().as_deref(), Some("connection reset"));
        assert_eq!(store.count(), 1);

        store.set_status(StoreStatus::Submitted);
        assert!(store.error().is_none());
    }

    #[test]
    fn apply_routes_transport_deltas() {
        let store = store();
        store.apply(TransportDelta::Status(StoreStatus::Submitted));
        store.apply(TransportDelta::Upsert(Message::assistant("a1", "x")));
        store.apply(TransportDelta::DataPart(DataPart::new(
            "data-status",
            1,
            serde_json::json!({"step": 1}),
        )));
        store.apply(TransportDelta::Status(StoreStatus::Ready));

        assert_eq!(store.status(), StoreStatus::Ready);
        assert_eq!(store.count(), 1);
        assert_eq!(store.data_part("data-status").unwrap().sequence, 1);
    }

    #[test]
    fn reset_restores_construction_snapshot() {
        let store = ChatStore::with_initial(
            StoreConfig::default(),
            Arc::new(ImmediateScheduler),
            vec![Message::system("s", "be nice")],
        );
        store.upsert(Message::user("u1", "hi"));
        store.ingest_data_part(DataPart::new("data-x", 1, serde_json::json!(1)));
        store.fail("boom");

        store.reset(None);
        assert_eq!(store.ids(), vec![MessageId::from("s")]);
        assert_eq!(store.status(), StoreStatus::Idle);
        assert!(store.error().is_none());
        assert!(store.data_parts().is_empty());

        store.reset(Some(vec![Message::user("x", "y")]));
        store.upsert(Message::user("z", "z"));
        store.reset(None);
        assert_eq!(store.ids(), vec![MessageId::from("x")]);
    }

    #[test]
    fn debug_does_not_dump_messages() {
        let store = store();
        store.upsert(Message::user("u1", "secret"));
        let rendered = format!("{:?}", store);
        assert!(rendered.contains("messages: 1"));
        assert!(!rendered.contains("secret"));
    }
}
