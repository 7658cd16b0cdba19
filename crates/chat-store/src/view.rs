//! Borrowed, read-only view of committed store state.
//!
//! A view is only handed out while the store's read lock is held, so every
//! accessor on it observes one consistent generation.

use std::sync::Arc;

use crate::data_part::{DataPart, DataPartRegistry};
use crate::index::MessageIndex;
use crate::types::{Message, MessageId, StoreStatus};

/// Committed store state. Owned by [`crate::ChatStore`].
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) messages: Vec<Arc<Message>>,
    pub(crate) index: MessageIndex,
    pub(crate) status: StoreStatus,
    pub(crate) error: Option<String>,
    pub(crate) generation: u64,
    pub(crate) data_parts: DataPartRegistry,
}

/// Clamps `[start, end)` to `[0, len)`; an inverted range becomes empty.
pub fn clamp_range(start: usize, end: usize, len: usize) -> (usize, usize) {
    let end = end.min(len);
    let start = start.min(end);
    (start, end)
}

#[derive(Debug, Clone, Copy)]
pub struct StoreView<'a> {
    state: &'a StoreState,
}

impl<'a> StoreView<'a> {
    pub(crate) fn new(state: &'a StoreState) -> Self {
        Self { state }
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn len(&self) -> usize {
        self.state.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.messages.is_empty()
    }

    pub fn get(&self, id: &MessageId) -> Option<&'a Arc<Message>> {
        let position = self.state.index.get(id)?;
        self.state.messages.get(position)
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.state.index.get(id)
    }

    pub fn at(&self, position: usize) -> Option<&'a Arc<Message>> {
        self.state.messages.get(position)
    }

    pub fn messages(&self) -> &'a [Arc<Message>] {
        &self.state.messages
    }

    pub fn ids(&self) -> impl Iterator<Item = &'a MessageId> + 'a {
        self.state.messages.iter().map(|message| &message.id)
    }

    /// Messages in `[start, end)`, clamped to the committed sequence.
    pub fn slice(&self, start: usize, end: usize) -> &'a [Arc<Message>] {
        let (start, end) = clamp_range(start, end, self.state.messages.len());
        &self.state.messages[start..end]
    }

    pub fn last(&self) -> Option<&'a Arc<Message>> {
        self.state.messages.last()
    }

    pub fn status(&self) -> StoreStatus {
        self.state.status
    }

    pub fn error(&self) -> Option<&'a str> {
        self.state.error.as_deref()
    }

    pub fn data_part(&self, data_type: &str) -> Option<&'a DataPart> {
        self.state.data_parts.by_type(data_type)
    }

    pub fn data_parts(&self) -> &'a DataPartRegistry {
        &self.state.data_parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_range_handles_out_of_bounds() {
        assert_eq!(clamp_range(0, 10, 4), (0, 4));
        assert_eq!(clamp_range(2, 3, 4), (2, 3));
        assert_eq!(clamp_range(6, 9, 4), (4, 4));
        assert_eq!(clamp_range(3, 1, 4), (1, 1));
        assert_eq!(clamp_range(0, 0, 0), (0, 0));
    }

    #[test]
    fn empty_view() {
        let state = StoreState::default();
        let view = StoreView::new(&state);
        assert!(view.is_empty());
        assert_eq!(view.generation(), 0);
        assert!(view.get(&MessageId::from("missing")).is_none());
        assert!(view.slice(0, 10).is_empty());
    }
}
