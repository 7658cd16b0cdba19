//! Identifier → position index over the ordered message sequence.
//!
//! The index is kept bijective with the live sequence: after every committed
//! mutation each stored id maps to exactly the slot that holds it.
//! Single inserts and in-place updates touch one entry; removals and moves
//! renumber the shifted range; replace-all rebuilds the map wholesale.

use std::collections::HashMap;

use crate::types::MessageId;

#[derive(Debug, Default, Clone)]
pub struct MessageIndex {
    positions: HashMap<MessageId, usize>,
}

impl MessageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from an ordered sequence of ids.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a MessageId>) -> Self {
        let mut index = Self::new();
        index.rebuild(ids);
        index
    }

    /// Position of `id`, if it is indexed.
    pub fn get(&self, id: &MessageId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Whether `id` is indexed.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.positions.contains_key(id)
    }

    /// Number of indexed ids. Always equals the sequence length.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Records `id` at `position`. Used for appends, where no other slot moves.
    pub fn insert(&mut self, id: MessageId, position: usize) {
        self.positions.insert(id, position);
    }

    /// Drops `id` and shifts every later slot down by one.
    ///
    /// `ids_after` must be the ids that followed the removed slot, in order.
    pub fn remove<'a>(
        &mut self,
        id: &MessageId,
        removed_at: usize,
        ids_after: impl IntoIterator<Item = &'a MessageId>,
    ) {
        self.positions.remove(id);
        self.renumber(removed_at, ids_after);
    }

    /// Re-assigns consecutive positions starting at `start`.
    pub fn renumber<'a>(&mut self, start: usize, ids: impl IntoIterator<Item = &'a MessageId>) {
        for (offset, id) in ids.into_iter().enumerate() {
            self.positions.insert(id.clone(), start + offset);
        }
    }

    /// Replaces the whole index from an ordered sequence of ids.
    pub fn rebuild<'a>(&mut self, ids: impl IntoIterator<Item = &'a MessageId>) {
        self.positions.clear();
        for (position, id) in ids.into_iter().enumerate() {
            self.positions.insert(id.clone(), position);
        }
    }

    /// Forgets every id.
    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<MessageId> {
        raw.iter().map(|s| MessageId::from(*s)).collect()
    }

    #[test]
    fn rebuild_maps_every_id_to_its_slot() {
        let sequence = ids(&["a", "b", "c"]);
        let index = MessageIndex::from_ids(&sequence);
        assert_eq!(index.len(), 3);
        for (position, id) in sequence.iter().enumerate() {
            assert_eq!(index.get(id), Some(position));
        }
    }

    #[test]
    fn remove_shifts_later_positions() {
        let mut sequence = ids(&["a", "b", "c", "d"]);
        let mut index = MessageIndex::from_ids(&sequence);

        let removed = sequence.remove(1);
        index.remove(&removed, 1, &sequence[1..]);

        assert!(!index.contains(&removed));
        assert_eq!(index.get(&MessageId::from("a")), Some(0));
        assert_eq!(index.get(&MessageId::from("c")), Some(1));
        assert_eq!(index.get(&MessageId::from("d")), Some(2));
    }

    #[test]
    fn rebuild_drops_stale_entries() {
        let mut index = MessageIndex::from_ids(&ids(&["a", "b"]));
        index.rebuild(&ids(&["x"]));
        assert_eq!(index.len(), 1);
        assert!(index.get(&MessageId::from("a")).is_none());
        assert_eq!(index.get(&MessageId::from("x")), Some(0));
    }
}
