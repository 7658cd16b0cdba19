//! Out-of-band data parts riding alongside the message stream.
//!
//! The registry keeps two views of the same input:
//!
//! - a chronological, append-only history (arrival order), and
//! - the latest part per type, decided by sequence number rather than
//!   arrival order, so late deliveries never roll a type backwards.
//!
//! Clearing a type only forgets its latest entry; history is kept for replay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::ChatStore;

/// Tag prefix that marks a part as out-of-band rather than message content.
pub const DATA_PART_PREFIX: &str = "data-";

/// A tagged out-of-band delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPart {
    #[serde(rename = "type")]
    pub data_type: String,
    pub payload: Value,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl DataPart {
    pub fn new(data_type: impl Into<String>, sequence: u64, payload: Value) -> Self {
        Self {
            data_type: data_type.into(),
            payload,
            sequence,
            timestamp: Utc::now(),
        }
    }

    /// True when the tag carries the out-of-band prefix.
    pub fn is_out_of_band(&self) -> bool {
        self.data_type.starts_with(DATA_PART_PREFIX)
    }
}

/// Prefixes `data_type` with [`DATA_PART_PREFIX`] unless it already has it.
pub fn data_tag(data_type: &str) -> String {
    if data_type.starts_with(DATA_PART_PREFIX) {
        data_type.to_string()
    } else {
        format!("{DATA_PART_PREFIX}{data_type}")
    }
}

/// Result of ingesting a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The part is now the latest for its type.
    Latest,
    /// A part with an equal or higher sequence number was already seen for
    /// this type, even if that part has since been cleared. The part was
    /// recorded in history only.
    Stale { latest_sequence: u64 },
}

impl IngestOutcome {
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

/// Position in the chronological log, for incremental consumers.
///
/// The epoch changes whenever the registry is reset; a cursor from an older
/// epoch restarts from the beginning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataPartCursor {
    pub epoch: u64,
    pub offset: usize,
}

#[derive(Debug, Default, Clone)]
pub struct DataPartRegistry {
    latest: HashMap<String, DataPart>,
    /// Highest sequence number ever ingested per type. Survives `clear`.
    high_water: HashMap<String, u64>,
    history: Vec<DataPart>,
    epoch: u64,
}

impl DataPartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to history and promotes the part to latest-by-type when its
    /// sequence number beats every sequence seen for that type.
    pub fn ingest(&mut self, part: DataPart) -> IngestOutcome {
        let outcome = match self.high_water.get(&part.data_type) {
            Some(&highest) if highest >= part.sequence => IngestOutcome::Stale {
                latest_sequence: highest,
            },
            _ => IngestOutcome::Latest,
        };

        if outcome.is_latest() {
            self.high_water.insert(part.data_type.clone(), part.sequence);
            self.latest.insert(part.data_type.clone(), part.clone());
        }
        self.history.push(part);
        outcome
    }

    /// Highest sequence number ingested for `data_type`, cleared or not.
    pub fn highest_sequence(&self, data_type: &str) -> Option<u64> {
        self.high_water.get(data_type).copied()
    }

    /// Latest part of `data_type` in constant time.
    pub fn by_type(&self, data_type: &str) -> Option<&DataPart> {
        self.latest.get(data_type)
    }

    /// Latest part of every type, ordered by type tag.
    pub fn latest_all(&self) -> Vec<&DataPart> {
        let mut parts: Vec<_> = self.latest.values().collect();
        parts.sort_by(|a, b| a.data_type.cmp(&b.data_type));
        parts
    }

    /// The full chronological log.
    pub fn all(&self) -> &[DataPart] {
        &self.history
    }

    /// Forgets the latest entry for `data_type`. History and the type's
    /// highest sequence number are untouched, so a late replay of an older
    /// part stays stale.
    pub fn clear(&mut self, data_type: &str) -> Option<DataPart> {
        self.latest.remove(data_type)
    }

    /// Parts that arrived after `cursor`, plus the cursor to resume from.
    pub fn since(&self, cursor: DataPartCursor) -> (&[DataPart], DataPartCursor) {
        let start = if cursor.epoch == self.epoch && cursor.offset <= self.history.len() {
            cursor.offset
        } else {
            0
        };
        let next = DataPartCursor {
            epoch: self.epoch,
            offset: self.history.len(),
        };
        (&self.history[start..], next)
    }

    /// Drops latest, history and highest sequences, and starts a new epoch.
    pub fn reset(&mut self) {
        self.latest.clear();
        self.high_water.clear();
        self.history.clear();
        self.epoch += 1;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Producer-side handle that stamps parts with increasing sequence numbers
/// and pushes them into a store.
#[derive(Debug)]
pub struct DataPartWriter {
    store: Arc<ChatStore>,
    next_sequence: AtomicU64,
}

impl DataPartWriter {
    pub fn new(store: Arc<ChatStore>) -> Self {
        Self::starting_at(store, 1)
    }

    /// Starts numbering at `sequence`, e.g. when resuming a stream.
    pub fn starting_at(store: Arc<ChatStore>, sequence: u64) -> Self {
        Self {
            store,
            next_sequence: AtomicU64::new(sequence),
        }
    }

    /// Writes a part tagged `data-<data_type>` and returns its sequence number.
    pub fn write(&self, data_type: &str, payload: Value) -> (u64, IngestOutcome) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .store
            .ingest_data_part(DataPart::new(data_tag(data_type), sequence, payload));
        (sequence, outcome)
    }

    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn latest_follows_sequence_not_arrival() {
        let mut registry = DataPartRegistry::new();
        assert!(registry.ingest(DataPart::new("data-status", 3, json!("c"))).is_latest());
        assert_eq!(
            registry.ingest(DataPart::new("data-status", 1, json!("a"))),
            IngestOutcome::Stale { latest_sequence: 3 }
        );
        assert!(!registry.ingest(DataPart::new("data-status", 2, json!("b"))).is_latest());

        let latest = registry.by_type("data-status").unwrap();
        assert_eq!(latest.sequence, 3);
        assert_eq!(latest.payload, json!("c"));

        let arrival: Vec<_> = registry.all().iter().map(|p| p.sequence).collect();
        assert_eq!(arrival, vec![3, 1, 2]);
    }

    #[test]
    fn equal_sequence_does_not_replace_latest() {
        let mut registry = DataPartRegistry::new();
        registry.ingest(DataPart::new("data-x", 5, json!(1)));
        let outcome = registry.ingest(DataPart::new("data-x", 5, json!(2)));
        assert!(!outcome.is_latest());
        assert_eq!(registry.by_type("data-x").unwrap().payload, json!(1));
    }

    #[test]
    fn clear_keeps_history() {
        let mut registry = DataPartRegistry::new();
        registry.ingest(DataPart::new("data-a", 1, json!(null)));
        registry.ingest(DataPart::new("data-b", 1, json!(null)));

        let cleared = registry.clear("data-a").unwrap();
        assert_eq!(cleared.data_type, "data-a");
        assert!(registry.by_type("data-a").is_none());
        assert!(registry.by_type("data-b").is_some());
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.highest_sequence("data-a"), Some(1));
    }

    #[test]
    fn stale_replay_after_clear_is_rejected() {
        let mut registry = DataPartRegistry::new();
        registry.ingest(DataPart::new("data-status", 3, json!("c")));
        registry.clear("data-status");

        assert_eq!(
            registry.ingest(DataPart::new("data-status", 1, json!("a"))),
            IngestOutcome::Stale { latest_sequence: 3 }
        );
        assert!(registry.by_type("data-status").is_none());

        assert!(registry.ingest(DataPart::new("data-status", 4, json!("d"))).is_latest());
        assert_eq!(registry.by_type("data-status").unwrap().sequence, 4);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn reset_forgets_highest_sequences() {
        let mut registry = DataPartRegistry::new();
        registry.ingest(DataPart::new("data-a", 9, json!(null)));
        registry.reset();
        assert_eq!(registry.highest_sequence("data-a"), None);
        assert!(registry.ingest(DataPart::new("data-a", 1, json!(null))).is_latest());
    }

    #[test]
    fn latest_all_is_sorted_by_type() {
        let mut registry = DataPartRegistry::new();
        registry.ingest(DataPart::new("data-z", 1, json!(null)));
        registry.ingest(DataPart::new("data-a", 1, json!(null)));
        registry.ingest(DataPart::new("data-m", 1, json!(null)));
        let types: Vec<_> = registry.latest_all().iter().map(|p| p.data_type.as_str()).collect();
        assert_eq!(types, vec!["data-a", "data-m", "data-z"]);
    }

    #[test]
    fn cursor_reads_only_new_parts() {
        let mut registry = DataPartRegistry::new();
        registry.ingest(DataPart::new("data-a", 1, json!(1)));

        let (first, cursor) = registry.since(DataPartCursor::default());
        assert_eq!(first.len(), 1);

        registry.ingest(DataPart::new("data-a", 2, json!(2)));
        registry.ingest(DataPart::new("data-a", 3, json!(3)));
        let (second, cursor) = registry.since(cursor);
        assert_eq!(second.iter().map(|p| p.sequence).collect::<Vec<_>>(), vec![2, 3]);

        let (third, _) = registry.since(cursor);
        assert!(third.is_empty());
    }

    #[test]
    fn cursor_from_previous_epoch_restarts() {
        let mut registry = DataPartRegistry::new();
        registry.ingest(DataPart::new("data-a", 1, json!(1)));
        let (_, cursor) = registry.since(DataPartCursor::default());

        registry.reset();
        registry.ingest(DataPart::new("data-a", 1, json!("fresh")));

        let (parts, next) = registry.since(cursor);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].payload, json!("fresh"));
        assert_eq!(next.epoch, 1);
    }

    #[test]
    fn data_tag_adds_prefix_once() {
        assert_eq!(data_tag("weather"), "data-weather");
        assert_eq!(data_tag("data-weather"), "data-weather");
        assert!(DataPart::new(data_tag("x"), 1, json!(null)).is_out_of_band());
    }
}
