//! Data part tests.
//!
//! Properties covered:
//! - Latest-by-type is decided by sequence number, not arrival order
//! - History keeps every part in arrival order, stale ones included
//! - Clearing a type keeps history and the highest sequence seen
//! - Cursor readers only see new parts and restart after a reset

use serde_json::json;

use crate::{
    ChatStore, DataPart, DataPartCursor, DataPartWriter, IngestOutcome, StoreChange, StoreConfig,
};

#[test]
fn highest_sequence_wins_regardless_of_arrival() {
    let store = ChatStore::immediate(StoreConfig::default());
    for sequence in [3, 1, 2] {
        store.ingest_data_part(DataPart::new("data-status", sequence, json!({"seq": sequence})));
    }

    let latest = store.data_part("data-status").unwrap();
    assert_eq!(latest.sequence, 3);
    assert_eq!(latest.payload, json!({"seq": 3}));

    let arrival: Vec<u64> = store.data_parts().iter().map(|part| part.sequence).collect();
    assert_eq!(arrival, vec![3, 1, 2]);
}

#[test]
fn stale_part_is_reported() {
    let store = ChatStore::immediate(StoreConfig::default());
    store.ingest_data_part(DataPart::new("data-x", 5, json!(null)));
    let outcome = store.ingest_data_part(DataPart::new("data-x", 4, json!(null)));
    assert_eq!(outcome, IngestOutcome::Stale { latest_sequence: 5 });
}

#[test]
fn latest_of_all_types_is_sorted() {
    let store = ChatStore::immediate(StoreConfig::default());
    store.ingest_data_part(DataPart::new("data-zeta", 1, json!(1)));
    store.ingest_data_part(DataPart::new("data-alpha", 1, json!(2)));
    store.ingest_data_part(DataPart::new("data-alpha", 2, json!(3)));

    let latest: Vec<_> = store
        .latest_data_parts()
        .into_iter()
        .map(|part| (part.data_type, part.sequence))
        .collect();
    assert_eq!(
        latest,
        vec![("data-alpha".to_string(), 2), ("data-zeta".to_string(), 1)]
    );
}

#[test]
fn clear_keeps_history_and_notifies() {
    let store = ChatStore::immediate(StoreConfig::default());
    let updates = store.subscribe();
    store.ingest_data_part(DataPart::new("data-x", 1, json!(1)));

    assert!(store.clear_data_part("data-x").is_some());
    assert!(store.clear_data_part("data-x").is_none());
    assert!(store.data_part("data-x").is_none());
    assert_eq!(store.data_parts().len(), 1);

    let changes: Vec<StoreChange> = updates.drain().into_iter().flat_map(|n| n.changes).collect();
    assert_eq!(
        changes.last(),
        Some(&StoreChange::DataPartCleared {
            data_type: "data-x".into()
        })
    );
}

#[test]
fn cursor_reads_incrementally() {
    let store = ChatStore::immediate(StoreConfig::default());
    let writer = DataPartWriter::new(store.clone());

    writer.write("progress", json!(0.1));
    writer.write("progress", json!(0.2));
    let (parts, cursor) = store.data_parts_since(DataPartCursor::default());
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].data_type, "data-progress");

    let (sequence, outcome) = writer.write("progress", json!(0.3));
    assert_eq!(sequence, 3);
    assert!(outcome.is_latest());
    let (parts, cursor) = store.data_parts_since(cursor);
    assert_eq!(parts.len(), 1);

    store.reset(None);
    writer.write("progress", json!(1.0));
    let (parts, _) = store.data_parts_since(cursor);
    assert_eq!(parts.len(), 1, "reset starts a new epoch");
    assert_eq!(parts[0].sequence, 4);
}

#[test]
fn replay_after_clear_stays_stale() {
    let store = ChatStore::immediate(StoreConfig::default());
    store.ingest_data_part(DataPart::new("data-progress", 3, json!({"pct": 30})));
    store.clear_data_part("data-progress");

    let outcome = store.ingest_data_part(DataPart::new("data-progress", 1, json!({"pct": 10})));
    assert_eq!(outcome, IngestOutcome::Stale { latest_sequence: 3 });
    assert!(store.data_part("data-progress").is_none());
    assert_eq!(store.data_parts().len(), 2);
}
