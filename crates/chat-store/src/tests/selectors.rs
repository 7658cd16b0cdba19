//! Selector tests through the store.
//!
//! Properties covered:
//! - Unchanged deps never re-run the derivation
//! - A deep-equal result under changed deps returns the previous reference
//! - A failing derivation propagates and leaves the cached value untouched
//! - Tracked selectors follow store generations
//! - Idle entries are evicted on flush without affecting results

use std::convert::Infallible;
use std::sync::Arc;

use serde_json::json;

use super::seeded_store;
use crate::{ChatStore, Message, Role, SelectOptions, SelectorConfig, StoreConfig};

fn user_count(store: &ChatStore, deps: &[serde_json::Value], runs: &mut usize) -> Arc<usize> {
    store
        .select("user-count", deps, SelectOptions::deep(), |view| {
            *runs += 1;
            Ok::<_, Infallible>(
                view.messages()
                    .iter()
                    .filter(|message| message.role == Role::User)
                    .count(),
            )
        })
        .unwrap()
}

#[test]
fn unchanged_deps_do_not_rederive() {
    let store = seeded_store(5);
    let mut runs = 0;
    let first = user_count(&store, &[json!("all")], &mut runs);
    let second = user_count(&store, &[json!("all")], &mut runs);

    assert_eq!(runs, 1);
    assert_eq!(*first, 5);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.selector_stats().hits, 1);
}

#[test]
fn deep_equal_result_keeps_reference() {
    let store = seeded_store(5);
    let mut runs = 0;
    let first = user_count(&store, &[json!(1)], &mut runs);

    // An assistant message does not change the user count.
    store.upsert(Message::assistant("a1", "reply"));
    let second = user_count(&store, &[json!(2)], &mut runs);

    assert_eq!(runs, 2);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn changed_result_replaces_reference() {
    let store = seeded_store(2);
    let mut runs = 0;
    let first = user_count(&store, &[json!(1)], &mut runs);
    store.upsert(Message::user("m9", "more"));
    let second = user_count(&store, &[json!(2)], &mut runs);

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*second, 3);
}

#[test]
fn failing_derivation_keeps_previous_value() {
    let store = seeded_store(2);
    let ok = store
        .select("titles", &[json!(1)], SelectOptions::default(), |view| {
            Ok::<_, String>(view.len())
        })
        .unwrap();

    let err = store
        .select::<usize, _>("titles", &[json!(2)], SelectOptions::default(), |_| {
            Err("derivation failed".to_string())
        })
        .unwrap_err();
    assert_eq!(err, "derivation failed");

    let again = store
        .select("titles", &[json!(1)], SelectOptions::default(), |_| {
            Ok::<_, String>(999)
        })
        .unwrap();
    assert!(Arc::ptr_eq(&ok, &again));
}

#[test]
fn tracked_selector_follows_generations() {
    let store = seeded_store(1);
    let count = |store: &ChatStore| {
        store
            .select_tracked("count", &[], SelectOptions::reference(), |view| {
                Ok::<_, Infallible>(view.len())
            })
            .unwrap()
    };

    assert_eq!(*count(&store), 1);
    store.upsert(Message::user("m1", "x"));
    assert_eq!(*count(&store), 2);

    let before = count(&store);
    let after = count(&store);
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn idle_selectors_are_evicted_on_flush() {
    let config = StoreConfig {
        selector: SelectorConfig {
            max_entries: 16,
            max_idle_generations: Some(2),
        },
        ..StoreConfig::default()
    };
    let store = ChatStore::immediate(config);
    store
        .select("once", &[], SelectOptions::default(), |view| {
            Ok::<_, Infallible>(view.len())
        })
        .unwrap();
    assert_eq!(store.selector_count(), 1);

    for i in 0..4 {
        store.upsert(Message::user(format!("m{i}"), "x"));
    }
    assert_eq!(store.selector_count(), 0);
    assert_eq!(store.selector_stats().evictions, 1);

    // Eviction only costs a recomputation.
    let value = store
        .select("once", &[], SelectOptions::default(), |view| {
            Ok::<_, Infallible>(view.len())
        })
        .unwrap();
    assert_eq!(*value, 4);
}

#[test]
fn invalidate_forces_rederivation() {
    let store = seeded_store(1);
    let mut runs = 0;
    user_count(&store, &[], &mut runs);
    assert!(store.invalidate_selector("user-count"));
    user_count(&store, &[], &mut runs);
    assert_eq!(runs, 2);
}

#[test]
fn reset_clears_selectors() {
    let store = seeded_store(3);
    let mut runs = 0;
    user_count(&store, &[], &mut runs);
    store.reset(None);
    assert_eq!(store.selector_count(), 0);
    assert_eq!(*user_count(&store, &[], &mut runs), 0);
}
