//! Union store integration tests
//!
//! These tests exercise the full overlay through its public surface:
//!
//! 1. **Validation protocol** - recorded condition pairs, batching, the
//!    empty fast path
//! 2. **Prefetching** - batched and ranged cache warming
//! 3. **Merged view** - read-your-own-writes, tombstones, iteration order
//! 4. **Options** - presume-not-exists, option lifecycle
//! 5. **Lifecycle** - release semantics, pool round-trips

use std::sync::Arc;

use unionkv_buffer::BufferPool;
use unionkv_core::{Error, Key, OptionValue, StoreOption, Value};
use unionkv_store::testing::MockSnapshot;
use unionkv_store::UnionStore;

// ============================================================================
// Test Helpers
// ============================================================================

fn key(s: &str) -> Key {
    Key::from(s)
}

fn value(s: &str) -> Value {
    s.as_bytes().to_vec()
}

/// Union store over a seeded mock backend, with handles to both and a
/// private pool so tests never couple through the global one.
fn setup(pairs: &[(&str, &[u8])]) -> (UnionStore, MockSnapshot, Arc<BufferPool>) {
    let mock = MockSnapshot::with_pairs(pairs);
    let pool = Arc::new(BufferPool::new(8));
    let store = UnionStore::with_pool(Box::new(mock.clone()), Arc::clone(&pool));
    (store, mock, pool)
}

// ============================================================================
// SECTION 1: Validation protocol
// ============================================================================

mod validation {
    use super::*;

    /// Zero recorded conditions must cost zero remote reads.
    #[test]
    fn test_empty_condition_fast_path() {
        let (mut store, mock, _pool) = setup(&[("k1", b"v1")]);

        store.check_lazy_condition_pairs().unwrap();

        assert_eq!(mock.remote_reads(), 0);
    }

    #[test]
    fn test_must_not_exist_violated_is_key_exists() {
        let (mut store, _mock, _pool) = setup(&[("u1", b"anything")]);

        store.record_condition(key("u1"), Value::new());
        let err = store.check_lazy_condition_pairs().unwrap_err();

        assert!(matches!(err, Error::KeyExists(k) if k == key("u1")));
    }

    /// A present key violates must-not-exist whatever its value - even an
    /// actually-empty stored value counts as existing.
    #[test]
    fn test_must_not_exist_violated_by_empty_stored_value() {
        let (mut store, _mock, _pool) = setup(&[("u1", b"")]);

        store.record_condition(key("u1"), Value::new());
        let err = store.check_lazy_condition_pairs().unwrap_err();

        assert!(matches!(err, Error::KeyExists(_)));
    }

    #[test]
    fn test_must_not_exist_satisfied() {
        let (mut store, _mock, _pool) = setup(&[("other", b"v")]);

        store.record_condition(key("u1"), Value::new());
        store.check_lazy_condition_pairs().unwrap();
    }

    #[test]
    fn test_value_match_succeeds() {
        let (mut store, _mock, _pool) = setup(&[("k1", b"v1")]);

        store.record_condition(key("k1"), value("v1"));
        store.check_lazy_condition_pairs().unwrap();
    }

    #[test]
    fn test_value_mismatch_fails() {
        let (mut store, _mock, _pool) = setup(&[("k1", b"v2")]);

        store.record_condition(key("k1"), value("v1"));
        let err = store.check_lazy_condition_pairs().unwrap_err();

        match err {
            Error::ConditionMismatch {
                key: k,
                expected,
                actual,
            } => {
                assert_eq!(k, key("k1"));
                assert_eq!(expected, value("v1"));
                assert_eq!(actual, Some(value("v2")));
            }
            other => panic!("expected ConditionMismatch, got {other:?}"),
        }
    }

    /// Absence of the key is also a mismatch when a value was expected.
    #[test]
    fn test_absent_key_with_expected_value_fails() {
        let (mut store, _mock, _pool) = setup(&[]);

        store.record_condition(key("k1"), value("v1"));
        let err = store.check_lazy_condition_pairs().unwrap_err();

        assert!(matches!(
            err,
            Error::ConditionMismatch { actual: None, .. }
        ));
    }

    /// N conditions, one round-trip, covering all N keys.
    #[test]
    fn test_single_batched_read_covers_all_conditions() {
        let (mut store, mock, _pool) = setup(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);

        store.record_condition(key("a"), value("1"));
        store.record_condition(key("b"), value("2"));
        store.record_condition(key("c"), value("3"));
        store.record_condition(key("d"), Value::new());
        store.check_lazy_condition_pairs().unwrap();

        assert_eq!(mock.batch_get_calls(), 1);
        assert_eq!(mock.get_calls(), 0);
        assert_eq!(
            mock.last_batch_keys(),
            vec![key("a"), key("b"), key("c"), key("d")]
        );
    }

    #[test]
    fn test_fails_fast_on_first_violation_in_key_order() {
        let (mut store, _mock, _pool) = setup(&[("a", b"changed"), ("b", b"present")]);

        // Both conditions are violated; "a" sorts first and must win.
        store.record_condition(key("b"), Value::new());
        store.record_condition(key("a"), value("original"));

        let err = store.check_lazy_condition_pairs().unwrap_err();
        assert!(matches!(err, Error::ConditionMismatch { key: k, .. } if k == key("a")));
    }

    /// The last recorded condition for a key replaces earlier ones.
    #[test]
    fn test_last_recorded_condition_wins() {
        let (mut store, _mock, _pool) = setup(&[("k1", b"v2")]);

        store.record_condition(key("k1"), value("v1"));
        store.record_condition(key("k1"), value("v2"));
        store.check_lazy_condition_pairs().unwrap();
    }

    #[test]
    fn test_check_is_repeatable_after_success() {
        let (mut store, mock, _pool) = setup(&[("k1", b"v1")]);

        store.record_condition(key("k1"), value("v1"));
        store.check_lazy_condition_pairs().unwrap();
        store.check_lazy_condition_pairs().unwrap();

        // The overlay cached the first fetch; the second check is free.
        assert_eq!(mock.batch_get_calls(), 1);
    }

    #[test]
    fn test_upstream_failure_is_wrapped_with_context() {
        let (mut store, mock, _pool) = setup(&[]);

        store.record_condition(key("k1"), value("v1"));
        mock.fail_next("backend down");
        let err = store.check_lazy_condition_pairs().unwrap_err();

        match err {
            Error::Upstream { op, .. } => assert_eq!(op, "check_lazy_condition_pairs"),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    /// Conditions recorded out of order are validated in ascending key
    /// order.
    #[test]
    fn test_condition_iteration_is_ascending() {
        let (mut store, mock, _pool) = setup(&[]);

        store.record_condition(key("b"), Value::new());
        store.record_condition(key("a"), Value::new());
        store.record_condition(key("c"), Value::new());
        store.check_lazy_condition_pairs().unwrap();

        assert_eq!(mock.last_batch_keys(), vec![key("a"), key("b"), key("c")]);
    }
}

// ============================================================================
// SECTION 2: Prefetching
// ============================================================================

mod prefetch {
    use super::*;

    #[test]
    fn test_batch_prefetch_warms_cache() {
        let (mut store, mock, _pool) = setup(&[("a", b"1"), ("b", b"2")]);

        store.batch_prefetch(&[key("a"), key("b")]).unwrap();
        assert_eq!(mock.batch_get_calls(), 1);

        // Point reads are now served from the overlay cache.
        assert_eq!(store.get(&key("a")).unwrap(), value("1"));
        assert_eq!(store.get(&key("b")).unwrap(), value("2"));
        assert_eq!(mock.get_calls(), 0);
    }

    #[test]
    fn test_batch_prefetch_empty_keys_is_noop() {
        let (store, mock, _pool) = setup(&[]);

        store.batch_prefetch(&[]).unwrap();
        assert_eq!(mock.remote_reads(), 0);
    }

    #[test]
    fn test_batch_prefetch_wraps_upstream_error() {
        let (store, mock, _pool) = setup(&[]);

        mock.fail_next("boom");
        let err = store.batch_prefetch(&[key("a")]).unwrap_err();
        assert!(matches!(err, Error::Upstream { op: "batch_prefetch", .. }));
    }

    #[test]
    fn test_range_prefetch_warms_half_open_interval() {
        let (mut store, mock, _pool) = setup(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);

        store.range_prefetch(&key("a"), &key("c"), 10).unwrap();
        assert_eq!(mock.range_get_calls(), 1);

        assert_eq!(store.get(&key("a")).unwrap(), value("1"));
        assert_eq!(store.get(&key("b")).unwrap(), value("2"));
        assert_eq!(mock.get_calls(), 0);

        // "c" is outside [a, c) and still costs a remote read.
        store.get(&key("c")).unwrap();
        assert_eq!(mock.get_calls(), 1);
    }

    /// A limit of zero means no cap.
    #[test]
    fn test_range_prefetch_zero_limit_fetches_all() {
        let (mut store, mock, _pool) =
            setup(&[("a", b"1"), ("b", b"2"), ("c", b"3"), ("d", b"4")]);

        store.range_prefetch(&key("a"), &Key::default(), 0).unwrap();

        for k in ["a", "b", "c", "d"] {
            store.get(&key(k)).unwrap();
        }
        assert_eq!(mock.get_calls(), 0);
        assert_eq!(mock.range_get_calls(), 1);
    }

    #[test]
    fn test_range_prefetch_respects_limit() {
        let (mut store, mock, _pool) = setup(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);

        store.range_prefetch(&key("a"), &Key::default(), 2).unwrap();

        store.get(&key("a")).unwrap();
        store.get(&key("b")).unwrap();
        assert_eq!(mock.get_calls(), 0);

        store.get(&key("c")).unwrap();
        assert_eq!(mock.get_calls(), 1);
    }

    #[test]
    fn test_range_prefetch_wraps_upstream_error() {
        let (store, mock, _pool) = setup(&[]);

        mock.fail_next("boom");
        let err = store
            .range_prefetch(&key("a"), &key("z"), 1)
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { op: "range_prefetch", .. }));
    }
}

// ============================================================================
// SECTION 3: Merged view
// ============================================================================

mod merged_view {
    use super::*;

    #[test]
    fn test_read_your_own_writes() {
        let (mut store, _mock, _pool) = setup(&[("k1", b"remote")]);

        store.set(key("k1"), value("local")).unwrap();
        assert_eq!(store.get(&key("k1")).unwrap(), value("local"));
    }

    #[test]
    fn test_delete_hides_remote_value() {
        let (mut store, _mock, _pool) = setup(&[("k1", b"remote")]);

        store.delete(&key("k1"));
        assert!(store.get(&key("k1")).unwrap_err().is_not_exist());
    }

    #[test]
    fn test_set_empty_value_rejected() {
        let (mut store, _mock, _pool) = setup(&[]);

        let err = store.set(key("k1"), Value::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyValue(_)));
    }

    #[test]
    fn test_seek_merges_buffer_over_prefetched_range() {
        let (mut store, _mock, _pool) = setup(&[("a", b"1"), ("c", b"3"), ("e", b"5")]);

        store.range_prefetch(&key("a"), &Key::default(), 0).unwrap();
        store.set(key("b"), value("2")).unwrap();
        store.set(key("c"), value("local")).unwrap();
        store.delete(&key("e"));

        let merged: Vec<(String, Value)> = store
            .seek(None)
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        assert_eq!(
            merged,
            vec![
                ("a".to_string(), value("1")),
                ("b".to_string(), value("2")),
                ("c".to_string(), value("local")),
            ]
        );
    }

    #[test]
    fn test_seek_from_key_starts_at_or_after() {
        let (mut store, _mock, _pool) = setup(&[]);

        store.set(key("a"), value("1")).unwrap();
        store.set(key("c"), value("3")).unwrap();

        let keys: Vec<String> = store
            .seek(Some(&key("b")))
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(keys, vec!["c"]);
    }

    #[test]
    fn test_walk_buffer_sees_writes_and_tombstones() {
        let (mut store, _mock, _pool) = setup(&[]);

        store.set(key("b"), value("2")).unwrap();
        store.delete(&key("a"));

        let mut walked = Vec::new();
        store
            .walk_buffer(|k, v| {
                walked.push((k.to_string(), v.is_empty()));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            walked,
            vec![("a".to_string(), true), ("b".to_string(), false)]
        );
    }
}

// ============================================================================
// SECTION 4: Options
// ============================================================================

mod options {
    use super::*;

    /// With the option set, reading an unbuffered key records a
    /// must-not-exist condition instead of going remote.
    #[test]
    fn test_presume_key_not_exists_skips_remote_read() {
        let (mut store, mock, _pool) = setup(&[("k1", b"v1")]);

        store.set_option(StoreOption::PresumeKeyNotExists, OptionValue::Flag);

        assert!(store.get(&key("k1")).unwrap_err().is_not_exist());
        assert_eq!(mock.remote_reads(), 0);
        assert_eq!(store.condition_count(), 1);

        // The deferred check catches the wrong presumption.
        let err = store.check_lazy_condition_pairs().unwrap_err();
        assert!(matches!(err, Error::KeyExists(_)));
    }

    #[test]
    fn test_presume_key_not_exists_still_reads_buffer() {
        let (mut store, mock, _pool) = setup(&[]);

        store.set_option(StoreOption::PresumeKeyNotExists, OptionValue::Flag);
        store.set(key("k1"), value("local")).unwrap();

        assert_eq!(store.get(&key("k1")).unwrap(), value("local"));
        assert_eq!(mock.remote_reads(), 0);
        assert_eq!(store.condition_count(), 0);
    }

    #[test]
    fn test_del_option_restores_remote_reads() {
        let (mut store, mock, _pool) = setup(&[("k1", b"v1")]);

        store.set_option(StoreOption::PresumeKeyNotExists, OptionValue::Flag);
        store.del_option(StoreOption::PresumeKeyNotExists);

        assert_eq!(store.get(&key("k1")).unwrap(), value("v1"));
        assert_eq!(mock.get_calls(), 1);
    }

    /// Options reach the overlay through the shared map.
    #[test]
    fn test_scan_batch_size_flows_to_overlay() {
        let (mut store, mock, _pool) =
            setup(&[("k1", b"v1"), ("k2", b"v2"), ("k3", b"v3")]);

        store.set_option(StoreOption::RangePrefetchOnCacheMiss, OptionValue::Flag);
        store.set_option(StoreOption::ScanBatchSize, OptionValue::Int(2));

        store.get(&key("k1")).unwrap();
        assert_eq!(mock.range_get_calls(), 1);
        assert_eq!(mock.get_calls(), 0);

        // k2 rode along with the ranged read; k3 did not fit the batch.
        store.get(&key("k2")).unwrap();
        assert_eq!(mock.range_get_calls(), 1);
        store.get(&key("k3")).unwrap();
        assert_eq!(mock.range_get_calls(), 2);
    }
}

// ============================================================================
// SECTION 5: Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    /// Releasing an untouched store must release all owned resources
    /// exactly once and must not panic.
    #[test]
    fn test_release_untouched_store() {
        let (store, mock, pool) = setup(&[]);

        store.release();

        assert_eq!(mock.release_calls(), 1);
        // No conditions were recorded, so nothing went back to the pool.
        assert_eq!(pool.idle_len(), 0);
    }

    #[test]
    fn test_release_returns_condition_buffer_to_pool() {
        let (mut store, mock, pool) = setup(&[]);

        store.record_condition(key("k1"), value("v1"));
        store.release();

        assert_eq!(mock.release_calls(), 1);
        assert_eq!(pool.idle_len(), 1);
        assert_eq!(pool.counters().returned, 1);
    }

    #[test]
    fn test_remote_snapshot_released_exactly_once() {
        let (mut store, mock, _pool) = setup(&[("k1", b"v1")]);

        // Touch every layer that holds the overlay.
        store.get(&key("k1")).unwrap();
        store.record_condition(key("k1"), value("v1"));
        store.check_lazy_condition_pairs().unwrap();
        store.release();

        assert_eq!(mock.release_calls(), 1);
    }

    /// Sequential transactions sharing one pool recycle the same backing
    /// instance instead of allocating fresh ones.
    #[test]
    fn test_sequential_transactions_reuse_pooled_buffer() {
        let mock = MockSnapshot::with_pairs(&[]);
        let pool = Arc::new(BufferPool::new(8));

        for i in 0..10 {
            let mut store =
                UnionStore::with_pool(Box::new(mock.clone()), Arc::clone(&pool));
            store.record_condition(key("k"), vec![i as u8]);
            let _ = store.check_lazy_condition_pairs();
            store.release();
        }

        let counters = pool.counters();
        assert_eq!(counters.created, 1);
        assert_eq!(counters.reused, 9);
        assert!(pool.idle_len() <= pool.capacity());
    }
}

// ============================================================================
// Property tests
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    /// The batched check agrees with a naive pair-by-pair model for
    /// arbitrary backing states and recorded conditions.
    #[derive(Debug, Clone, PartialEq)]
    enum Verdict {
        Pass,
        KeyExists,
        Mismatch,
    }

    fn naive_check(
        backend: &std::collections::BTreeMap<Vec<u8>, Vec<u8>>,
        conditions: &std::collections::BTreeMap<Vec<u8>, Vec<u8>>,
    ) -> Verdict {
        for (k, expected) in conditions {
            match (expected.is_empty(), backend.get(k)) {
                (true, Some(_)) => return Verdict::KeyExists,
                (true, None) => {}
                (false, Some(actual)) if actual != expected => return Verdict::Mismatch,
                (false, None) => return Verdict::Mismatch,
                (false, Some(_)) => {}
            }
        }
        Verdict::Pass
    }

    proptest! {
        #[test]
        fn check_matches_naive_model(
            backend in prop::collection::btree_map(
                prop::collection::vec(any::<u8>(), 1..3),
                prop::collection::vec(any::<u8>(), 0..3),
                0..8,
            ),
            conditions in prop::collection::btree_map(
                prop::collection::vec(any::<u8>(), 1..3),
                prop::collection::vec(any::<u8>(), 0..3),
                0..8,
            ),
        ) {
            let mock = MockSnapshot::new();
            for (k, v) in &backend {
                mock.put(Key::new(k.clone()), v.clone());
            }
            let pool = Arc::new(BufferPool::new(2));
            let mut store = UnionStore::with_pool(Box::new(mock.clone()), pool);
            for (k, v) in &conditions {
                store.record_condition(Key::new(k.clone()), v.clone());
            }

            let verdict = match store.check_lazy_condition_pairs() {
                Ok(()) => Verdict::Pass,
                Err(Error::KeyExists(_)) => Verdict::KeyExists,
                Err(Error::ConditionMismatch { .. }) => Verdict::Mismatch,
                Err(other) => panic!("unexpected error: {other:?}"),
            };

            prop_assert_eq!(verdict, naive_check(&backend, &conditions));

            // Never more than one batched read, never a point read.
            prop_assert!(mock.batch_get_calls() <= 1);
            prop_assert_eq!(mock.get_calls(), 0);
        }
    }
}

// A transaction (and its store) may migrate between worker threads.
static_assertions::assert_impl_all!(UnionStore: Send);
