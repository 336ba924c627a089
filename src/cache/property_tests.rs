//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the TTL engine against a simple reference model.

use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use crate::cache::CacheStore;

// == Test Configuration ==
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates cache keys drawn from a small alphabet so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]{1,3}".prop_map(|s| s)
}

/// Generates cache values
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,32}".prop_map(|s| s)
}

/// A single operation against the store
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits and misses mirror a HashMap model exactly, and the hit rate is
    // hits / (hits + misses) with no rounding.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = CacheStore::new(TEST_DEFAULT_TTL);
        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(key.clone(), value.clone(), None);
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let got = store.get(&key);
                    prop_assert_eq!(got.as_ref(), model.get(&key));
                    if got.is_some() {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                    }
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(&key), model.remove(&key).is_some());
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.item_count, model.len());

        let total = expected_hits + expected_misses;
        let expected_rate = if total == 0 { 0.0 } else { expected_hits as f64 / total as f64 };
        prop_assert_eq!(stats.hit_rate(), expected_rate);
    }

    // A value is readable from the moment it is stored until its TTL elapses,
    // and absent from then on.
    #[test]
    fn prop_readable_until_ttl_elapses(
        key in key_strategy(),
        value in value_strategy(),
        stored_at in 0u64..1_000_000,
        ttl_ms in 1u64..100_000,
        elapsed in 0u64..200_000,
    ) {
        let mut store = CacheStore::new(TEST_DEFAULT_TTL);
        store.set_at(key.clone(), value.clone(), Some(Duration::from_millis(ttl_ms)), stored_at);

        let now = stored_at + elapsed;
        let got = store.get_at(&key, now);
        if elapsed < ttl_ms {
            prop_assert_eq!(got, Some(value));
        } else {
            prop_assert_eq!(got, None);
        }
    }

    // Substring purge removes exactly the keys containing the token.
    #[test]
    fn prop_remove_matching_is_exact(
        keys in prop::collection::hash_set(key_strategy(), 1..20),
        token in "[a-d]{1,2}",
    ) {
        let mut store = CacheStore::new(TEST_DEFAULT_TTL);
        for key in &keys {
            store.set(key.clone(), 0u8, None);
        }

        let expected = keys.iter().filter(|k| k.contains(token.as_str())).count();
        prop_assert_eq!(store.remove_matching(&token), expected);
        prop_assert!(store.keys().iter().all(|k| !k.contains(token.as_str())));
    }
}
