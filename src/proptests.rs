use super::*;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Clone, Debug)]
enum Op<K, V> {
    Insert(K, V),
    Remove(K),
    Get(K),
}

#[derive(Clone, Debug)]
enum PairOp {
    Set(String, String, u32),
    Delete(String, String),
    Get(String, String),
}

fn word_strategy() -> impl Strategy<Value = String> + Clone {
    // Lowercase letters have distinct codes modulo 26, so no two of these keys
    // are indistinguishable under the default alphabet.
    "[a-z]{0,8}"
}

fn narrow_word_strategy() -> impl Strategy<Value = String> + Clone {
    // Few distinct characters: many shared prefixes, deep splits and collapses.
    "[ab]{0,10}"
}

fn trie_ops(key: impl Strategy<Value = String> + Clone) -> impl Strategy<Value = Vec<Op<String, u32>>> {
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        20 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=600)
}

fn byte_ops() -> impl Strategy<Value = Vec<Op<Vec<u8>, u32>>> {
    let key = prop::collection::vec(any::<u8>(), 0..=12);
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        20 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=400)
}

fn pair_ops() -> impl Strategy<Value = Vec<PairOp>> {
    let outer = "[a-h]{1,3}";
    let inner = "[0-4]{1,2}";
    let op = prop_oneof![
        50 => (outer, inner, any::<u32>()).prop_map(|(a, b, v)| PairOp::Set(a, b, v)),
        30 => (outer, inner).prop_map(|(a, b)| PairOp::Delete(a, b)),
        20 => (outer, inner).prop_map(|(a, b)| PairOp::Get(a, b)),
    ];
    prop::collection::vec(op, 0..=800)
}

fn run_trie_against_model(mut t: PrefixTrieTable<String, u32>, ops: Vec<Op<String, u32>>) {
    let mut m: BTreeMap<String, u32> = BTreeMap::new();
    for op in ops {
        match op {
            Op::Insert(key, value) => {
                let old_t = t.insert(key.clone(), value).expect("distinguishable keys");
                let old_m = m.insert(key, value);
                assert_eq!(old_t, old_m);
            }
            Op::Remove(key) => {
                let old_t = t.remove(key.as_str()).ok();
                let old_m = m.remove(&key);
                assert_eq!(old_t, old_m);
            }
            Op::Get(key) => {
                let got_t = t.get(key.as_str()).ok().copied();
                let got_m = m.get(&key).copied();
                assert_eq!(got_t, got_m);
            }
        }
        assert_eq!(t.len(), m.len());
    }

    t.assert_invariants();
    let got: BTreeMap<String, u32> = t.iter().map(|(k, v)| (k.clone(), *v)).collect();
    assert_eq!(got, m);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_trie_equivalence(ops in trie_ops(word_strategy())) {
        run_trie_against_model(PrefixTrieTable::new(), ops);
    }

    #[test]
    fn prop_trie_equivalence_shared_prefixes(ops in trie_ops(narrow_word_strategy())) {
        run_trie_against_model(PrefixTrieTable::new(), ops);
    }

    #[test]
    fn prop_trie_byte_keys_wide_alphabet(ops in byte_ops()) {
        // One character slot per byte value: any two distinct keys separate.
        let mut t: PrefixTrieTable<Vec<u8>, u32> =
            PrefixTrieTable::with_config(TrieConfig { alphabet_size: 257 }).unwrap();
        let mut m: HashMap<Vec<u8>, u32> = HashMap::new();
        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(t.insert(key.clone(), value).unwrap(), m.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(key.as_slice()).ok(), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(key.as_slice()).ok(), m.get(&key));
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }
        t.assert_invariants();
    }

    #[test]
    fn prop_composite_equivalence(ops in pair_ops()) {
        let mut t: CompositeKeyTable<String, String, u32> = CompositeKeyTable::new();
        let mut m: BTreeMap<(String, String), u32> = BTreeMap::new();
        for op in ops {
            match op {
                PairOp::Set(a, b, v) => {
                    let old_t = t.set(a.clone(), b.clone(), v).unwrap();
                    prop_assert_eq!(old_t, m.insert((a, b), v));
                }
                PairOp::Delete(a, b) => {
                    let old_t = t.delete(&a, &b).ok();
                    prop_assert_eq!(old_t, m.remove(&(a, b)));
                }
                PairOp::Get(a, b) => {
                    let got_t = t.get(&a, &b).ok().copied();
                    prop_assert_eq!(got_t, m.get(&(a, b)).copied());
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        t.assert_invariants();
        let got: BTreeMap<(String, String), u32> = t
            .iter()
            .map(|(a, b, v)| ((a.clone(), b.clone()), *v))
            .collect();
        prop_assert_eq!(&got, &m);

        let outer: BTreeSet<String> = t.keys().cloned().collect();
        let expected: BTreeSet<String> = m.keys().map(|(a, _)| a.clone()).collect();
        prop_assert_eq!(outer, expected);
    }

    #[test]
    fn prop_composite_fixed_sizes_never_partially_insert(ops in pair_ops()) {
        let config = CompositeConfig {
            outer_sizes: TableSizes::new(vec![5, 11]).unwrap(),
            inner_sizes: TableSizes::fixed(7).unwrap(),
        };
        let mut t: CompositeKeyTable<String, String, u32> = CompositeKeyTable::with_config(config);
        let mut m: BTreeMap<(String, String), u32> = BTreeMap::new();
        for op in ops {
            match op {
                PairOp::Set(a, b, v) => match t.set(a.clone(), b.clone(), v) {
                    Ok(old) => prop_assert_eq!(old, m.insert((a, b), v)),
                    Err(Error::Full) => {
                        prop_assert!(!m.contains_key(&(a.clone(), b.clone())));
                        prop_assert!(!t.contains(&a, &b));
                    }
                    Err(e) => prop_assert!(false, "unexpected error {e}"),
                },
                PairOp::Delete(a, b) => {
                    prop_assert_eq!(t.delete(&a, &b).ok(), m.remove(&(a, b)));
                }
                PairOp::Get(a, b) => {
                    prop_assert_eq!(t.get(&a, &b).ok().copied(), m.get(&(a, b)).copied());
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }
        t.assert_invariants();
    }

    #[test]
    fn prop_linear_probe_equivalence(ops in trie_ops(word_strategy())) {
        let mut t: LinearProbeTable<String, u32> = LinearProbeTable::new();
        let mut m: HashMap<String, u32> = HashMap::new();
        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(t.insert(key.clone(), value).unwrap(), m.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&key).ok(), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key).ok(), m.get(&key));
                }
            }
            prop_assert_eq!(t.len(), m.len());
            prop_assert!(t.len() * 2 <= t.capacity());
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_KEYS: [&str; 6] = ["a", "ab", "abc", "ac", "b", "ba"];

#[test]
fn exhaustive_trie_insert_order_small_set() {
    for_each_permutation(&SMALL_KEYS, |perm| {
        let mut t: PrefixTrieTable<String, u64> = PrefixTrieTable::new();
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.insert(k.to_string(), i as u64), Ok(None));
        }
        t.assert_invariants();
        let got: BTreeSet<&str> = t.keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = SMALL_KEYS.iter().copied().collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_trie_remove_order_small_set() {
    let mut base: PrefixTrieTable<String, u64> = PrefixTrieTable::new();
    for (i, k) in SMALL_KEYS.iter().enumerate() {
        base.insert(k.to_string(), i as u64).unwrap();
    }

    for_each_permutation(&SMALL_KEYS, |perm| {
        let mut t = base.clone();
        let mut live: BTreeSet<&str> = SMALL_KEYS.iter().copied().collect();
        for k in perm {
            assert!(t.remove(k).is_ok(), "remove {k:?}");
            live.remove(k);
            t.assert_invariants();
            for other in &live {
                assert!(t.contains_key(*other), "{other:?} lost after removing {k:?}");
            }
        }
        assert!(t.is_empty());
        let stats = t.stats();
        assert_eq!(stats.tables, 1);
        assert_eq!(stats.internal_nodes, 0);
    });
}

#[test]
fn exhaustive_composite_delete_order_colliding_outer_keys() {
    // Single letters congruent modulo 11 share home slot 9 in an 11-slot table.
    let keys = ["a", "l", "w", "b"];
    let config = || CompositeConfig {
        outer_sizes: TableSizes::fixed(11).unwrap(),
        inner_sizes: TableSizes::default(),
    };
    for_each_permutation(&keys, |perm| {
        let mut t: CompositeKeyTable<String, String, u64> = CompositeKeyTable::with_config(config());
        for (i, k) in keys.iter().enumerate() {
            t.set(k.to_string(), "in".to_string(), i as u64).unwrap();
        }
        let mut live: BTreeSet<&str> = keys.iter().copied().collect();
        for k in perm {
            t.delete(&k.to_string(), &"in".to_string()).unwrap();
            live.remove(k);
            t.assert_invariants();
            for other in &live {
                assert!(t.contains(&other.to_string(), &"in".to_string()));
            }
        }
        assert!(t.is_empty());
    });
}

#[test]
fn randomized_composite_stress() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut t: CompositeKeyTable<String, String, u64> = CompositeKeyTable::new();
    let mut m: HashMap<(String, String), u64> = HashMap::new();
    for step in 0..20_000u64 {
        let a = format!("user{}", rng.gen_range(0..300));
        let b = format!("item{}", rng.gen_range(0..20));
        if rng.gen_bool(0.6) {
            assert_eq!(t.set(a.clone(), b.clone(), step).unwrap(), m.insert((a, b), step));
        } else {
            assert_eq!(t.delete(&a, &b).ok(), m.remove(&(a, b)));
        }
    }
    assert_eq!(t.len(), m.len());
    t.assert_invariants();
    for ((a, b), v) in &m {
        assert_eq!(t.get(a, b), Ok(v));
    }
}

#[test]
fn randomized_trie_stress() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut t: PrefixTrieTable<String, u64> = PrefixTrieTable::new();
    let mut m: HashMap<String, u64> = HashMap::new();
    for step in 0..20_000u64 {
        let len = rng.gen_range(0..12);
        let key: String = (0..len).map(|_| rng.gen_range(b'a'..=b'd') as char).collect();
        if rng.gen_bool(0.55) {
            assert_eq!(t.insert(key.clone(), step).unwrap(), m.insert(key, step));
        } else {
            assert_eq!(t.remove(key.as_str()).ok(), m.remove(&key));
        }
    }
    assert_eq!(t.len(), m.len());
    t.assert_invariants();
}
