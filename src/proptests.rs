use crate::{AvlMap, Interval, IntervalTree};

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

fn assert_sound_map(t: &AvlMap<u8, u32>) {
    let issues = t.verify_integrity();
    assert!(issues.is_empty(), "{issues:?}\n{}", t.dump());
}

fn assert_sound_intervals(t: &IntervalTree<i32, u32>) {
    let issues = t.verify_integrity();
    assert!(issues.is_empty(), "{issues:?}\n{}", t.dump());
}

#[derive(Clone, Debug, Arbitrary)]
enum MapOp {
    #[proptest(weight = 3)]
    Insert(#[proptest(strategy = "0u8..64")] u8),
    #[proptest(weight = 2)]
    Delete(#[proptest(strategy = "0u8..64")] u8),
    Search(#[proptest(strategy = "0u8..64")] u8),
}

#[derive(Clone, Debug, Arbitrary)]
enum IntervalOp {
    #[proptest(weight = 4)]
    Insert(
        #[proptest(strategy = "-50i32..50")] i32,
        #[proptest(strategy = "0i32..30")] i32,
    ),
    #[proptest(weight = 2)]
    Delete(#[proptest(strategy = "-50i32..50")] i32),
    #[proptest(weight = 2)]
    Query(
        #[proptest(strategy = "-60i32..60")] i32,
        #[proptest(strategy = "0i32..40")] i32,
    ),
    TopK(#[proptest(strategy = "0usize..12")] usize),
    BottomK(#[proptest(strategy = "0usize..12")] usize),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_map_matches_multiset(ops in prop::collection::vec(any::<MapOp>(), 0..=400)) {
        let mut t: AvlMap<u8, u32> = AvlMap::new();
        // key -> number of stored copies
        let mut m: BTreeMap<u8, usize> = BTreeMap::new();

        for op in ops {
            match op {
                MapOp::Insert(key) => {
                    t.insert(key, key as u32);
                    *m.entry(key).or_default() += 1;
                }
                MapOp::Delete(key) => {
                    let removed = t.delete(&key);
                    match m.get_mut(&key) {
                        Some(count) => {
                            prop_assert_eq!(removed, Some(key as u32));
                            *count -= 1;
                            if *count == 0 {
                                m.remove(&key);
                            }
                        }
                        None => prop_assert_eq!(removed, None),
                    }
                }
                MapOp::Search(key) => {
                    let expected = m.contains_key(&key).then_some(key as u32);
                    prop_assert_eq!(t.search(&key).copied(), expected);
                }
            }

            assert_sound_map(&t);
            prop_assert_eq!(t.size(), m.values().sum::<usize>());
        }

        let got: Vec<u8> = t.inorder().into_iter().copied().collect();
        let expected: Vec<u8> = m
            .iter()
            .flat_map(|(&k, &n)| std::iter::repeat(k).take(n))
            .collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_intervals_match_brute_force(ops in prop::collection::vec(any::<IntervalOp>(), 0..=400)) {
        let mut t: IntervalTree<i32, u32> = IntervalTree::new();
        let mut model: Vec<(i32, i32, u32)> = Vec::new();
        let mut next_id = 0u32;

        let low_of = |model: &[(i32, i32, u32)], id: u32| -> i32 {
            model.iter().find(|e| e.2 == id).map(|e| e.0).unwrap_or(i32::MIN)
        };

        for op in ops {
            match op {
                IntervalOp::Insert(low, len) => {
                    t.insert(low, low + len, next_id);
                    model.push((low, low + len, next_id));
                    next_id += 1;
                }
                IntervalOp::Delete(low) => match t.delete(low, low) {
                    Some(id) => {
                        let pos = model.iter().position(|e| e.2 == id);
                        prop_assert!(pos.is_some(), "removed unknown id {}", id);
                        let (removed_low, _, _) = model.swap_remove(pos.unwrap_or_default());
                        prop_assert_eq!(removed_low, low);
                    }
                    None => prop_assert!(model.iter().all(|e| e.0 != low)),
                },
                IntervalOp::Query(low, len) => {
                    let high = low + len;
                    let mut got: Vec<u32> = t.range_query(low, high).into_iter().copied().collect();
                    got.sort_unstable();
                    let mut expected: Vec<u32> = model
                        .iter()
                        .filter(|e| e.0 <= high && e.1 >= low)
                        .map(|e| e.2)
                        .collect();
                    expected.sort_unstable();
                    prop_assert_eq!(got, expected);
                }
                IntervalOp::TopK(k) => {
                    let got: Vec<i32> = t.top_k(k).into_iter().map(|&id| low_of(&model, id)).collect();
                    let mut lows: Vec<i32> = model.iter().map(|e| e.0).collect();
                    lows.sort_unstable_by(|a, b| b.cmp(a));
                    lows.truncate(k);
                    prop_assert_eq!(got, lows);
                }
                IntervalOp::BottomK(k) => {
                    let got: Vec<i32> = t.bottom_k(k).into_iter().map(|&id| low_of(&model, id)).collect();
                    let mut lows: Vec<i32> = model.iter().map(|e| e.0).collect();
                    lows.sort_unstable();
                    lows.truncate(k);
                    prop_assert_eq!(got, lows);
                }
            }

            assert_sound_intervals(&t);
            prop_assert_eq!(t.size(), model.len());
            prop_assert_eq!(t.max_end(), model.iter().map(|e| e.1).max());
        }
    }

    #[test]
    fn prop_insert_then_delete_all_is_empty(
        keys in prop::collection::vec(any::<u8>(), 0..200)
    ) {
        let mut t: AvlMap<u8, u32> = keys.iter().map(|&k| (k, k as u32)).collect();
        prop_assert_eq!(t.size(), keys.len());
        for k in &keys {
            prop_assert!(t.delete(k).is_some());
        }
        prop_assert_eq!(t.size(), 0);
        prop_assert!(t.is_empty());
        assert_sound_map(&t);
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

#[test]
fn exhaustive_map_insert_order() {
    let keys: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7];

    for_each_permutation(&keys, |perm| {
        let mut t: AvlMap<u8, u32> = AvlMap::new();
        for &k in &perm {
            t.insert(k, k as u32);
            assert_sound_map(&t);
        }
        let got: Vec<u8> = t.inorder().into_iter().copied().collect();
        assert_eq!(got, keys, "insert order {perm:?}");
        assert!(t.height() <= 4);
    });
}

#[test]
fn exhaustive_map_delete_order() {
    let keys: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7];
    let base: AvlMap<u8, u32> = keys.iter().map(|&k| (k, k as u32)).collect();

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        let mut left = keys.len();
        for k in perm {
            assert_eq!(t.delete(&k), Some(k as u32));
            left -= 1;
            assert_eq!(t.size(), left);
            assert_sound_map(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.nodes.live(), 0);
    });
}

#[test]
fn exhaustive_interval_insert_and_delete_order() {
    // Repeated lows exercise the tie rules of both rebalance paths.
    let items: Vec<(i32, i32)> = vec![(3, 4), (1, 9), (3, 7), (2, 2), (5, 6), (1, 1)];

    for_each_permutation(&items, |perm| {
        let mut t: IntervalTree<i32, u32> = IntervalTree::new();
        for (id, &(low, high)) in perm.iter().enumerate() {
            t.insert(low, high, id as u32);
            assert_sound_intervals(&t);
        }
        assert_eq!(t.max_end(), Some(9));

        for &(low, high) in perm.iter().rev() {
            assert!(t.delete(low, high).is_some());
            assert_sound_intervals(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.max_end(), None);
    });
}

#[test]
fn compact_preserves_structure() {
    let mut t: IntervalTree<i32, u32> = IntervalTree::new();
    for i in 0..200 {
        t.insert((i * 37) % 101, (i * 37) % 101 + i % 13, i as u32);
    }
    for low in (0..101).step_by(4) {
        t.delete(low, low);
    }
    let before: Vec<(Interval<i32>, u32)> = t.iter().map(|(i, v)| (*i, *v)).collect();
    let slots_before = t.memory_usage();

    let _ = t.compact();
    t.shrink_to_fit();

    let after: Vec<(Interval<i32>, u32)> = t.iter().map(|(i, v)| (*i, *v)).collect();
    assert_eq!(before, after);
    assert!(t.memory_usage() <= slots_before);
    assert_sound_intervals(&t);
}
