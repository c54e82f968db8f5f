use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

fn validate_map(m: &OrderedMap) {
    let stats = m.memory_stats();
    let mut inline = 0usize;
    let mut owned_bytes = 0usize;
    for (key, _) in m.iter() {
        if TaggedKey::fits_inline(key) {
            inline += 1;
        } else {
            owned_bytes += key.len();
        }
    }
    assert_eq!(stats.num_keys, m.len());
    assert_eq!(stats.inline_keys, inline, "inline key count drifted");
    assert_eq!(stats.owned_keys, m.len() - inline);
    assert_eq!(stats.owned_key_bytes, owned_bytes, "owned byte count drifted");
}

#[derive(Clone, Debug)]
enum Op {
    Set(Vec<u8>, u64),
    PutNew(Vec<u8>, u64),
    Erase(Vec<u8>),
    Get(Vec<u8>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // Bias towards 8-byte keys so both representations collide often.
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 8),
        1 => prop::collection::vec(0u8..4, 0..=10),
        1 => prop::collection::vec(any::<u8>(), 0..=24),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        35 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Set(k, v)),
        15 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::PutNew(k, v)),
        25 => key.clone().prop_map(Op::Erase),
        25 => key.clone().prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t = OrderedMap::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Set(key, value) => {
                    t.set(&key, value).unwrap();
                    m.insert(key, value);
                }
                Op::PutNew(key, value) => {
                    let old_t = t.put_new_and_get_old(&key, value).unwrap();
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Erase(key) => {
                    let old_t = t.erase(&key);
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(key.as_slice()).copied());
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_map(&t);
        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.to_vec(), v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_key_order_matches_bytes(a in key_strategy(), b in key_strategy()) {
        let ka = TaggedKey::new(&a);
        let kb = TaggedKey::new(&b);
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
        prop_assert_eq!(ka == kb, a == b);
        prop_assert_eq!(ka.as_bytes(), a.as_slice());
    }

    #[test]
    fn prop_cursor_walks_in_order(keys in prop::collection::btree_set(key_strategy(), 0..64)) {
        let mut t = OrderedMap::new();
        for (i, k) in keys.iter().enumerate() {
            t.set(k, i as u64).unwrap();
        }
        let sorted: Vec<Vec<u8>> = keys.into_iter().collect();

        let mut forward = Vec::new();
        let mut c = t.seek_first().unwrap();
        while let Some(e) = c.next(&t).unwrap() {
            forward.push(e.key.to_vec());
        }
        prop_assert!(c.is_exhausted());
        prop_assert_eq!(&forward, &sorted);

        let mut backward = Vec::new();
        if let Some(last) = sorted.last() {
            let mut c = t.seek(last).unwrap();
            while let Some(e) = c.prev(&t).unwrap() {
                backward.push(e.key.to_vec());
            }
        }
        backward.reverse();
        prop_assert_eq!(&backward, &sorted);
    }

    #[test]
    fn prop_range_matches_model(
        keys in prop::collection::btree_set(key_strategy(), 0..64),
        start in key_strategy(),
        end in key_strategy(),
    ) {
        let mut t = OrderedMap::new();
        for k in &keys {
            t.set(k, 0).unwrap();
        }
        let got: Vec<Vec<u8>> = t.range(&start, &end).map(|(k, _)| k.to_vec()).collect();
        let expected: Vec<Vec<u8>> = keys
            .iter()
            .filter(|k| k.as_slice() >= start.as_slice() && k.as_slice() < end.as_slice())
            .cloned()
            .collect();
        prop_assert_eq!(got, expected);
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

fn boundary_keys() -> Vec<Vec<u8>> {
    vec![
        b"\x00AAAAAAA".to_vec(),
        b"\x01AAAAAAA".to_vec(),
        b"\x00AAAAAA".to_vec(),
        b"\x01AAAAAAAA".to_vec(),
        b"12345678".to_vec(),
        b"".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_boundary_set() {
    let keys = boundary_keys();

    for_each_permutation(&keys, |perm| {
        let mut t = OrderedMap::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.put_new_and_get_old(&k, v).unwrap(), m.insert(k, v));
        }

        validate_map(&t);
        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k.to_vec(), v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_erase_order_boundary_set() {
    let keys = boundary_keys();

    let mut base = OrderedMap::new();
    for (i, k) in keys.iter().enumerate() {
        base.set(k, i as u64).unwrap();
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        let mut remaining = keys.len();

        for k in perm {
            assert!(t.erase(&k).is_some());
            assert_eq!(t.erase(&k), None);
            remaining -= 1;
            assert_eq!(t.len(), remaining);
            validate_map(&t);
        }
        assert!(t.is_empty());
        assert!(t.seek_first().unwrap().is_exhausted());
    });
}

#[test]
fn random_keys_iterate_sorted() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0x7a6_3a9);
    let mut t = OrderedMap::new();
    let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

    for i in 0..20_000u64 {
        let len = if rng.gen_bool(0.5) { 8 } else { rng.gen_range(0..32) };
        let key: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        t.set(&key, i).unwrap();
        m.insert(key, i);
    }

    assert_eq!(t.len(), m.len());
    validate_map(&t);
    assert!(t.iter().zip(m.iter()).all(|((tk, tv), (mk, mv))| tk == mk.as_slice() && tv == *mv));

    let mut c = t.seek_first().unwrap();
    let mut prev: Option<Vec<u8>> = None;
    while let Some(e) = c.next(&t).unwrap() {
        if let Some(p) = &prev {
            assert!(p.as_slice() < e.key, "cursor out of order");
        }
        prev = Some(e.key.to_vec());
    }
}
