#![cfg(test)]

// Property tests for HMap kept inside the crate so they can check the
// two-table bookkeeping directly.

use crate::config::Config;
use crate::hash_code::HashCoder;
use crate::hmap::HMap;
use crate::node::{Link, Linked};
use proptest::prelude::*;
use slotmap::{DefaultKey, SlotMap};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug)]
struct Entry {
    link: Link<DefaultKey>,
    key: String,
    value: i32,
}

impl Linked<DefaultKey> for Entry {
    fn link(&self) -> &Link<DefaultKey> {
        &self.link
    }
    fn link_mut(&mut self) -> &mut Link<DefaultKey> {
        &mut self.link
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Delete(usize),
    Lookup(usize),
    Iterate,
    Resize(u32),
    ResizeImmediate(u32),
    Clear,
}

fn arb_config() -> impl Strategy<Value = Config> {
    (0u32..3, 1usize..4, 1usize..6).prop_map(|(cap_shift, load, work)| {
        Config::new()
            .with_initial_capacity(1 << cap_shift)
            .with_max_load_factor(load)
            .with_migration_work(work)
    })
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=48).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::Delete),
            3 => idx.clone().prop_map(Op::Lookup),
            1 => Just(Op::Iterate),
            1 => (0u32..8).prop_map(Op::Resize),
            1 => (0u32..8).prop_map(Op::ResizeImmediate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drives the map as a unique-key store (lookup before insert) and compares
// it with a BTreeMap model after every operation.
fn run_state_machine(
    config: Config,
    pool: Vec<String>,
    ops: Vec<Op>,
    hash: impl Fn(&str) -> u64,
) -> Result<(), TestCaseError> {
    let mut arena: SlotMap<DefaultKey, Entry> = SlotMap::new();
    let mut sut: HMap<DefaultKey> = HMap::with_config(config).unwrap();
    let mut model: BTreeMap<String, (DefaultKey, i32)> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let key = &pool[i];
                let h = hash(key.as_str());
                let found = sut.lookup(&mut arena, h, |e| e.key == *key);
                prop_assert_eq!(found, model.get(key).map(|&(id, _)| id));
                if found.is_none() {
                    let id = arena.insert(Entry {
                        link: Link::new(h),
                        key: key.clone(),
                        value: v,
                    });
                    sut.insert(&mut arena, id).unwrap();
                    model.insert(key.clone(), (id, v));
                }
            }
            Op::Delete(i) => {
                let key = &pool[i];
                let removed = sut.delete(&mut arena, hash(key.as_str()), |e| e.key == *key);
                match model.remove(key) {
                    Some((id, v)) => {
                        prop_assert_eq!(removed, Some(id));
                        let entry = arena.remove(id).expect("deleted payload still in arena");
                        prop_assert_eq!(entry.value, v);
                    }
                    None => prop_assert!(removed.is_none()),
                }
            }
            Op::Lookup(i) => {
                let key = &pool[i];
                let found = sut.lookup(&mut arena, hash(key.as_str()), |e| e.key == *key);
                prop_assert_eq!(found, model.get(key).map(|&(id, _)| id));
            }
            Op::Iterate => {
                let seen: BTreeSet<String> =
                    sut.iter(&arena).map(|(_, e)| e.key.clone()).collect();
                let expected: BTreeSet<String> = model.keys().cloned().collect();
                prop_assert_eq!(sut.iter(&arena).count(), model.len());
                prop_assert_eq!(seen, expected);
            }
            Op::Resize(shift) => {
                sut.resize(&mut arena, 1 << shift).unwrap();
                let realized = (1usize << shift).max(model.len().next_power_of_two());
                prop_assert_eq!(sut.capacity(), realized);
            }
            Op::ResizeImmediate(shift) => {
                sut.resize_immediate(&mut arena, 1 << shift).unwrap();
                prop_assert!(!sut.is_migrating());
                let realized = (1usize << shift).max(model.len().next_power_of_two());
                prop_assert_eq!(sut.capacity(), realized);
            }
            Op::Clear => {
                sut.clear();
                // Payloads are the caller's; release them alongside the model.
                for (_, (id, _)) in std::mem::take(&mut model) {
                    arena.remove(id);
                }
                prop_assert_eq!(sut.capacity(), 0);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.len(), sut.newer_len() + sut.older_len());
        prop_assert_eq!(sut.is_migrating(), sut.migration_progress().is_some());
        sut.assert_consistent(&arena);
    }

    // Whatever is still in flight, a final drain leaves a single table
    // holding exactly the model.
    let cap = sut.capacity();
    sut.resize_immediate(&mut arena, cap.max(1)).unwrap();
    prop_assert!(!sut.is_migrating());
    for (key, &(id, v)) in &model {
        let found = sut.lookup(&mut arena, hash(key.as_str()), |e| e.key == *key);
        prop_assert_eq!(found, Some(id));
        prop_assert_eq!(arena[id].value, v);
    }
    Ok(())
}

// Property: a map with aggressive growth settings behaves like a model map
// across arbitrary interleavings of inserts, deletes, lookups, resizes and
// clears, while both tables stay internally consistent.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(config in arb_config(), (pool, ops) in arb_scenario()) {
        let coder = HashCoder::new();
        run_state_machine(config, pool, ops, |k| coder.hash_code(k))?;
    }
}

// Property: same invariants when most keys share a hash code, so equality
// alone separates them and chains get long.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions(config in arb_config(), (pool, ops) in arb_scenario()) {
        run_state_machine(config, pool, ops, |k| k.len() as u64)?;
    }
}
