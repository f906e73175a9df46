#![cfg(test)]

// Property tests for Table kept inside the crate so the collision variant
// can reach the crate-private hasher hook.

use crate::config::TableConfig;
use crate::table::Table;
use crate::test_hashers::ConstBuildHasher;
use proptest::prelude::*;
use std::collections::HashMap;
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn arb_config() -> impl Strategy<Value = TableConfig> {
    (1usize..=8, prop_oneof![Just(0.25f32), Just(0.5), Just(0.75), Just(1.0)])
        .prop_map(|(capacity, load_factor)| TableConfig {
            capacity,
            load_factor,
        })
}

// Runs one scenario against `HashMap` as the model. Invariants checked
// after every op:
// - `put` returns the model's displaced value; `remove` returns the owned value.
// - `get`/`contains_key` parity with the model, including borrowed `&str` queries.
// - `len` parity, and `len < threshold` once `put` returns.
// - Capacity never shrinks and only moves by powers of two.
fn run_scenario<S>(
    mut sut: Table<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: std::hash::BuildHasher,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut capacity = sut.capacity();
    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = key_from(pool, i);
                let prev = sut.put(k.clone(), v).expect("put below ceiling");
                prop_assert_eq!(prev, model.insert(k, v));
                prop_assert!(sut.len() < sut.threshold());
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
                prop_assert!(sut.get(&k).is_none());
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
                prop_assert_eq!(sut.get(s.as_str()), model.get(&Key(s.clone())));
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        let now = sut.capacity();
        prop_assert!(now >= capacity);
        prop_assert!(now % capacity == 0 && (now / capacity).is_power_of_two());
        capacity = now;
    }
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap
// across random capacities and load factors.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(config in arb_config(), (pool, ops) in arb_scenario()) {
        let sut: Table<Key, i32> = Table::from_config(config).unwrap();
        run_scenario(sut, &pool, ops)?;
    }
}

// Property: same invariants under worst-case collisions. Every key shares
// one probe chain, so removals leave tombstones in the middle of it.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions(config in arb_config(), (pool, ops) in arb_scenario()) {
        let sut: Table<Key, i32, ConstBuildHasher> =
            Table::with_config_and_hasher(config, ConstBuildHasher).unwrap();
        run_scenario(sut, &pool, ops)?;
    }
}
