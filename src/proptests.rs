use super::*;

use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Clone, Debug)]
enum Op {
    Set(u64, u64),
    Delete(u64),
    Get(u64),
    Compact,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // a narrow key range keeps shards filling and draining repeatedly
    let key = 0u64..512;
    let op = prop_oneof![
        50 => (key.clone(), 1..u64::MAX).prop_map(|(k, v)| Op::Set(k, v)),
        30 => key.clone().prop_map(Op::Delete),
        19 => key.prop_map(Op::Get),
        1 => Just(Op::Compact),
    ];
    prop::collection::vec(op, 0..=3000)
}

fn validate_shards(stats: &[ShardStats]) {
    for s in stats {
        assert!(
            s.count <= s.count_high,
            "count {} exceeds high-water mark {}",
            s.count,
            s.count_high
        );
        if !s.present {
            assert_eq!(s.count, 0, "absent table must have no entries");
            assert_eq!(s.count_high, 0, "absent table must reset its peak");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_sharded_matches_model(ops in ops_strategy(), shard_power in 0u32..6) {
        let map: ShardedMap<u64, u64> = ShardedMap::with_shards(1 << shard_power);
        let mut model: HashMap<u64, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(k, v) => {
                    map.set(k, v);
                    model.insert(k, v);
                }
                Op::Delete(k) => {
                    map.delete(&k);
                    model.remove(&k);
                }
                Op::Get(k) => {
                    prop_assert_eq!(map.get(&k), model.get(&k).copied());
                }
                Op::Compact => {
                    map.force_compact();
                }
            }

            prop_assert_eq!(map.count(), model.len());
        }

        validate_shards(&map.shard_stats());
        for (k, v) in &model {
            prop_assert_eq!(map.get(k), Some(*v));
        }
    }

    #[test]
    fn prop_simple_matches_model(ops in ops_strategy()) {
        let map: SimpleMap<u64, u64> = SimpleMap::new();
        let mut model: HashMap<u64, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(k, v) => {
                    map.set(k, v);
                    model.insert(k, v);
                }
                Op::Delete(k) => {
                    map.delete(&k);
                    model.remove(&k);
                }
                Op::Get(k) => {
                    prop_assert_eq!(map.get(&k), model.get(&k).copied().unwrap_or_default());
                }
                Op::Compact => {
                    map.compact();
                }
            }

            prop_assert_eq!(map.count(), model.len());
        }

        let stats = map.stats();
        prop_assert!(stats.count <= stats.count_high);
    }

    #[test]
    fn prop_log_base2_brackets_value(v in 1usize..(1 << 40)) {
        let next = next_log_base2(v);
        let prev = prev_log_base2(v);

        prop_assert!(1usize << next >= v);
        prop_assert!(1usize << prev <= v);
        if v.is_power_of_two() {
            prop_assert_eq!(next, prev);
        } else {
            prop_assert_eq!(next, prev + 1);
        }
    }
}
