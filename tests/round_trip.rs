use std::sync::Arc;

use cachebench::config::BackendConfig;
use cachebench::payload::{self, Blob, Fixed};
use cachebench::workload::{self, FanOut};
use cachebench::{Backend, Cache, Lru, Moka, MokaSegmented, Quick};

fn exact_1024() -> BackendConfig {
    BackendConfig {
        shards: 1,
        max_entries: 1024,
        ..BackendConfig::default()
    }
}

fn fill_then_read_middle<B: Backend>() {
    let cache = B::build::<Blob>(&exact_1024()).unwrap();
    workload::sequential_put(&cache, 1024, &Fixed(payload::small())).unwrap();

    let value = cache
        .get("512")
        .unwrap_or_else(|| panic!("{} lost key 512", B::NAME));
    assert_eq!(value.len(), 1024);
    assert!(Arc::ptr_eq(&value, &payload::small()));
}

fn writers_keep_their_own_keys<B: Backend>() {
    let config = BackendConfig {
        shards: 1,
        max_entries: 1 << 15,
        ..BackendConfig::default()
    };
    let cache = B::build::<u64>(&config).unwrap();
    let fan_out = FanOut {
        workers: 64,
        threads: 8,
    };
    let ops = 128;
    workload::heavy_write(&cache, &fan_out, ops, &payload::Tiny).unwrap();

    for worker in 0..64u64 {
        let first = worker * ops;
        let last = first + ops - 1;
        assert_eq!(cache.get(&workload::key(first)), Some(first + 1), "{}", B::NAME);
        assert_eq!(cache.get(&workload::key(last)), Some(last + 1), "{}", B::NAME);
    }
}

#[test]
fn test_round_trip_moka() {
    fill_then_read_middle::<Moka>();
    writers_keep_their_own_keys::<Moka>();
}

#[test]
fn test_round_trip_moka_segmented() {
    fill_then_read_middle::<MokaSegmented>();
    writers_keep_their_own_keys::<MokaSegmented>();
}

#[test]
fn test_round_trip_quick_cache() {
    fill_then_read_middle::<Quick>();
    writers_keep_their_own_keys::<Quick>();
}

#[test]
fn test_round_trip_lru() {
    fill_then_read_middle::<Lru>();
    writers_keep_their_own_keys::<Lru>();
}
