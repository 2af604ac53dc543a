//! Cache benchmarks - get/put/invalidate on one segment and across segments.

use std::sync::Arc;
use waypoint::{CacheConfig, MatchResultCache, MatchTarget, RuleData, TargetKey};

fn main() {
    divan::main();
}

fn target(id: usize) -> MatchTarget {
    MatchTarget::Rule(Arc::new(RuleData::new(format!("r{id}"), "s", 0)))
}

fn filled(entries: usize, targets: usize) -> MatchResultCache {
    let cache = MatchResultCache::new(CacheConfig::default());
    for i in 0..entries {
        cache.put("p", format!("c1_value-{i}"), target(i % targets));
    }
    cache
}

#[divan::bench(args = [1_000, 65_536])]
fn get_hit(bencher: divan::Bencher, entries: usize) {
    let cache = filled(entries, 64);
    let key = format!("c1_value-{}", entries / 2);

    bencher.bench_local(|| cache.get("p", &key));
}

#[divan::bench]
fn get_miss_unknown_plugin(bencher: divan::Bencher) {
    let cache = filled(1_000, 64);

    bencher.bench_local(|| cache.get("other", "c1_value-1"));
}

#[divan::bench(args = [1_000, 65_536])]
fn put_at_capacity(bencher: divan::Bencher, capacity: usize) {
    let cache = MatchResultCache::new(CacheConfig::default().with_segment_capacity(capacity));
    for i in 0..capacity {
        cache.put("p", format!("warm-{i}"), target(i % 64));
    }
    let mut i = 0usize;

    bencher.bench_local(|| {
        i += 1;
        cache.put("p", format!("new-{i}"), target(i % 64));
    });
}

#[divan::bench(args = [16, 256])]
fn invalidate_target(bencher: divan::Bencher, keys_per_target: usize) {
    bencher
        .with_inputs(|| filled(keys_per_target * 8, 8))
        .bench_local_values(|cache| cache.invalidate("p", &TargetKey::Rule("r3".into())));
}

#[divan::bench(threads = [1, 4])]
fn get_hit_contended(bencher: divan::Bencher) {
    let cache = filled(10_000, 64);

    bencher.bench(|| cache.get("p", "c1_value-5000"));
}
