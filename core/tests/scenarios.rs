//! End-to-end behavior of the index, the cache and the engine together.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use waypoint::prelude::*;
use waypoint::{conditions_key, CacheConfig, EqualsJudge};

struct Headers(Vec<(&'static str, &'static str)>);

impl RequestContext for Headers {
    fn real_data(&self, param_type: ParamType, name: &str) -> Option<Cow<'_, str>> {
        if param_type != ParamType::Header {
            return None;
        }
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| Cow::Borrowed(*v))
    }
}

fn env_selector(id: &str, sort: i32, env: &str) -> SelectorData {
    SelectorData::new(id, "rate-limiter", sort).with_condition(ConditionData::new(
        format!("{id}-env"),
        ParamType::Header,
        Operator::Equals,
        "X-Env",
        env,
    ))
}

#[test]
fn rate_limiter_scenario() {
    let index = Arc::new(ConfigurationIndex::default());
    index.upsert_plugin(PluginData::new("rate-limiter"));
    index.upsert_selector(env_selector("S1", 1, "prod"));
    index.upsert_selector(env_selector("S2", 0, "staging"));

    let ids: Vec<_> = index
        .lookup_selectors("rate-limiter")
        .iter()
        .map(|s| s.id.clone())
        .collect();
    assert_eq!(ids, ["S2", "S1"]);

    let prod = Headers(vec![("x-env", "prod")]);
    let s1 = index.lookup_selectors("rate-limiter")[1].clone();
    assert!(s1
        .match_mode
        .strategy()
        .evaluate(&s1.conditions, &prod, &JudgeRegistry::with_defaults()));

    let k1 = conditions_key(&s1.conditions, &prod).unwrap();
    index
        .cache()
        .put("rate-limiter", k1.clone(), MatchTarget::Selector(Arc::clone(&s1)));
    assert_eq!(
        index.cache().get("rate-limiter", &k1),
        Some(MatchTarget::Selector(s1.clone()))
    );

    assert!(index.remove_selector(&s1));
    assert_eq!(index.cache().get("rate-limiter", &k1), None);
    assert!(index.lookup_condition_owner("S1-env").is_none());
}

#[test]
fn lru_touch_protects_first_key() {
    const N: usize = 8;
    let cache = MatchResultCache::new(CacheConfig::default().with_segment_capacity(N));
    let target = MatchTarget::Selector(Arc::new(SelectorData::new("s", "p", 0)));

    for i in 1..=N {
        cache.put("p", format!("key{i}"), target.clone());
    }
    assert!(cache.get("p", "key1").is_some());
    cache.put("p", format!("key{}", N + 1), target.clone());

    assert!(cache.contains("p", "key1"));
    assert!(!cache.contains("p", "key2"));
    assert_eq!(cache.len("p"), N);
    assert_eq!(cache.tracked_total("p"), N);
}

#[test]
fn memory_ceiling_never_exceeded_and_tracker_follows() {
    let ceiling = 64 * 1024;
    let cache = MatchResultCache::new(
        CacheConfig::default()
            .with_memory_ceiling(ceiling)
            .with_segment_capacity(1 << 20),
    );
    for i in 0..20_000 {
        let plugin = format!("p{}", i % 4);
        let target = MatchTarget::Rule(Arc::new(RuleData::new(format!("r{}", i % 50), "s", 0)));
        cache.put(&plugin, format!("c{i}_{}", "v".repeat(i % 64)), target);
        assert!(cache.memory_used() <= ceiling);
    }
    assert!(cache.stats().snapshot().evictions > 0);
    for p in 0..4 {
        let plugin = format!("p{p}");
        assert_eq!(cache.tracked_total(&plugin), cache.len(&plugin));
    }
}

#[test]
fn concurrent_reads_during_updates_see_whole_lists() {
    let plane = Arc::new(DataPlane::default());
    plane.apply(ConfigEvent::UpsertPlugin(PluginData::new("rate-limiter")));
    for i in 0..16 {
        plane.apply(ConfigEvent::UpsertSelector(env_selector(&format!("s{i}"), i, "prod")));
    }

    let writer = {
        let plane = Arc::clone(&plane);
        std::thread::spawn(move || {
            for round in 0..200 {
                let i = round % 16;
                plane.apply(ConfigEvent::UpsertSelector(env_selector(
                    &format!("s{i}"),
                    (round * 7 % 32) as i32,
                    "prod",
                )));
            }
        })
    };
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let plane = Arc::clone(&plane);
            std::thread::spawn(move || {
                let ctx = Headers(vec![("x-env", "prod")]);
                for _ in 0..500 {
                    let list = plane.index().lookup_selectors("rate-limiter");
                    assert_eq!(list.len(), 16);
                    assert!(list.windows(2).all(|w| w[0].sort <= w[1].sort));
                    assert!(plane.match_selector("rate-limiter", &ctx).is_some());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    // whatever the readers cached mid-update, only current versions are served now
    let ctx = Headers(vec![("x-env", "prod")]);
    for _ in 0..2 {
        let served = plane.match_selector("rate-limiter", &ctx).unwrap();
        let current = plane.index().lookup_selectors("rate-limiter")[0].clone();
        assert!(Arc::ptr_eq(&served, &current));
    }
}

/// Equality judge that pushes a replacement selector the first time it runs,
/// so the evaluation in flight finishes against the old version.
#[derive(Debug)]
struct UpsertWhileJudging {
    index: Arc<ConfigurationIndex>,
    replacement: Mutex<Option<SelectorData>>,
}

impl PredicateJudge for UpsertWhileJudging {
    fn judge(&self, condition: &ConditionData, real_data: &str) -> bool {
        let replacement = self.replacement.lock().unwrap().take();
        if let Some(next) = replacement {
            self.index.upsert_selector(next);
        }
        EqualsJudge.judge(condition, real_data)
    }
}

#[test]
fn write_behind_an_upsert_is_never_served() {
    let index = Arc::new(ConfigurationIndex::default());
    index.upsert_plugin(PluginData::new("rate-limiter"));
    index.upsert_selector(env_selector("s1", 0, "prod"));

    let v2 = env_selector("s1", 0, "prod").with_match_mode(MatchMode::Or);
    let judge = UpsertWhileJudging {
        index: Arc::clone(&index),
        replacement: Mutex::new(Some(v2)),
    };
    let engine = MatchEngine::with_judges(
        Arc::clone(&index),
        JudgeRegistry::with_defaults().with(Operator::Equals, judge),
    );
    let ctx = Headers(vec![("x-env", "prod")]);

    // the in-flight lookup answers with the version it evaluated and caches it
    // after the upsert already invalidated
    let first = engine.match_selector("rate-limiter", &ctx).unwrap();
    assert_eq!(first.match_mode, MatchMode::And);
    assert_eq!(index.lookup_selectors("rate-limiter")[0].match_mode, MatchMode::Or);

    for _ in 0..3 {
        let served = engine.match_selector("rate-limiter", &ctx).unwrap();
        assert_eq!(served.match_mode, MatchMode::Or);
    }
    let key = conditions_key(&index.lookup_selectors("rate-limiter")[0].conditions, &ctx).unwrap();
    let cached = index.cache().get("rate-limiter", &key).unwrap();
    assert_eq!(cached.as_selector().unwrap().match_mode, MatchMode::Or);
}

#[test]
fn late_plugin_caches_under_full_memory_budget() {
    let one = MatchResultCache::default();
    one.put("sizing", "k000", MatchTarget::Selector(Arc::new(SelectorData::new("s", "a", 0))));
    let weight = one.memory_used();

    let cache = MatchResultCache::new(CacheConfig::default().with_memory_ceiling(10 * weight));
    let target = |plugin: &str| MatchTarget::Selector(Arc::new(SelectorData::new("s", plugin, 0)));
    for i in 0..10 {
        cache.put("a", format!("k{i:03}"), target("a"));
    }
    assert_eq!(cache.len("a"), 10);

    for i in 0..5 {
        cache.put("b", format!("k{i:03}"), target("b"));
        assert!(cache.contains("b", &format!("k{i:03}")));
        assert!(cache.memory_used() <= cache.memory_ceiling());
    }
    assert_eq!(cache.len("b"), 5);
    assert_eq!(cache.len("a"), 5);
    // a's oldest went first
    assert!(!cache.contains("a", "k004"));
    assert!(cache.contains("a", "k005"));
    assert_eq!(cache.tracked_total("a"), 5);
}
