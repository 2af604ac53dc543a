//! Cached matches skip judge evaluation; configuration changes bring it back.

use waypoint::{DataPlane, DataPlaneConfig, EqualsJudge, JudgeRegistry};
use waypoint_test::prelude::*;

fn plane_with_counter() -> (DataPlane, CountingJudge<EqualsJudge>) {
    let counter = CountingJudge::new(EqualsJudge);
    let judges = JudgeRegistry::with_defaults().with(Operator::Equals, counter.clone());
    let plane = DataPlane::with_judges(DataPlaneConfig::default(), judges);
    plane.apply(ConfigEvent::UpsertPlugin(PluginData::new("rate-limiter")));
    plane.apply(ConfigEvent::UpsertSelector(
        SelectorData::new("s1", "rate-limiter", 1).with_condition(ConditionData::new(
            "c1",
            ParamType::Header,
            Operator::Equals,
            "x-env",
            "prod",
        )),
    ));
    (plane, counter)
}

#[test]
fn repeated_request_is_served_from_cache() {
    let (plane, counter) = plane_with_counter();
    let ctx = TestContext::new().with_param(ParamType::Header, "x-env", "prod");

    for _ in 0..5 {
        assert_eq!(plane.match_selector("rate-limiter", &ctx).unwrap().id, "s1");
    }
    assert_eq!(counter.calls(), 1);
    assert_eq!(plane.cache().stats().snapshot().hits, 4);
}

#[test]
fn misses_are_always_evaluated() {
    let (plane, counter) = plane_with_counter();
    let ctx = TestContext::new().with_param(ParamType::Header, "x-env", "dev");

    for _ in 0..3 {
        assert!(plane.match_selector("rate-limiter", &ctx).is_none());
    }
    assert_eq!(counter.calls(), 3);
}

#[test]
fn update_forces_reevaluation() {
    let (plane, counter) = plane_with_counter();
    let ctx = TestContext::new().with_param(ParamType::Header, "x-env", "prod");

    plane.match_selector("rate-limiter", &ctx);
    plane.apply(ConfigEvent::UpsertSelector(
        SelectorData::new("s1", "rate-limiter", 2).with_condition(ConditionData::new(
            "c1",
            ParamType::Header,
            Operator::Equals,
            "x-env",
            "prod",
        )),
    ));
    let hit = plane.match_selector("rate-limiter", &ctx).unwrap();
    assert_eq!(hit.sort, 2);
    assert_eq!(counter.calls(), 2);
}
