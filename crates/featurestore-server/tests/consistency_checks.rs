mod common;

use common::harness;
use featurestore_core::{EntityKey, FeatureValue};
use featurestore_server::ConsistencyChecker;

fn names(features: &[&str]) -> Vec<String> {
    features.iter().map(|f| f.to_string()).collect()
}

#[tokio::test]
async fn compares_decoded_values_per_feature() {
    let h = harness();
    h.remote.put("42", "age", "31");
    h.offline.put("42", "user", "age", " 31 ");
    h.remote.put("42", "country", "\"US\"");
    h.offline.put("42", "user", "country", "\"DE\"");
    h.offline.put("42", "user", "score", "0.5");

    let checker = ConsistencyChecker::from_resolver(&h.resolver);
    let entity = EntityKey::new("user", "42");
    let checks = checker
        .check_entity(&entity, &names(&["age", "country", "score", "missing"]))
        .await
        .expect("both tiers answer");

    assert_eq!(checks.len(), 4);

    assert_eq!(checks[0].feature_name, "age");
    assert_eq!(checks[0].online, Some(FeatureValue::Number(31.into())));
    assert!(checks[0].consistent);

    assert_eq!(checks[1].online, Some(FeatureValue::String("US".into())));
    assert_eq!(checks[1].offline, Some(FeatureValue::String("DE".into())));
    assert!(!checks[1].consistent);

    // Only computed offline
    assert_eq!(checks[2].online, None);
    assert!(!checks[2].consistent);

    // Absent everywhere
    assert_eq!(checks[3].online, None);
    assert_eq!(checks[3].offline, None);
    assert!(checks[3].consistent);

    // One batched remote lookup, one offline lookup per name
    assert_eq!(h.remote.calls(), 1);
    assert_eq!(h.offline.looked_up(), names(&["age", "country", "score", "missing"]));
}

#[tokio::test]
async fn report_summarizes_every_entity() {
    let h = harness();
    for id in ["1", "2", "3"] {
        h.remote.put(id, "clicks", "10");
        h.offline.put(id, "user", "clicks", "10");
    }
    h.offline.put("3", "user", "clicks", "11");

    let checker = ConsistencyChecker::from_resolver(&h.resolver);
    let entities: Vec<_> = ["1", "2", "3"]
        .into_iter()
        .map(|id| EntityKey::new("user", id))
        .collect();
    let report = checker
        .check_many(&entities, &names(&["clicks", "clicks"]))
        .await
        .expect("report");

    assert_eq!(report.total_checks, 3, "duplicate names are checked once");
    assert_eq!(report.consistent, 2);
    assert_eq!(report.inconsistent, 1);
    assert!((report.consistency_rate - 2.0 / 3.0).abs() < 1e-9);
    let inconsistent: Vec<_> = report
        .results
        .iter()
        .filter(|c| !c.consistent)
        .map(|c| c.entity_id.as_str())
        .collect();
    assert_eq!(inconsistent, vec!["3"]);
}

#[tokio::test]
async fn checks_bypass_the_local_cache() {
    let h = harness();
    h.remote.put("7", "age", "20");
    h.offline.put("7", "user", "age", "20");

    let request = featurestore_core::FeatureRequest::new(EntityKey::new("user", "7"), ["age"]);
    h.resolver.resolve(&request).await.expect("resolves");
    h.remote.put("7", "age", "21");

    let checker = ConsistencyChecker::from_resolver(&h.resolver);
    let checks = checker
        .check_entity(&EntityKey::new("user", "7"), &names(&["age"]))
        .await
        .expect("check");
    assert_eq!(checks[0].online, Some(FeatureValue::Number(21.into())));
    assert!(!checks[0].consistent);
    assert_eq!(h.resolver.local_cache().size(), 1);
}

#[tokio::test]
async fn tier_failures_fail_the_check() {
    let h = harness();
    let checker = ConsistencyChecker::from_resolver(&h.resolver);
    let entity = EntityKey::new("user", "1");

    h.offline.fail_feature("age");
    let err = checker
        .check_entity(&entity, &names(&["age"]))
        .await
        .expect_err("offline lookup fails");
    assert_eq!(err.tier(), "offline");

    h.remote.set_down(true);
    let err = checker
        .check_entity(&entity, &names(&["age"]))
        .await
        .expect_err("remote down");
    assert_eq!(err.tier(), "remote");
}
