//! Schedule ordering: priority groups, deduplication and inheritance.

use proptest::prelude::*;

use choreo_schedule::{FamilyConfig, Functor, InvocationMode, PriorityVector, StageCatalogue};
use choreo_test_utils::fixtures::{logged_sum, CallLog};
use choreo_test_utils::{scheduler, TestStoreBuilder};

#[test]
fn three_unit_chain_runs_in_stage_order() {
    let log = CallLog::new();
    let mut s = scheduler(3600);
    s.set_catalogue(StageCatalogue::new(vec![vec!["rate", "state"]]).unwrap());

    // Registered out of order on purpose.
    s.register(logged_sum("Chain", "_c", &["b"], &log), &["state"]).unwrap();
    s.register(logged_sum("Chain", "_b", &["a"], &log), &["rate"]).unwrap();
    let a_log = log.clone();
    s.register(
        Functor::builder("Chain", "_a").scalar(move |_| {
            a_log.record("a");
            0.0
        }),
        &["stepinit"],
    )
    .unwrap();

    let store = TestStoreBuilder::new()
        .segments([2, 3, 4])
        .per_entity("a", 1.0)
        .per_entity("b", 0.0)
        .per_entity("c", 0.0)
        .build();
    s.attach_store("root", store);
    s.configure_family("Chain", FamilyConfig::new(3600, "root")).unwrap();
    s.run("Chain").unwrap();

    assert_eq!(s.schedule_names("Chain"), vec![vec!["a"], vec!["b"], vec!["c"]]);
    assert_eq!(log.count("a"), 1);
    assert_eq!(log.runs(), ["a", "b", "c"]);
    assert_eq!(log.count("b"), 3);

    let store = s.store("root").unwrap();
    for id in [2, 3, 4] {
        let id = choreo_core::EntityId(id);
        assert_eq!(store.get("b", id), Some(2.0));
        // c sees b written in the same pass.
        assert_eq!(store.get("c", id), Some(3.0));
    }
}

#[test]
fn repeated_registration_keeps_one_entry_with_all_tags() {
    let log = CallLog::new();
    let mut s = scheduler(60);
    s.register(logged_sum("F", "x", &["x"], &log), &["state"]).unwrap();
    s.register(logged_sum("F", "x", &["x"], &log), &["actual"]).unwrap();

    let groups = s.priority_groups("F");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0.positions(), &[0, 4, 0, 4]);
    assert_eq!(groups[0].1, ["x"]);
}

#[test]
fn child_family_absorbs_parent_units() {
    let log = CallLog::new();
    let mut s = scheduler(60);
    s.register(logged_sum("Base", "shared", &["x"], &log), &["rate"]).unwrap();
    s.register(logged_sum("Base", "only_parent", &["x"], &log), &["state"])
        .unwrap();
    s.register(
        logged_sum("Derived", "shared", &["y"], &log).inherits("Base"),
        &["rate"],
    )
    .unwrap();

    assert!(s.schedule("Base").is_none());
    assert!(!s.registry().contains_family("Base"));
    let names: Vec<String> = s.schedule_names("Derived").into_iter().flatten().collect();
    assert_eq!(names, ["shared", "only_parent"]);
    let shared = s
        .schedule("Derived")
        .unwrap()
        .functors()
        .find(|f| f.name() == "shared")
        .unwrap()
        .clone();
    assert_eq!(shared.inputs(), ["y"]);
}

#[test]
fn positions_past_nine_order_numerically() {
    let row: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();
    let mut s = scheduler(60);
    s.set_catalogue(StageCatalogue::new(vec![row]).unwrap());
    let log = CallLog::new();
    s.register(logged_sum("F", "tenth", &["x"], &log), &["t9"]).unwrap();
    s.register(logged_sum("F", "second", &["x"], &log), &["t1"]).unwrap();
    s.register(logged_sum("F", "twelfth", &["x"], &log), &["t11"]).unwrap();
    assert_eq!(
        s.schedule_names("F"),
        vec![vec!["second"], vec!["tenth"], vec!["twelfth"]]
    );
}

#[test]
fn set_catalogue_reorders_existing_schedules() {
    let log = CallLog::new();
    let mut s = scheduler(60);
    s.register(logged_sum("F", "r", &["x"], &log), &["rate"]).unwrap();
    s.register(logged_sum("F", "st", &["x"], &log), &["state"]).unwrap();
    assert_eq!(s.schedule_names("F"), vec![vec!["r"], vec!["st"]]);
    s.set_catalogue(StageCatalogue::new(vec![vec!["state", "rate"]]).unwrap());
    assert_eq!(s.schedule_names("F"), vec![vec!["st"], vec!["r"]]);
}

proptest! {
    #[test]
    fn groups_are_strictly_ascending(tags in proptest::collection::vec(0usize..14, 1..20)) {
        let log = CallLog::new();
        let mut s = scheduler(60);
        for (i, t) in tags.iter().enumerate() {
            let stage = choreo_schedule::UNIVERSAL_STAGES[*t];
            let unit = logged_sum("P", &format!("u{i}"), &["x"], &log)
                .mode(InvocationMode::PerEntity);
            s.register(unit, &[stage]).unwrap();
        }
        let groups = s.priority_groups("P");
        let priorities: Vec<&PriorityVector> = groups.iter().map(|(p, _)| p).collect();
        prop_assert!(priorities.windows(2).all(|w| w[0] < w[1]));
        let total: usize = groups.iter().map(|(_, names)| names.len()).sum();
        prop_assert_eq!(total, tags.len());
    }
}
