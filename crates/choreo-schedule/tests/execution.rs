//! Stepped execution: passes, focus sets, modes and failures.

use choreo_core::{ConfigError, EntityId, StepError};
use choreo_schedule::{FamilyConfig, Functor, FunctorBuildError, InvocationMode, RegistryError};
use choreo_store::Attributes;
use choreo_test_utils::fixtures::{fill_focus, logged_sum, CallLog, FailAfter};
use choreo_test_utils::{
    scheduler, unfiltered_scheduler, TestStoreBuilder, APEX, NORMAL_ROOT, SEGMENT,
};

#[test]
fn hourly_step_with_twenty_minute_sub_step_runs_three_passes() {
    let log = CallLog::new();
    let mut s = scheduler(3600);
    s.register(logged_sum("Water", "_flux", &["flux"], &log), &["rate"])
        .unwrap();
    s.attach_store("root", TestStoreBuilder::new().segment(2).per_entity("flux", 0.0).build());
    s.configure_family("Water", FamilyConfig::new(1200, "root")).unwrap();

    let metrics = s.run("Water").unwrap();
    assert_eq!(metrics.passes, 3);
    assert_eq!(metrics.invocations, 3);
    assert_eq!(log.count("flux"), 3);
    // Each pass reads the previous pass's output.
    assert_eq!(s.store("root").unwrap().get("flux", EntityId(2)), Some(3.0));
}

#[test]
fn inexact_sub_step_is_fatal() {
    let mut s = scheduler(3600);
    let err = s
        .configure_family("Water", FamilyConfig::new(700, "root"))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::StepRatio {
            global: 3600,
            sub_step: 700
        }
    );
}

#[test]
fn focus_excludes_dead_organs_whatever_the_order() {
    let log = CallLog::new();
    let mut s = scheduler(60);
    s.register(logged_sum("Carbon", "hexose", &["hexose"], &log), &["state"])
        .unwrap();
    let store = TestStoreBuilder::new()
        .entity(7, "Dead", NORMAL_ROOT)
        .entity(3, APEX, NORMAL_ROOT)
        .entity(5, SEGMENT, NORMAL_ROOT)
        .entity(1, "Dead", NORMAL_ROOT)
        .per_entity("hexose", 0.0)
        .build();
    s.attach_store("root", store);
    s.configure_family("Carbon", FamilyConfig::new(60, "root")).unwrap();
    s.run("Carbon").unwrap();

    assert_eq!(s.focus_elements("root").unwrap(), [EntityId(3), EntityId(5)]);
    let store = s.store("root").unwrap();
    assert_eq!(store.get("hexose", EntityId(3)), Some(1.0));
    assert_eq!(store.get("hexose", EntityId(7)), Some(0.0));
}

#[test]
fn total_units_work_on_aggregate_values() {
    let mut s = scheduler(60);
    s.register(
        Functor::builder("Carbon", "_total_hexose")
            .inputs(["total_hexose", "uptake"])
            .scalar(|a| a[0] + a[1]),
        &["totalstate"],
    )
    .unwrap();
    let f = s.schedule("Carbon").unwrap().functors().next().unwrap().clone();
    assert_eq!(f.mode(), InvocationMode::Total);

    s.attach_store(
        "root",
        TestStoreBuilder::new()
            .segment(2)
            .aggregate("total_hexose", 1.0)
            .aggregate("uptake", 0.5)
            .build(),
    );
    s.configure_family("Carbon", FamilyConfig::new(30, "root")).unwrap();
    s.run("Carbon").unwrap();
    assert_eq!(s.store("root").unwrap().aggregate("total_hexose"), Some(2.0));
}

#[test]
fn total_unit_fails_on_a_per_entity_input() {
    let mut s = unfiltered_scheduler(60);
    s.register(
        Functor::builder("Carbon", "_total_hexose")
            .inputs(["hexose"])
            .scalar(|a| a[0]),
        &["totalstate"],
    )
    .unwrap();
    let mut store = TestStoreBuilder::new()
        .segments([1, 2])
        .apex(3)
        .per_entity("hexose", 0.0)
        .aggregate("total_hexose", 0.0)
        .build();
    // Entity 1 shares the aggregate id; its value must not be read.
    store.set("hexose", EntityId(1), 7.0).unwrap();
    store.set("hexose", EntityId(2), 100.0).unwrap();
    s.attach_store("root", store);
    s.configure_family("Carbon", FamilyConfig::new(60, "root")).unwrap();

    assert_eq!(
        s.run("Carbon").unwrap_err(),
        StepError::MissingDependency {
            functor: "total_hexose".into(),
            variable: "hexose".into(),
            entity: None,
        }
    );
    assert_eq!(s.store("root").unwrap().aggregate("total_hexose"), Some(0.0));
}

#[test]
fn total_unit_fails_on_a_per_entity_output() {
    let mut s = unfiltered_scheduler(60);
    s.register(
        Functor::builder("Carbon", "_pool")
            .inputs(["supply"])
            .scalar(|a| a[0]),
        &["totalrate"],
    )
    .unwrap();
    s.attach_store(
        "root",
        TestStoreBuilder::new()
            .segment(1)
            .aggregate("supply", 2.0)
            .per_entity("pool", 0.0)
            .build(),
    );
    s.configure_family("Carbon", FamilyConfig::new(60, "root")).unwrap();
    assert!(matches!(
        s.run("Carbon"),
        Err(StepError::MissingDependency { ref variable, .. }) if variable == "pool"
    ));
    assert_eq!(s.store("root").unwrap().get("pool", EntityId(1)), Some(0.0));
}

#[test]
fn scalar_unit_with_inputs_is_refused_under_an_iterating_stage() {
    let mut s = scheduler(60);
    let err = s
        .register(
            Functor::builder("F", "_x").inputs(["y"]).scalar(|a| a[0] + 1.0),
            &["stepinit"],
        )
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::InvalidFunctor(FunctorBuildError::ModeMismatch {
            name: "x".into(),
            mode: InvocationMode::Iterating,
        })
    );
    assert!(s.schedule("F").is_none());
}

#[test]
fn missing_input_aborts_the_step() {
    let log = CallLog::new();
    let mut s = scheduler(60);
    s.register(logged_sum("Carbon", "hexose", &["sucrose"], &log), &["state"])
        .unwrap();
    s.attach_store("root", TestStoreBuilder::new().segment(2).per_entity("hexose", 0.0).build());
    s.configure_family("Carbon", FamilyConfig::new(60, "root")).unwrap();
    let err = s.run("Carbon").unwrap_err();
    assert_eq!(
        err,
        StepError::MissingDependency {
            functor: "hexose".into(),
            variable: "sucrose".into(),
            entity: None,
        }
    );
    assert!(log.entries().is_empty());
    assert_eq!(s.steps_run(), 0);
}

#[test]
fn failing_unit_stops_later_groups() {
    let log = CallLog::new();
    let fail = FailAfter::new(1);
    let mut s = scheduler(120);
    s.register(fail.builder("Carbon", "_guard"), &["stepinit"]).unwrap();
    s.register(logged_sum("Carbon", "hexose", &["hexose"], &log), &["state"])
        .unwrap();
    s.attach_store("root", TestStoreBuilder::new().segment(2).per_entity("hexose", 0.0).build());
    s.configure_family("Carbon", FamilyConfig::new(60, "root")).unwrap();

    let err = s.run("Carbon").unwrap_err();
    assert!(matches!(err, StepError::FunctorFailed { ref name, .. } if name == "guard"));
    assert_eq!(fail.calls(), 2);
    // Only the first pass reached the state unit.
    assert_eq!(log.count("hexose"), 1);
}

#[test]
fn structural_family_refilters_after_growth() {
    let mut s = scheduler(60);
    s.register(
        Functor::builder("RootGrowth", "_segmentation").sweep(|ctx| {
            let store = ctx.store_mut();
            let next = store.entity_ids().last().map_or(1, |id| id.0 + 1);
            let mut attrs = Attributes::new();
            attrs.insert("label".into(), APEX.into());
            attrs.insert("type".into(), NORMAL_ROOT.into());
            store.add_entity(EntityId(next), attrs)?;
            Ok(())
        }),
        &["segmentation"],
    )
    .unwrap();
    s.attach_store("root", TestStoreBuilder::new().segment(1).build());
    s.configure_family(
        "RootGrowth",
        FamilyConfig::new(60, "root").structural(true),
    )
    .unwrap();

    let metrics = s.run("RootGrowth").unwrap();
    assert_eq!(metrics.focus_len, 1);
    assert_eq!(s.focus_elements("root").unwrap(), [EntityId(1), EntityId(2)]);
}

#[test]
fn sweep_units_see_the_focus_set() {
    let mut s = scheduler(60);
    s.register(fill_focus("Soil", "_reset", "conc", 4.0), &["priorbalance"])
        .unwrap();
    let store = TestStoreBuilder::new()
        .segment(2)
        .entity(3, "Dead", NORMAL_ROOT)
        .per_entity("conc", 0.0)
        .build();
    s.attach_store("root", store);
    s.configure_family("Soil", FamilyConfig::new(60, "root")).unwrap();
    s.run("Soil").unwrap();
    let store = s.store("root").unwrap();
    assert_eq!(store.get("conc", EntityId(2)), Some(4.0));
    assert_eq!(store.get("conc", EntityId(3)), Some(0.0));
}

#[test]
fn families_share_a_compartment_store() {
    let log = CallLog::new();
    let mut s = scheduler(60);
    s.register(logged_sum("A", "x", &["y"], &log), &["rate"]).unwrap();
    s.register(logged_sum("B", "y", &["x"], &log), &["rate"]).unwrap();
    s.attach_store(
        "root",
        TestStoreBuilder::new().segment(2).per_entity("x", 0.0).per_entity("y", 0.0).build(),
    );
    // The second store is ignored.
    s.attach_store("root", TestStoreBuilder::new().build());
    s.configure_family("A", FamilyConfig::new(60, "root")).unwrap();
    s.configure_family("B", FamilyConfig::new(60, "root")).unwrap();
    s.run("A").unwrap();
    s.run("B").unwrap();
    let store = s.detach_store("root").unwrap();
    assert_eq!(store.get("x", EntityId(2)), Some(1.0));
    assert_eq!(store.get("y", EntityId(2)), Some(2.0));
    assert!(matches!(
        s.run("A"),
        Err(StepError::Configuration(ConfigError::UnknownCompartment { .. }))
    ));
}
