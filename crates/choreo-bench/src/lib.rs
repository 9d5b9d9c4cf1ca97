//! Benchmark profiles and utilities for the Choreo scheduler.
//!
//! Provides pre-built stores and schedulers for benchmarking:
//!
//! - [`reference_store`]: a root of `n` labelled organs with the carbon
//!   variables declared
//! - [`reference_scheduler`]: a three-functor carbon family bound to a
//!   reference store
//! - [`shuffled_ids`]: deterministic id permutations via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use choreo_core::{ConfigError, EntityId};
use choreo_schedule::{FamilyConfig, Functor, RegistryError, Scheduler, SchedulerConfig};
use choreo_store::{Attributes, PropertyStore};

/// Family registered by [`reference_scheduler`].
pub const REFERENCE_FAMILY: &str = "Carbon";

/// Compartment the reference store is attached to.
pub const REFERENCE_COMPARTMENT: &str = "root";

/// Error building a benchmark profile.
#[derive(Debug)]
pub enum ProfileError {
    /// Scheduler or family configuration was rejected.
    Config(ConfigError),
    /// A functor registration was rejected.
    Registry(RegistryError),
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "profile config: {e}"),
            Self::Registry(e) => write!(f, "profile registry: {e}"),
        }
    }
}

impl std::error::Error for ProfileError {}

impl From<ConfigError> for ProfileError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RegistryError> for ProfileError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

/// Build a store of `n` organs with ids `1..=n`.
///
/// Every tenth organ is an apex, the rest are segments. `sucrose`,
/// `hexose` and `respiration` are declared per entity.
pub fn reference_store(n: u64) -> PropertyStore {
    let mut store = PropertyStore::new();
    for id in 1..=n {
        let label = if id % 10 == 0 { "Apex" } else { "Segment" };
        let mut attributes = Attributes::new();
        attributes.insert("label".into(), label.into());
        attributes.insert("type".into(), "Normal_root_after_emergence".into());
        // Ids are fresh and ascending, so insertion cannot collide.
        let _ = store.add_entity(EntityId(id), attributes);
    }
    store.declare_per_entity("sucrose", 0.2);
    store.declare_per_entity("hexose", 0.01);
    store.declare_per_entity("respiration", 0.0);
    store
}

/// Build a scheduler running the reference carbon family over a store of
/// `n` organs with three passes per global step.
///
/// Pipeline: unloading (`rate`) → respiration (`rate`) → hexose (`state`).
pub fn reference_scheduler(n: u64) -> Result<Scheduler, ProfileError> {
    let mut scheduler = Scheduler::new(SchedulerConfig {
        global_step: Some(3600),
        ..Default::default()
    })?;
    scheduler.configure_family(
        REFERENCE_FAMILY,
        FamilyConfig::new(1200, REFERENCE_COMPARTMENT),
    )?;
    let mut store = reference_store(n);
    store.declare_per_entity("unloading", 0.0);
    scheduler.attach_store(REFERENCE_COMPARTMENT, store);

    scheduler.register(
        Functor::builder(REFERENCE_FAMILY, "_unloading")
            .inputs(["sucrose"])
            .scalar(|x| 1e-3 * x[0]),
        &["rate"],
    )?;
    scheduler.register(
        Functor::builder(REFERENCE_FAMILY, "_respiration")
            .inputs(["hexose"])
            .scalar(|x| 5e-4 * x[0]),
        &["rate"],
    )?;
    scheduler.register(
        Functor::builder(REFERENCE_FAMILY, "_hexose")
            .inputs(["hexose", "unloading", "respiration"])
            .scalar(|x| (x[0] + x[1] - x[2]).max(0.0)),
        &["state"],
    )?;
    Ok(scheduler)
}

/// Generate a deterministic permutation of ids `1..=n`.
///
/// Fisher-Yates driven by a 64-bit LCG seeded with `seed`.
pub fn shuffled_ids(n: u64, seed: u64) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = (1..=n).map(EntityId).collect();
    let mut state = seed;
    for i in (1..ids.len()).rev() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let j = ((state >> 33) % (i as u64 + 1)) as usize;
        ids.swap(i, j);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_store_labels_every_tenth_organ_as_apex() {
        let store = reference_store(20);
        assert_eq!(store.entity_count(), 20);
        let label = |id| {
            store
                .attributes(EntityId(id))
                .and_then(|a| a.get("label"))
                .cloned()
        };
        assert_eq!(label(10).as_deref(), Some("Apex"));
        assert_eq!(label(11).as_deref(), Some("Segment"));
        assert_eq!(store.get("hexose", EntityId(20)), Some(0.01));
    }

    #[test]
    fn reference_scheduler_runs() {
        let mut scheduler = reference_scheduler(50).unwrap();
        assert_eq!(
            scheduler.schedule_names(REFERENCE_FAMILY),
            vec![vec!["unloading", "respiration"], vec!["hexose"]]
        );
        let metrics = scheduler.run(REFERENCE_FAMILY).unwrap();
        assert_eq!(metrics.passes, 3);
        assert_eq!(metrics.focus_len, 50);
    }

    #[test]
    fn shuffled_ids_is_a_deterministic_permutation() {
        let a = shuffled_ids(1000, 42);
        let b = shuffled_ids(1000, 42);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (1..=1000).map(EntityId).collect::<Vec<_>>());
        assert_ne!(a, sorted);
    }
}
