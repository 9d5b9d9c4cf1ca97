//! Test utilities and fixtures for Choreo development.
//!
//! Provides a [`TestStoreBuilder`] for assembling labelled property
//! stores, a [`scheduler`] shortcut, and the functor fixtures in
//! [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use choreo_core::EntityId;
use choreo_schedule::{FocusFilter, Scheduler, SchedulerConfig};
use choreo_store::{Attributes, PropertyStore};

/// Label used by the default focus filter for living segments.
pub const SEGMENT: &str = "Segment";
/// Label used by the default focus filter for apices.
pub const APEX: &str = "Apex";
/// A `type` value admitted by the default focus filter.
pub const NORMAL_ROOT: &str = "Normal_root_after_emergence";

/// Builder for a [`PropertyStore`] with labelled entities.
pub struct TestStoreBuilder {
    store: PropertyStore,
}

impl TestStoreBuilder {
    pub fn new() -> Self {
        Self {
            store: PropertyStore::new(),
        }
    }

    /// Add an entity with `label` and `type` attributes.
    pub fn entity(mut self, id: u64, label: &str, kind: &str) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("label".into(), label.into());
        attributes.insert("type".into(), kind.into());
        self.store
            .add_entity(EntityId(id), attributes)
            .unwrap_or_else(|e| panic!("fixture entity {id}: {e}"));
        self
    }

    /// Add a living root segment.
    pub fn segment(self, id: u64) -> Self {
        self.entity(id, SEGMENT, NORMAL_ROOT)
    }

    /// Add a growing apex.
    pub fn apex(self, id: u64) -> Self {
        self.entity(id, APEX, NORMAL_ROOT)
    }

    /// Add `ids` as living root segments.
    pub fn segments(self, ids: impl IntoIterator<Item = u64>) -> Self {
        ids.into_iter().fold(self, Self::segment)
    }

    /// Declare a per-entity variable.
    pub fn per_entity(mut self, name: &str, default: f64) -> Self {
        self.store.declare_per_entity(name, default);
        self
    }

    /// Declare an aggregate variable.
    pub fn aggregate(mut self, name: &str, value: f64) -> Self {
        self.store.declare_aggregate(name, value);
        self
    }

    pub fn build(self) -> PropertyStore {
        self.store
    }
}

impl Default for TestStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A scheduler with the default catalogue and filter and `global_step` set.
pub fn scheduler(global_step: u64) -> Scheduler {
    Scheduler::new(SchedulerConfig {
        global_step: Some(global_step),
        ..Default::default()
    })
    .unwrap_or_else(|e| panic!("fixture scheduler: {e}"))
}

/// A scheduler whose focus filter admits every entity.
pub fn unfiltered_scheduler(global_step: u64) -> Scheduler {
    Scheduler::new(SchedulerConfig {
        global_step: Some(global_step),
        filter: FocusFilter::any(),
        ..Default::default()
    })
    .unwrap_or_else(|e| panic!("fixture scheduler: {e}"))
}
