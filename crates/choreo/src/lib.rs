//! Choreo: a phased, multi-rate execution scheduler over sorted per-entity
//! property stores.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Choreo sub-crates. For most users, adding `choreo` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use choreo::prelude::*;
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig {
//!     global_step: Some(3600),
//!     filter: FocusFilter::any(),
//!     ..Default::default()
//! })
//! .unwrap();
//! scheduler
//!     .configure_family("Carbon", FamilyConfig::new(1200, "root"))
//!     .unwrap();
//!
//! let mut store = PropertyStore::new();
//! store.add_entity(EntityId(1), Attributes::new()).unwrap();
//! store.declare_per_entity("hexose", 1.0);
//! scheduler.attach_store("root", store);
//!
//! // Halve hexose on every sub-step.
//! scheduler
//!     .register(
//!         Functor::builder("Carbon", "_hexose")
//!             .inputs(["hexose"])
//!             .scalar(|x| x[0] * 0.5),
//!         &["state"],
//!     )
//!     .unwrap();
//!
//! let metrics = scheduler.run("Carbon").unwrap();
//! assert_eq!(metrics.passes, 3);
//! let store = scheduler.store("root").unwrap();
//! assert_eq!(store.get("hexose", EntityId(1)), Some(0.125));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `choreo-core` | Ids, variable declarations, error types |
//! | [`store`] | `choreo-store` | `SortedArrayMap` and `PropertyStore` |
//! | [`schedule`] | `choreo-schedule` | Functors, stage registry, ordering, scheduler |
//! | [`model`] | `choreo-model` | Components, bindings, couplings |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and declarations (`choreo-core`).
///
/// Contains [`types::EntityId`], [`types::VariableDecl`] and the error
/// types shared by every crate.
pub use choreo_core as types;

/// Sorted per-entity storage (`choreo-store`).
///
/// [`store::SortedArrayMap`] is the column layout; [`store::PropertyStore`]
/// groups columns with the entity registry.
pub use choreo_store as store;

/// Stage registration, ordering and execution (`choreo-schedule`).
///
/// [`schedule::Scheduler`] owns the registry, the cached schedules and the
/// compartment stores.
pub use choreo_schedule as schedule;

/// Component binding (`choreo-model`).
///
/// Implement [`model::Component`] and wire it in with
/// [`model::ModelBinding::bind`].
pub use choreo_model as model;

/// Common imports for typical Choreo usage.
///
/// ```rust
/// use choreo::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use choreo_core::{EntityId, StateKind, VariableDecl, VariableKind};

    // Errors
    pub use choreo_core::{ConfigError, FunctorError, StepError};
    pub use choreo_schedule::RegistryError;

    // Store
    pub use choreo_store::{Attributes, PropertyStore, SortedArrayMap};

    // Scheduling
    pub use choreo_schedule::{
        FamilyConfig, FocusFilter, Functor, InvocationMode, PriorityVector, SchedulerConfig,
        Scheduler, StageCatalogue, StepMetrics, SweepContext,
    };

    // Components
    pub use choreo_model::{
        BindError, BindingConfig, Component, Coupling, ModelBinding, RegistrationTable, Scenario,
    };
}
