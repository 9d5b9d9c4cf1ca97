//! Stage-tagged functor scheduling for Choreo simulations.
//!
//! Models register [`Functor`]s under stage tags. For each module family
//! the [`Scheduler`] builds a [`Schedule`]: functors grouped by
//! [`PriorityVector`] and run in ascending order, so that a value written
//! by an earlier group is visible to every later group within one pass.
//!
//! ```text
//! register ──▶ StageRegistry ──▶ Schedule (per family) ──▶ run(family)
//!               stage → family      BTreeMap<PriorityVector, [Functor]>
//! ```
//!
//! Each [`Scheduler::run`] call refreshes the compartment's focus set,
//! then executes `global_step / sub_step` passes over the schedule.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalogue;
pub mod config;
pub mod filter;
pub mod functor;
pub mod metrics;
pub mod plan;
pub mod priority;
pub mod registry;
pub mod scheduler;

pub use catalogue::{implied_mode, CatalogueError, StageCatalogue, UNIVERSAL_STAGES};
pub use config::{pass_count, FamilyConfig, SchedulerConfig};
pub use filter::FocusFilter;
pub use functor::{Functor, FunctorBuildError, FunctorBuilder, InvocationMode, SweepContext};
pub use metrics::StepMetrics;
pub use plan::{Schedule, ScheduleGroup};
pub use priority::PriorityVector;
pub use registry::{RegistryError, StageRegistry};
pub use scheduler::{Scheduler, SchedulerPhase};
