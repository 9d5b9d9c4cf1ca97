//! Component binding for Choreo simulations.
//!
//! A [`Component`] declares its variables and describes its functors in a
//! [`RegistrationTable`]. [`ModelBinding::bind`] wires it into a shared
//! [`Scheduler`](choreo_schedule::Scheduler): scenario overrides,
//! registration, sub-step configuration and store defaulting. Inputs
//! provided by other components are pulled through [`Coupling`] adapters
//! before each step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod binding;
pub mod component;
pub mod coupling;
pub mod error;
pub mod temperature;

pub use binding::{BindingConfig, ModelBinding, Scenario};
pub use component::{Component, RegistrationTable, TableEntry};
pub use coupling::Coupling;
pub use error::BindError;
pub use temperature::TemperatureResponse;
