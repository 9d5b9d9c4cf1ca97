//! Core types for the Choreo scheduler.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the store, the scheduler and the model
//! bindings: entity identifiers, variable declarations and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod variable;

pub use error::{ConfigError, FunctorError, StepError};
pub use id::{EntityId, InputNames};
pub use variable::{StateKind, VariableDecl, VariableKind};
