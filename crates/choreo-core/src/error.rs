//! Error types shared across the Choreo workspace.
//!
//! Organised by subsystem: configuration (steps, families, compartments),
//! step execution, and individual computation units.

use std::error::Error;
use std::fmt;

use crate::id::EntityId;

/// Configuration errors. Always fatal: a scheduler with inconsistent
/// step settings cannot produce a correct run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A family was stepped before the global step was configured.
    StepsNotConfigured,
    /// A family was stepped before its sub-step was configured.
    SubStepNotConfigured {
        /// The family being stepped.
        family: String,
    },
    /// A step duration of zero was supplied.
    InvalidStep {
        /// The offending value.
        value: u64,
    },
    /// The family sub-step does not divide the global step exactly.
    StepRatio {
        /// Global simulation step.
        global: u64,
        /// Family sub-step.
        sub_step: u64,
    },
    /// No functor has been registered for the family.
    UnknownFamily {
        /// The family name.
        family: String,
    },
    /// No property store is attached under the compartment.
    UnknownCompartment {
        /// The compartment name.
        compartment: String,
    },
    /// A variable declaration or binding setting is malformed.
    InvalidDeclaration {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepsNotConfigured => write!(f, "global simulation step is not configured"),
            Self::SubStepNotConfigured { family } => {
                write!(f, "sub-step of family '{family}' is not configured")
            }
            Self::InvalidStep { value } => write!(f, "step must be positive, got {value}"),
            Self::StepRatio { global, sub_step } => write!(
                f,
                "sub-step {sub_step} does not evenly divide global step {global}"
            ),
            Self::UnknownFamily { family } => write!(f, "unknown module family '{family}'"),
            Self::UnknownCompartment { compartment } => {
                write!(f, "no property store attached to compartment '{compartment}'")
            }
            Self::InvalidDeclaration { reason } => write!(f, "invalid declaration: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Errors raised by a computation unit itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctorError {
    /// The unit failed to execute.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A user-defined constraint was violated.
    ConstraintViolation {
        /// Description of the violated constraint.
        constraint: String,
    },
}

impl fmt::Display for FunctorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::ConstraintViolation { constraint } => {
                write!(f, "constraint violation: {constraint}")
            }
        }
    }
}

impl Error for FunctorError {}

/// Errors from one family step.
///
/// None are retried: a step either completes or the run is aborted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// The scheduler is not configured for this family.
    Configuration(ConfigError),
    /// A declared input or output is absent from the store at call time.
    MissingDependency {
        /// Name of the functor being invoked.
        functor: String,
        /// The missing variable.
        variable: String,
        /// The entity lacking a value, when the variable exists.
        entity: Option<EntityId>,
    },
    /// A functor returned an error.
    FunctorFailed {
        /// Name of the failing functor.
        name: String,
        /// The underlying error.
        reason: FunctorError,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "configuration: {e}"),
            Self::MissingDependency {
                functor,
                variable,
                entity,
            } => {
                write!(f, "functor '{functor}' depends on missing variable '{variable}'")?;
                if let Some(id) = entity {
                    write!(f, " at entity {id}")?;
                }
                Ok(())
            }
            Self::FunctorFailed { name, reason } => write!(f, "functor '{name}' failed: {reason}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::FunctorFailed { reason, .. } => Some(reason),
            Self::MissingDependency { .. } => None,
        }
    }
}

impl From<ConfigError> for StepError {
    fn from(e: ConfigError) -> Self {
        Self::Configuration(e)
    }
}
