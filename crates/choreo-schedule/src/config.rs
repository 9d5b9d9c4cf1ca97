//! Scheduler configuration and step validation.

use choreo_core::ConfigError;

use crate::catalogue::StageCatalogue;
use crate::filter::FocusFilter;

// ── SchedulerConfig ────────────────────────────────────────────────

/// Builder input for [`Scheduler`](crate::Scheduler).
#[derive(Clone, Debug, Default)]
pub struct SchedulerConfig {
    /// Global simulation step, in seconds. May be set later with
    /// [`Scheduler::set_global_step`](crate::Scheduler::set_global_step).
    pub global_step: Option<u64>,
    /// Stage rows used to order every family.
    pub catalogue: StageCatalogue,
    /// Focus filter applied to every compartment.
    pub filter: FocusFilter,
}

impl SchedulerConfig {
    /// Check structural invariants.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidStep`] for a zero global step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(step) = self.global_step {
            check_step(step)?;
        }
        Ok(())
    }
}

// ── FamilyConfig ───────────────────────────────────────────────────

/// Per-family step settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilyConfig {
    /// Sub-step duration, in seconds. Must divide the global step.
    pub sub_step: u64,
    /// Compartment whose property store the family reads and writes.
    pub compartment: String,
    /// The family changes topology; focus is re-filtered around each step.
    pub structural: bool,
}

impl FamilyConfig {
    /// Settings for a non-structural family in `compartment`.
    pub fn new(sub_step: u64, compartment: impl Into<String>) -> Self {
        Self {
            sub_step,
            compartment: compartment.into(),
            structural: false,
        }
    }

    /// Mark the family as structural.
    pub fn structural(mut self, structural: bool) -> Self {
        self.structural = structural;
        self
    }

    /// Check the sub-step, and its ratio to `global` when known.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidStep`] or [`ConfigError::StepRatio`].
    pub fn validate(&self, global: Option<u64>) -> Result<(), ConfigError> {
        check_step(self.sub_step)?;
        if let Some(global) = global {
            pass_count(global, self.sub_step)?;
        }
        Ok(())
    }
}

// ── Step arithmetic ────────────────────────────────────────────────

/// Reject zero steps.
///
/// # Errors
///
/// [`ConfigError::InvalidStep`] when `value == 0`.
pub fn check_step(value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidStep { value })
    } else {
        Ok(value)
    }
}

/// Number of sub-step passes per global step.
///
/// # Errors
///
/// [`ConfigError::InvalidStep`] for a zero step, or
/// [`ConfigError::StepRatio`] when `sub_step` does not divide `global`.
pub fn pass_count(global: u64, sub_step: u64) -> Result<u64, ConfigError> {
    check_step(global)?;
    check_step(sub_step)?;
    if global % sub_step != 0 {
        return Err(ConfigError::StepRatio { global, sub_step });
    }
    Ok(global / sub_step)
}
