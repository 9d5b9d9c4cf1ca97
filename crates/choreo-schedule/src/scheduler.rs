//! The [`Scheduler`]: registration, schedule caching and stepped execution.
//!
//! One scheduler is an explicit context shared by every model of a
//! simulation. Models register functors into it, attach their compartment
//! stores, configure their sub-steps, and then drive their family with
//! [`Scheduler::run`] once per global step.
//!
//! # Lifecycle
//!
//! ```text
//! Unconfigured ──set_global_step──▶ Configured ──add_process──▶ Scheduled ──run──▶ Running
//!       ▲                                                                            │
//!       └──────────────────────────────── reset ─────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, info, trace};

use choreo_core::{ConfigError, EntityId, StepError};
use choreo_store::PropertyStore;

use crate::catalogue::StageCatalogue;
use crate::config::{check_step, pass_count, FamilyConfig, SchedulerConfig};
use crate::filter::FocusFilter;
use crate::functor::{Functor, FunctorBuilder};
use crate::metrics::StepMetrics;
use crate::plan::Schedule;
use crate::priority::PriorityVector;
use crate::registry::{RegistryError, StageRegistry};

/// Coarse scheduler state, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No global step yet.
    Unconfigured,
    /// Global step set, nothing registered.
    Configured,
    /// At least one family has a schedule.
    Scheduled,
    /// At least one family step has completed.
    Running,
}

struct Compartment {
    store: PropertyStore,
    focus: Vec<EntityId>,
    focus_epoch: Option<u64>,
}

impl Compartment {
    fn new(store: PropertyStore) -> Self {
        Self {
            store,
            focus: Vec::new(),
            focus_epoch: None,
        }
    }

    /// Re-filter when forced, on first use, or after a structural change.
    fn refresh_focus(&mut self, filter: &FocusFilter, force: bool) -> bool {
        let epoch = self.store.epoch();
        if !force && self.focus_epoch == Some(epoch) {
            return false;
        }
        self.focus = filter.select(&self.store);
        self.focus_epoch = Some(epoch);
        true
    }
}

/// Registry of functors per family and stage, with cached schedules and
/// the compartment stores they run against.
pub struct Scheduler {
    catalogue: StageCatalogue,
    filter: FocusFilter,
    global_step: Option<u64>,
    registry: StageRegistry,
    schedules: IndexMap<String, Schedule>,
    families: IndexMap<String, FamilyConfig>,
    compartments: IndexMap<String, Compartment>,
    steps_run: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::from_parts(SchedulerConfig::default())
    }
}

impl Scheduler {
    /// Create a scheduler from a validated configuration.
    ///
    /// # Errors
    ///
    /// Propagates [`SchedulerConfig::validate`] failures.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: SchedulerConfig) -> Self {
        let mut registry = StageRegistry::new();
        for stage in config.catalogue.stages() {
            registry.ensure_stage(stage);
        }
        Self {
            catalogue: config.catalogue,
            filter: config.filter,
            global_step: config.global_step,
            registry,
            schedules: IndexMap::new(),
            families: IndexMap::new(),
            compartments: IndexMap::new(),
            steps_run: 0,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SchedulerPhase {
        if self.global_step.is_none() {
            SchedulerPhase::Unconfigured
        } else if self.steps_run > 0 {
            SchedulerPhase::Running
        } else if self.schedules.values().any(|s| !s.is_empty()) {
            SchedulerPhase::Scheduled
        } else {
            SchedulerPhase::Configured
        }
    }

    // ── Configuration ──────────────────────────────────────────────

    /// Set the global simulation step, in seconds.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidStep`] for zero, or [`ConfigError::StepRatio`]
    /// if an already configured family sub-step would no longer divide it.
    pub fn set_global_step(&mut self, step: u64) -> Result<(), ConfigError> {
        check_step(step)?;
        for family in self.families.values() {
            pass_count(step, family.sub_step)?;
        }
        self.global_step = Some(step);
        debug!(global_step = step, "global step set");
        Ok(())
    }

    /// Global simulation step, if set.
    pub fn global_step(&self) -> Option<u64> {
        self.global_step
    }

    /// Replace the stage catalogue and rebuild every cached schedule.
    pub fn set_catalogue(&mut self, catalogue: StageCatalogue) {
        for stage in catalogue.stages() {
            self.registry.ensure_stage(stage);
        }
        self.catalogue = catalogue;
        let families: Vec<String> = self.schedules.keys().cloned().collect();
        for family in families {
            self.rebuild(&family);
        }
        debug!(rows = self.catalogue.row_count(), "stage catalogue replaced");
    }

    /// Active stage catalogue.
    pub fn catalogue(&self) -> &StageCatalogue {
        &self.catalogue
    }

    /// Replace the focus filter. Focus sets are recomputed on next use.
    pub fn set_filter(&mut self, filter: FocusFilter) {
        self.filter = filter;
        for compartment in self.compartments.values_mut() {
            compartment.focus_epoch = None;
        }
    }

    /// Active focus filter.
    pub fn filter(&self) -> &FocusFilter {
        &self.filter
    }

    /// Record the step settings of `family`.
    ///
    /// # Errors
    ///
    /// Propagates [`FamilyConfig::validate`] against the current global
    /// step.
    pub fn configure_family(
        &mut self,
        family: impl Into<String>,
        config: FamilyConfig,
    ) -> Result<(), ConfigError> {
        config.validate(self.global_step)?;
        let family = family.into();
        debug!(
            family = family.as_str(),
            sub_step = config.sub_step,
            compartment = config.compartment.as_str(),
            structural = config.structural,
            "family configured"
        );
        self.families.insert(family, config);
        Ok(())
    }

    /// Step settings of `family`, if configured.
    pub fn family_config(&self, family: &str) -> Option<&FamilyConfig> {
        self.families.get(family)
    }

    /// Attach the property store for `compartment`.
    ///
    /// The first store attached to a compartment is kept; later calls are
    /// ignored and return `false`, so every model in a compartment shares
    /// one store.
    pub fn attach_store(&mut self, compartment: impl Into<String>, store: PropertyStore) -> bool {
        let compartment = compartment.into();
        if self.compartments.contains_key(&compartment) {
            trace!(compartment = compartment.as_str(), "store already attached");
            return false;
        }
        debug!(
            compartment = compartment.as_str(),
            entities = store.entity_count(),
            "store attached"
        );
        self.compartments.insert(compartment, Compartment::new(store));
        true
    }

    /// Shared store of `compartment`.
    pub fn store(&self, compartment: &str) -> Option<&PropertyStore> {
        self.compartments.get(compartment).map(|c| &c.store)
    }

    /// Mutable shared store of `compartment`.
    pub fn store_mut(&mut self, compartment: &str) -> Option<&mut PropertyStore> {
        self.compartments.get_mut(compartment).map(|c| &mut c.store)
    }

    /// Detach and return the store of `compartment`.
    pub fn detach_store(&mut self, compartment: &str) -> Option<PropertyStore> {
        self.compartments.shift_remove(compartment).map(|c| c.store)
    }

    /// Focus set of `compartment` as last computed.
    pub fn focus_elements(&self, compartment: &str) -> Option<&[EntityId]> {
        self.compartments
            .get(compartment)
            .map(|c| c.focus.as_slice())
    }

    /// Bring the focus set of `compartment` up to date and return it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownCompartment`] if no store is attached.
    pub fn refresh_focus(&mut self, compartment: &str) -> Result<&[EntityId], ConfigError> {
        let c = self
            .compartments
            .get_mut(compartment)
            .ok_or_else(|| ConfigError::UnknownCompartment {
                compartment: compartment.to_string(),
            })?;
        c.refresh_focus(&self.filter, false);
        Ok(&c.focus)
    }

    // ── Registration ───────────────────────────────────────────────

    /// Register `functor` under `stage` and rebuild its family's schedule.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownStage`] if `stage` is neither universal nor
    /// in the catalogue.
    pub fn add_process(&mut self, functor: Arc<Functor>, stage: &str) -> Result<(), RegistryError> {
        let family = functor.family().to_string();
        let name = functor.name().to_string();
        let outcome = self.registry.add(functor, stage)?;
        for parent in &outcome.absorbed {
            self.schedules.shift_remove(parent);
        }
        trace!(
            family = family.as_str(),
            functor = name.as_str(),
            stage,
            replaced = outcome.replaced,
            "functor registered"
        );
        self.rebuild(&family);
        Ok(())
    }

    /// Build a functor for `stages` and register it under each.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidFunctor`] if the builder rejects its
    /// settings, or [`RegistryError::UnknownStage`].
    pub fn register(
        &mut self,
        builder: FunctorBuilder,
        stages: &[&str],
    ) -> Result<Arc<Functor>, RegistryError> {
        let functor = Arc::new(builder.build_for(stages)?);
        if let Some(stage) = stages.iter().find(|s| !self.registry.has_stage(s)) {
            return Err(RegistryError::UnknownStage {
                stage: stage.to_string(),
                functor: functor.name().to_string(),
            });
        }
        for stage in stages {
            self.add_process(Arc::clone(&functor), stage)?;
        }
        Ok(functor)
    }

    fn rebuild(&mut self, family: &str) {
        let schedule = Schedule::build(&self.registry, &self.catalogue, family);
        debug!(
            family,
            groups = schedule.len(),
            functors = schedule.functor_count(),
            "schedule built"
        );
        self.schedules.insert(family.to_string(), schedule);
    }

    // ── Introspection ──────────────────────────────────────────────

    /// Cached schedule of `family`.
    pub fn schedule(&self, family: &str) -> Option<&Schedule> {
        self.schedules.get(family)
    }

    /// Functor names of `family`, group by group in execution order.
    pub fn schedule_names(&self, family: &str) -> Vec<Vec<String>> {
        self.schedules
            .get(family)
            .map(Schedule::names)
            .unwrap_or_default()
    }

    /// Priority vector and member names of each group of `family`.
    pub fn priority_groups(&self, family: &str) -> Vec<(PriorityVector, Vec<String>)> {
        self.schedules
            .get(family)
            .map(|s| {
                s.groups()
                    .iter()
                    .map(|g| {
                        (
                            g.priority().clone(),
                            g.functors().iter().map(|f| f.name().to_string()).collect(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Families with a cached schedule.
    pub fn families(&self) -> impl Iterator<Item = &str> + '_ {
        self.schedules.keys().map(String::as_str)
    }

    /// The underlying stage buckets.
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Family steps completed since construction or the last reset.
    pub fn steps_run(&self) -> u64 {
        self.steps_run
    }

    // ── Execution ──────────────────────────────────────────────────

    /// Run one global step of `family`: `global / sub_step` passes over its
    /// schedule.
    ///
    /// Functors run group by group in ascending priority; each sees the
    /// values written by every functor before it in the same pass.
    ///
    /// # Errors
    ///
    /// [`StepError::Configuration`] if the global step, the family or its
    /// compartment store is missing, or the step ratio is inexact. The
    /// first functor error aborts the step; earlier writes are kept.
    pub fn run(&mut self, family: &str) -> Result<StepMetrics, StepError> {
        let started = Instant::now();
        let global = self.global_step.ok_or(ConfigError::StepsNotConfigured)?;
        let config = self
            .families
            .get(family)
            .ok_or_else(|| ConfigError::SubStepNotConfigured {
                family: family.to_string(),
            })?;
        let passes = pass_count(global, config.sub_step)?;
        let schedule = self
            .schedules
            .get(family)
            .ok_or_else(|| ConfigError::UnknownFamily {
                family: family.to_string(),
            })?;
        let compartment = self
            .compartments
            .get_mut(&config.compartment)
            .ok_or_else(|| ConfigError::UnknownCompartment {
                compartment: config.compartment.clone(),
            })?;

        if compartment.refresh_focus(&self.filter, config.structural) {
            trace!(family, focus = compartment.focus.len(), "focus refreshed");
        }

        let mut metrics = StepMetrics {
            passes,
            focus_len: compartment.focus.len(),
            ..StepMetrics::default()
        };
        let mut functor_us: IndexMap<&str, u64> = IndexMap::new();
        for pass in 0..passes {
            trace!(family, pass, "pass started");
            for group in schedule.groups() {
                for functor in group.functors() {
                    let t = Instant::now();
                    let calls = functor.invoke(&mut compartment.store, &compartment.focus)?;
                    metrics.invocations += calls as u64;
                    *functor_us.entry(functor.name()).or_default() +=
                        t.elapsed().as_micros() as u64;
                }
            }
        }

        if config.structural && compartment.refresh_focus(&self.filter, true) {
            trace!(family, focus = compartment.focus.len(), "focus re-filtered after growth");
        }

        metrics.functor_us = functor_us
            .into_iter()
            .map(|(name, us)| (name.to_string(), us))
            .collect();
        metrics.total_us = started.elapsed().as_micros() as u64;
        self.steps_run += 1;
        info!(
            family,
            passes = metrics.passes,
            invocations = metrics.invocations,
            focus = metrics.focus_len,
            total_us = metrics.total_us,
            "family step complete"
        );
        Ok(metrics)
    }

    /// Drop every registration, schedule, family setting and store.
    ///
    /// The catalogue and filter are kept; the global step must be set
    /// again.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.schedules.clear();
        self.families.clear();
        self.compartments.clear();
        self.global_step = None;
        self.steps_run = 0;
        debug!("scheduler reset");
    }
}
