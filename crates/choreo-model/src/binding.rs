//! Binding a [`Component`] to a [`Scheduler`].
//!
//! [`ModelBinding::bind`] performs the whole set-up sequence of a model:
//!
//! 1. validate the binding settings and the component's declarations;
//! 2. apply the scenario to parameters and declaration defaults;
//! 3. register the component's functors;
//! 4. configure the family's sub-step and compartment;
//! 5. attach the compartment store (first store wins) and default it
//!    from the declarations.
//!
//! [`ModelBinding::step`] then evaluates the couplings and runs the family
//! once per global step.

use std::fmt::Write as _;

use indexmap::IndexMap;
use tracing::debug;

use choreo_core::{ConfigError, StateKind, StepError, VariableDecl, VariableKind};
use choreo_schedule::{FamilyConfig, Scheduler, StepMetrics};
use choreo_store::PropertyStore;

use crate::component::{Component, RegistrationTable};
use crate::coupling::Coupling;
use crate::error::BindError;

/// Ordered name → value overrides applied before registration.
pub type Scenario = IndexMap<String, f64>;

// ── BindingConfig ──────────────────────────────────────────────────

/// Settings for one [`ModelBinding`].
#[derive(Clone, Debug, PartialEq)]
pub struct BindingConfig {
    /// Sub-step of the family, in seconds. Default: 3600.
    pub sub_step: u64,
    /// Compartment whose store the model uses. Default: `"root"`.
    pub compartment: String,
    /// The model changes topology. Default: `false`.
    pub structural: bool,
    /// Parameter and default overrides.
    pub scenario: Scenario,
    /// Inputs pulled from other components before each step.
    pub couplings: Vec<Coupling>,
    /// State variables left untouched when defaulting the store.
    pub ignore: Vec<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            sub_step: 3600,
            compartment: "root".into(),
            structural: false,
            scenario: Scenario::new(),
            couplings: Vec::new(),
            ignore: Vec::new(),
        }
    }
}

impl BindingConfig {
    /// Check the settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidStep`] for a zero sub-step,
    /// [`ConfigError::InvalidDeclaration`] for an empty compartment, a
    /// non-finite scenario value or a malformed coupling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        choreo_schedule::config::check_step(self.sub_step)?;
        if self.compartment.is_empty() {
            return Err(ConfigError::InvalidDeclaration {
                reason: "compartment name is empty".into(),
            });
        }
        if let Some((name, value)) = self.scenario.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::InvalidDeclaration {
                reason: format!("scenario value for '{name}' is not finite: {value}"),
            });
        }
        self.couplings.iter().try_for_each(Coupling::validate)
    }
}

// ── ModelBinding ───────────────────────────────────────────────────

/// A component registered with a scheduler, ready to step.
pub struct ModelBinding<C: Component> {
    component: C,
    family: String,
    compartment: String,
    declarations: Vec<VariableDecl>,
    couplings: Vec<Coupling>,
}

impl<C: Component> ModelBinding<C> {
    /// Bind `component` to `scheduler` with `store` as its compartment store.
    ///
    /// When the compartment already has a store, `store` is dropped and
    /// the shared one is defaulted instead.
    ///
    /// # Errors
    ///
    /// [`BindError::Config`] for invalid settings, declarations or step
    /// ratio; [`BindError::Registry`] if a functor cannot be registered.
    pub fn bind(
        mut component: C,
        scheduler: &mut Scheduler,
        store: PropertyStore,
        config: BindingConfig,
    ) -> Result<Self, BindError> {
        config.validate()?;
        let family = component.family().to_string();
        let mut declarations = component.variables();
        for decl in &declarations {
            decl.validate()
                .map_err(|reason| ConfigError::InvalidDeclaration { reason })?;
        }

        apply_scenario(&family, &mut component, &mut declarations, &config.scenario);
        for decl in &declarations {
            decl.validate()
                .map_err(|reason| ConfigError::InvalidDeclaration { reason })?;
        }

        let mut table = RegistrationTable::new(family.as_str(), component.parents());
        component.register(&mut table);
        let registered = table.len();
        for entry in table.into_entries() {
            let stages: Vec<&str> = entry.stages.iter().map(String::as_str).collect();
            scheduler.register(entry.builder, &stages)?;
        }

        scheduler.configure_family(
            family.as_str(),
            FamilyConfig::new(config.sub_step, config.compartment.as_str())
                .structural(config.structural),
        )?;
        if !scheduler.attach_store(config.compartment.as_str(), store) {
            debug!(
                family = family.as_str(),
                compartment = config.compartment.as_str(),
                "reusing shared compartment store"
            );
        }
        let shared = scheduler
            .store_mut(&config.compartment)
            .ok_or_else(|| ConfigError::UnknownCompartment {
                compartment: config.compartment.clone(),
            })?;
        link_declarations(shared, &declarations, &config.ignore);

        debug!(
            family = family.as_str(),
            functors = registered,
            variables = declarations.len(),
            couplings = config.couplings.len(),
            "model bound"
        );
        Ok(Self {
            component,
            family,
            compartment: config.compartment,
            declarations,
            couplings: config.couplings,
        })
    }

    /// Evaluate couplings, then run one global step of the family.
    ///
    /// # Errors
    ///
    /// Coupling failures and every [`Scheduler::run`] error.
    pub fn step(&mut self, scheduler: &mut Scheduler) -> Result<StepMetrics, StepError> {
        self.pull_inputs(scheduler)?;
        scheduler.run(&self.family)
    }

    /// Evaluate every coupling into the compartment store.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownCompartment`] if the store was detached, or
    /// the first [`Coupling::apply`] failure.
    pub fn pull_inputs(&self, scheduler: &mut Scheduler) -> Result<(), StepError> {
        if self.couplings.is_empty() {
            return Ok(());
        }
        let store = scheduler
            .store_mut(&self.compartment)
            .ok_or_else(|| ConfigError::UnknownCompartment {
                compartment: self.compartment.clone(),
            })?;
        for coupling in &self.couplings {
            coupling.apply(store)?;
        }
        Ok(())
    }

    /// Add a coupling evaluated before each subsequent step.
    ///
    /// # Errors
    ///
    /// Propagates [`Coupling::validate`].
    pub fn add_coupling(&mut self, coupling: Coupling) -> Result<(), ConfigError> {
        coupling.validate()?;
        self.couplings.push(coupling);
        Ok(())
    }

    /// The bound component.
    pub fn component(&self) -> &C {
        &self.component
    }

    /// Mutable access to the bound component.
    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    /// Module family name.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Compartment name.
    pub fn compartment(&self) -> &str {
        &self.compartment
    }

    /// Declarations after scenario overrides.
    pub fn declarations(&self) -> &[VariableDecl] {
        &self.declarations
    }

    /// Active couplings.
    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    /// Names of declarations of `kind`, in declaration order.
    pub fn names_of(&self, kind: VariableKind) -> Vec<&str> {
        self.declarations
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Names of state variables of `state_kind`.
    pub fn state_variables_of(&self, state_kind: StateKind) -> Vec<&str> {
        self.declarations
            .iter()
            .filter(|d| d.kind == VariableKind::StateVariable && d.state_kind == Some(state_kind))
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Fixed-width table of declarations, restricted to `kinds` when
    /// non-empty.
    pub fn documentation(&self, kinds: &[VariableKind]) -> String {
        let mut out = format!(
            "MODEL DOCUMENTATION : {}\n{:<30} | {:<18} | {:<14} | {:<10} | description\n",
            self.family, "name", "kind", "unit", "default"
        );
        for decl in self
            .declarations
            .iter()
            .filter(|d| kinds.is_empty() || kinds.contains(&d.kind))
        {
            let _ = writeln!(
                out,
                "{:<30.30} | {:<18} | {:<14.14} | {:<10} | {}",
                decl.name,
                format!("{:?}", decl.kind),
                decl.unit.as_deref().unwrap_or("-"),
                decl.default,
                decl.description.as_deref().unwrap_or(""),
            );
        }
        out
    }

    /// Documentation of the inputs only, for writing coupling tables.
    pub fn inputs_documentation(&self) -> String {
        self.documentation(&[VariableKind::Input])
    }
}

/// Apply `scenario` to the component parameters and declaration defaults.
fn apply_scenario<C: Component>(
    family: &str,
    component: &mut C,
    declarations: &mut [VariableDecl],
    scenario: &Scenario,
) {
    for (name, &value) in scenario {
        let parameter = component.set_parameter(name, value);
        let declared = declarations.iter_mut().find(|d| d.name == *name);
        let found = declared.is_some();
        if let Some(decl) = declared {
            decl.default = value;
        }
        if !parameter && !found {
            debug!(family, name = name.as_str(), "scenario key ignored");
        }
    }
}

/// Default the store from declarations.
///
/// Inputs not covering every entity are reset to their default; state
/// variables outside `ignore` are set to their default everywhere;
/// plant-scale states are set at the aggregate id.
fn link_declarations(store: &mut PropertyStore, declarations: &[VariableDecl], ignore: &[String]) {
    for decl in declarations.iter().filter(|d| d.kind == VariableKind::Input) {
        let covered = store.variable(&decl.name).is_some_and(|values| {
            store
                .entity_ids()
                .iter()
                .all(|&id| values.contains_key(id))
        });
        if covered {
            store.declare_per_entity(&decl.name, decl.default);
        } else {
            store.fill_per_entity(&decl.name, decl.default);
        }
    }
    for decl in declarations
        .iter()
        .filter(|d| d.kind == VariableKind::StateVariable && !ignore.contains(&d.name))
    {
        store.fill_per_entity(&decl.name, decl.default);
    }
    for decl in declarations
        .iter()
        .filter(|d| d.kind == VariableKind::PlantScaleState)
    {
        store.declare_aggregate(&decl.name, decl.default);
    }
}
