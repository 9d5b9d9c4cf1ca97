//! Variable declarations: what a component reads, owns and exposes.

/// Role of a declared variable within its component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Expected from another component. Keeps its default when uncoupled.
    Input,
    /// Per-entity state owned by the component.
    StateVariable,
    /// Aggregate state stored once under [`EntityId::AGGREGATE`](crate::EntityId::AGGREGATE).
    PlantScaleState,
    /// Model parameter. Never written to the property store.
    Parameter,
}

impl VariableKind {
    /// Whether the variable lives in the property store at all.
    pub fn is_stored(self) -> bool {
        !matches!(self, Self::Parameter)
    }
}

/// Physical classification of a state variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Amount per unit of structural mass.
    MassicConcentration,
    /// Size-invariant property.
    Intensive,
    /// Size-dependent property.
    Extensive,
    /// Extensive flux with no inertia across steps.
    NonInertialExtensive,
    /// Intensive flux with no inertia across steps.
    NonInertialIntensive,
    /// Structural descriptor (length, radius, ...).
    Descriptor,
}

/// Declaration of one component variable.
///
/// Components hand their declarations to the binding, which defaults the
/// property store from them before the first step.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDecl {
    /// Variable name. Also the property-store key.
    pub name: String,
    /// Role of the variable.
    pub kind: VariableKind,
    /// Physical classification, for state variables.
    pub state_kind: Option<StateKind>,
    /// Unit annotation (e.g. `"mol.g-1"`).
    pub unit: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Value used when nothing else provides one.
    pub default: f64,
    /// Name of the component expected to provide an input.
    pub provided_by: Option<String>,
    /// Inclusive lower bound on the default, if any.
    pub min: Option<f64>,
    /// Inclusive upper bound on the default, if any.
    pub max: Option<f64>,
}

impl VariableDecl {
    fn with_kind(name: impl Into<String>, kind: VariableKind, default: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            state_kind: None,
            unit: None,
            description: None,
            default,
            provided_by: None,
            min: None,
            max: None,
        }
    }

    /// Declare an input with its fallback default.
    pub fn input(name: impl Into<String>, default: f64) -> Self {
        Self::with_kind(name, VariableKind::Input, default)
    }

    /// Declare a per-entity state variable.
    pub fn state(name: impl Into<String>, state_kind: StateKind, default: f64) -> Self {
        let mut decl = Self::with_kind(name, VariableKind::StateVariable, default);
        decl.state_kind = Some(state_kind);
        decl
    }

    /// Declare an aggregate (plant-scale) state.
    pub fn plant_scale(name: impl Into<String>, default: f64) -> Self {
        Self::with_kind(name, VariableKind::PlantScaleState, default)
    }

    /// Declare a parameter.
    pub fn parameter(name: impl Into<String>, value: f64) -> Self {
        Self::with_kind(name, VariableKind::Parameter, value)
    }

    /// Attach a unit annotation.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attach a description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Record which component provides this input.
    pub fn provided_by(mut self, provider: impl Into<String>) -> Self {
        self.provided_by = Some(provider.into());
        self
    }

    /// Bound the admissible default value.
    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Validate structural invariants of the declaration.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("variable name is empty".into());
        }
        if !self.default.is_finite() {
            return Err(format!(
                "variable '{}' default must be finite, got {}",
                self.name, self.default
            ));
        }
        if self.min.is_some_and(|min| self.default < min)
            || self.max.is_some_and(|max| self.default > max)
        {
            return Err(format!(
                "variable '{}' default {} outside [{:?}, {:?}]",
                self.name, self.default, self.min, self.max
            ));
        }
        if self.state_kind.is_some() && self.kind != VariableKind::StateVariable {
            return Err(format!(
                "variable '{}' has a state kind but is not a state variable",
                self.name
            ));
        }
        Ok(())
    }
}
