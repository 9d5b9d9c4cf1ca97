//! The [`Component`] trait and its [`RegistrationTable`].

use choreo_core::VariableDecl;
use choreo_schedule::{Functor, FunctorBuilder};

/// A simulation component: one module family with declared variables and
/// a set of stage-tagged computation units.
///
/// Implementors build their functors in [`register`](Self::register),
/// typically capturing parameter values in the kernel closures. The
/// binding applies scenario overrides through
/// [`set_parameter`](Self::set_parameter) before calling `register`.
pub trait Component {
    /// Module family name. Functors register under it.
    fn family(&self) -> &str;

    /// Families this component derives from. Their registered functors
    /// are absorbed into this family.
    fn parents(&self) -> Vec<String> {
        Vec::new()
    }

    /// Variable declarations, used to default the store at binding.
    fn variables(&self) -> Vec<VariableDecl>;

    /// Override a parameter. Returns `false` if the name is unknown.
    fn set_parameter(&mut self, _name: &str, _value: f64) -> bool {
        false
    }

    /// Describe every functor of this component.
    fn register(&self, table: &mut RegistrationTable);
}

/// One pending registration.
pub struct TableEntry {
    /// Functor under construction.
    pub builder: FunctorBuilder,
    /// Stage tags to register it under.
    pub stages: Vec<String>,
}

/// Explicit registration table filled by [`Component::register`].
pub struct RegistrationTable {
    family: String,
    parents: Vec<String>,
    entries: Vec<TableEntry>,
}

impl RegistrationTable {
    /// Create an empty table for `family`.
    pub fn new(family: impl Into<String>, parents: Vec<String>) -> Self {
        Self {
            family: family.into(),
            parents,
            entries: Vec::new(),
        }
    }

    /// Family the table registers for.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Start a functor owned by this family, inheriting its parents.
    pub fn functor(&self, identifier: &str) -> FunctorBuilder {
        self.parents
            .iter()
            .fold(Functor::builder(self.family.as_str(), identifier), |b, p| {
                b.inherits(p.as_str())
            })
    }

    /// Queue `builder` for registration under `stages`.
    pub fn add(&mut self, builder: FunctorBuilder, stages: &[&str]) {
        self.entries.push(TableEntry {
            builder,
            stages: stages.iter().map(|s| s.to_string()).collect(),
        });
    }

    /// Number of queued functors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the table, yielding its entries in insertion order.
    pub fn into_entries(self) -> Vec<TableEntry> {
        self.entries
    }
}
