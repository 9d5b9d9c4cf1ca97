//! Coupling adapters: inputs pulled from other components' variables.
//!
//! A [`Coupling`] fills one target variable with a weighted sum of source
//! variables, entity by entity. Weights carry unit conversions.

use choreo_core::{ConfigError, EntityId, StepError};
use choreo_store::PropertyStore;

/// Weighted-sum adapter into one target variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Coupling {
    /// Variable written.
    pub target: String,
    /// `(source variable, weight)` pairs. The first source fixes the ids
    /// written.
    pub sources: Vec<(String, f64)>,
}

impl Coupling {
    /// Start a coupling into `target` with no sources.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            sources: Vec::new(),
        }
    }

    /// Add a source with its conversion weight.
    pub fn source(mut self, source: impl Into<String>, weight: f64) -> Self {
        self.sources.push((source.into(), weight));
        self
    }

    /// Whether evaluation would leave the store unchanged: a single source
    /// of the target's own name at weight 1.
    pub fn is_identity(&self) -> bool {
        matches!(self.sources.as_slice(), [(s, w)] if *s == self.target && *w == 1.0)
    }

    /// Check the coupling is well formed.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidDeclaration`] for an empty target, no
    /// sources, or a non-finite weight.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidDeclaration { reason };
        if self.target.is_empty() {
            return Err(invalid("coupling target is empty".into()));
        }
        if self.sources.is_empty() {
            return Err(invalid(format!("coupling into '{}' has no sources", self.target)));
        }
        if let Some((source, weight)) = self.sources.iter().find(|(_, w)| !w.is_finite()) {
            return Err(invalid(format!(
                "coupling '{source}' -> '{}' has non-finite weight {weight}",
                self.target
            )));
        }
        Ok(())
    }

    /// Evaluate into `store`. Returns the number of entities written.
    ///
    /// # Errors
    ///
    /// [`StepError::MissingDependency`] if the target or a source is
    /// absent, or a source lacks a value for an id of the first source.
    pub fn apply(&self, store: &mut PropertyStore) -> Result<usize, StepError> {
        if self.is_identity() {
            return Ok(0);
        }
        let missing = |variable: &str, entity: Option<EntityId>| StepError::MissingDependency {
            functor: self.target.clone(),
            variable: variable.to_string(),
            entity,
        };
        if !store.contains_variable(&self.target) {
            return Err(missing(&self.target, None));
        }
        let Some((first, _)) = self.sources.first() else {
            return Ok(0);
        };
        let ids: Vec<EntityId> = store
            .variable(first)
            .ok_or_else(|| missing(first, None))?
            .keys()
            .to_vec();

        let mut values = vec![0.0; ids.len()];
        for (source, weight) in &self.sources {
            let column = store.variable(source).ok_or_else(|| missing(source, None))?;
            for (acc, &id) in values.iter_mut().zip(&ids) {
                let v = column.get(id).ok_or_else(|| missing(source, Some(id)))?;
                *acc += v * weight;
            }
        }

        let written = ids.len();
        if let Some(target) = store.variable_mut(&self.target) {
            target.update(ids.into_iter().zip(values));
        }
        Ok(written)
    }
}
