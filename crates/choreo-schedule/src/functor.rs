//! The [`Functor`]: one registered computation unit.
//!
//! A functor names the variable it produces, the variables it reads (in
//! argument order), the family that owns it and how it is invoked. The
//! scheduler calls [`Functor::invoke`] once per pass; the functor reads its
//! inputs for the focus set, computes, and writes its output back under
//! its own name.

use std::error::Error;
use std::fmt;

use smallvec::SmallVec;

use choreo_core::{EntityId, FunctorError, InputNames, StepError};
use choreo_store::PropertyStore;

use crate::catalogue::implied_mode;

/// How the scheduler invokes a functor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvocationMode {
    /// Invoked once per pass with no per-entity threading. Used for global
    /// bookkeeping and rebalancing across entities.
    Iterating,
    /// Invoked once per pass on aggregate values; the result is written
    /// under [`EntityId::AGGREGATE`].
    Total,
    /// Invoked once per focus entity; results are written for exactly
    /// those entities.
    PerEntity,
}

/// Reasons a [`FunctorBuilder`] refuses to build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctorBuildError {
    /// The name is empty after stripping the private marker.
    EmptyName,
    /// The family name is empty.
    NoFamily {
        /// Functor name.
        name: String,
    },
    /// Neither a scalar nor a sweep kernel was supplied.
    NoKernel {
        /// Functor name.
        name: String,
    },
    /// The kernel cannot run in the resolved mode: a sweep outside
    /// [`InvocationMode::Iterating`], or a scalar kernel with declared
    /// inputs inside it.
    ModeMismatch {
        /// Functor name.
        name: String,
        /// The resolved mode.
        mode: InvocationMode,
    },
}

impl fmt::Display for FunctorBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "functor name is empty"),
            Self::NoFamily { name } => write!(f, "functor '{name}' has no family"),
            Self::NoKernel { name } => write!(f, "functor '{name}' has no kernel"),
            Self::ModeMismatch { name, mode } => {
                write!(f, "functor '{name}' kernel cannot run in mode {mode:?}")
            }
        }
    }
}

impl Error for FunctorBuildError {}

/// Scalar kernel: positional input values in, output value out.
pub type ScalarFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Sweep kernel for iterating functors that act on the whole store.
pub type SweepFn = dyn Fn(&mut SweepContext<'_>) -> Result<(), FunctorError> + Send + Sync;

/// The computation wrapped by a functor.
pub enum Kernel {
    /// Pure function of the declared inputs.
    Scalar(Box<ScalarFn>),
    /// Free-form pass over the store.
    Sweep(Box<SweepFn>),
}

/// Access handed to a sweep kernel during an iterating invocation.
pub struct SweepContext<'a> {
    store: &'a mut PropertyStore,
    focus: &'a [EntityId],
}

impl<'a> SweepContext<'a> {
    /// Create a context over a store and the current focus set.
    pub fn new(store: &'a mut PropertyStore, focus: &'a [EntityId]) -> Self {
        Self { store, focus }
    }

    /// Read access to the compartment store.
    pub fn store(&self) -> &PropertyStore {
        self.store
    }

    /// Write access to the compartment store.
    pub fn store_mut(&mut self) -> &mut PropertyStore {
        self.store
    }

    /// Entities eligible for this pass.
    pub fn focus(&self) -> &[EntityId] {
        self.focus
    }
}

/// One computation unit registered with the scheduler.
///
/// Immutable once built. The registry shares functors by `Arc` so the
/// same unit can sit in several stage buckets.
pub struct Functor {
    name: String,
    family: String,
    inherits: SmallVec<[String; 2]>,
    inputs: InputNames,
    mode: InvocationMode,
    kernel: Kernel,
}

impl Functor {
    /// Start building a functor for `family` from a unit identifier.
    ///
    /// A leading `_` (private marker) is stripped from `identifier` to form
    /// the output variable name.
    pub fn builder(family: impl Into<String>, identifier: &str) -> FunctorBuilder {
        FunctorBuilder {
            name: strip_private_marker(identifier).to_string(),
            family: family.into(),
            inherits: SmallVec::new(),
            inputs: InputNames::new(),
            mode: None,
            kernel: None,
        }
    }

    /// Output variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning module family.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Families the owning family derives from.
    pub fn inherits(&self) -> &[String] {
        &self.inherits
    }

    /// Declared input names, in argument order.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Invocation mode.
    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    /// Run one invocation pass against `store` for the entities in `focus`.
    ///
    /// Returns the number of kernel calls made. Touches only ids in
    /// `focus` and never adds or removes entries.
    ///
    /// # Errors
    ///
    /// [`StepError::MissingDependency`] if a declared input or the output
    /// variable is absent, or lacks a value for a focus entity.
    /// [`StepError::FunctorFailed`] if a sweep kernel fails.
    pub fn invoke(
        &self,
        store: &mut PropertyStore,
        focus: &[EntityId],
    ) -> Result<usize, StepError> {
        match (&self.kernel, self.mode) {
            (Kernel::Sweep(f), _) => {
                let mut ctx = SweepContext::new(store, focus);
                f(&mut ctx).map_err(|reason| StepError::FunctorFailed {
                    name: self.name.clone(),
                    reason,
                })?;
                Ok(1)
            }
            (Kernel::Scalar(f), InvocationMode::Iterating) => {
                f(&[]);
                Ok(1)
            }
            (Kernel::Scalar(f), InvocationMode::Total) => self.invoke_total(f, store),
            (Kernel::Scalar(f), InvocationMode::PerEntity) => {
                self.invoke_per_entity(f, store, focus)
            }
        }
    }

    fn missing(&self, variable: &str, entity: Option<EntityId>) -> StepError {
        StepError::MissingDependency {
            functor: self.name.clone(),
            variable: variable.to_string(),
            entity,
        }
    }

    fn invoke_total(&self, f: &ScalarFn, store: &mut PropertyStore) -> Result<usize, StepError> {
        let id = EntityId::AGGREGATE;
        let mut args: SmallVec<[f64; 4]> = SmallVec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            // A per-entity column has no aggregate value, even if an entity
            // shares the aggregate id.
            if !store.is_aggregate(input) {
                return Err(self.missing(input, None));
            }
            let value = store
                .aggregate(input)
                .ok_or_else(|| self.missing(input, Some(id)))?;
            args.push(value);
        }
        let result = f(&args);
        if !store.is_aggregate(&self.name) {
            return Err(self.missing(&self.name, None));
        }
        let output = store
            .variable_mut(&self.name)
            .ok_or_else(|| self.missing(&self.name, None))?;
        output.set(id, result);
        Ok(1)
    }

    fn invoke_per_entity(
        &self,
        f: &ScalarFn,
        store: &mut PropertyStore,
        focus: &[EntityId],
    ) -> Result<usize, StepError> {
        let mut columns = SmallVec::<[_; 4]>::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let column = store
                .variable(input)
                .ok_or_else(|| self.missing(input, None))?;
            columns.push((input.as_str(), column));
        }
        let output = store
            .variable(&self.name)
            .ok_or_else(|| self.missing(&self.name, None))?;

        // Every result is computed before any is written: a functor reading
        // its own output sees the previous values for all entities.
        let mut positions = Vec::with_capacity(focus.len());
        let mut results = Vec::with_capacity(focus.len());
        let mut args: SmallVec<[f64; 4]> = SmallVec::with_capacity(columns.len());
        for &id in focus {
            args.clear();
            for &(input, column) in &columns {
                let value = column.get(id).ok_or_else(|| self.missing(input, Some(id)))?;
                args.push(*value);
            }
            let pos = output
                .position(id)
                .ok_or_else(|| self.missing(&self.name, Some(id)))?;
            positions.push(pos);
            results.push(f(&args));
        }
        drop(columns);

        let output = store
            .variable_mut(&self.name)
            .ok_or_else(|| self.missing(&self.name, None))?;
        output
            .assign_at(&positions, &results)
            .map_err(|e| StepError::FunctorFailed {
                name: self.name.clone(),
                reason: e.into(),
            })?;
        Ok(focus.len())
    }
}

impl fmt::Debug for Functor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Functor")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("inputs", &self.inputs)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Functor`].
///
/// Required: a kernel, via [`scalar`](Self::scalar) or [`sweep`](Self::sweep).
pub struct FunctorBuilder {
    name: String,
    family: String,
    inherits: SmallVec<[String; 2]>,
    inputs: InputNames,
    mode: Option<InvocationMode>,
    kernel: Option<Kernel>,
}

impl FunctorBuilder {
    /// Declare the input variable names, in argument order.
    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Record a family the owning family derives from.
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits.push(parent.into());
        self
    }

    /// Force an invocation mode instead of deriving it from stage tags.
    pub fn mode(mut self, mode: InvocationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Use a scalar kernel.
    pub fn scalar<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.kernel = Some(Kernel::Scalar(Box::new(f)));
        self
    }

    /// Use a sweep kernel. Sweep functors are always iterating.
    pub fn sweep<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SweepContext<'_>) -> Result<(), FunctorError> + Send + Sync + 'static,
    {
        self.kernel = Some(Kernel::Sweep(Box::new(f)));
        self
    }

    /// Build with the per-entity default when no mode was forced.
    ///
    /// # Errors
    ///
    /// See [`build_for`](Self::build_for).
    pub fn build(self) -> Result<Functor, FunctorBuildError> {
        self.build_for(&[])
    }

    /// Build, deriving the invocation mode from the stages the functor will
    /// be registered under when no mode was forced.
    ///
    /// Zero declared inputs, or a sweep kernel, always yield
    /// [`InvocationMode::Iterating`]. Otherwise an iterating stage wins over
    /// a total stage, which wins over per-entity.
    ///
    /// # Errors
    ///
    /// - [`FunctorBuildError::EmptyName`] if the name is empty after
    ///   stripping the private marker
    /// - [`FunctorBuildError::NoFamily`] if the family is empty
    /// - [`FunctorBuildError::NoKernel`] if no kernel was supplied
    /// - [`FunctorBuildError::ModeMismatch`] if a sweep kernel was forced
    ///   into a non-iterating mode, or a scalar kernel with inputs resolves
    ///   to iterating (it would be called with no arguments)
    pub fn build_for(self, stages: &[&str]) -> Result<Functor, FunctorBuildError> {
        if self.name.is_empty() {
            return Err(FunctorBuildError::EmptyName);
        }
        if self.family.is_empty() {
            return Err(FunctorBuildError::NoFamily { name: self.name });
        }
        let Some(kernel) = self.kernel else {
            return Err(FunctorBuildError::NoKernel { name: self.name });
        };

        let mode = match (&kernel, self.mode) {
            (Kernel::Sweep(_), None | Some(InvocationMode::Iterating)) => InvocationMode::Iterating,
            (Kernel::Sweep(_), Some(mode)) => {
                return Err(FunctorBuildError::ModeMismatch {
                    name: self.name,
                    mode,
                });
            }
            (Kernel::Scalar(_), _) if self.inputs.is_empty() => InvocationMode::Iterating,
            (Kernel::Scalar(_), forced) => forced.unwrap_or_else(|| stage_mode(stages)),
        };
        if mode == InvocationMode::Iterating
            && matches!(kernel, Kernel::Scalar(_))
            && !self.inputs.is_empty()
        {
            return Err(FunctorBuildError::ModeMismatch {
                name: self.name,
                mode,
            });
        }

        Ok(Functor {
            name: self.name,
            family: self.family,
            inherits: self.inherits,
            inputs: self.inputs,
            mode,
            kernel,
        })
    }
}

fn stage_mode(stages: &[&str]) -> InvocationMode {
    let implied: SmallVec<[InvocationMode; 4]> =
        stages.iter().filter_map(|s| implied_mode(s)).collect();
    if implied.contains(&InvocationMode::Iterating) {
        InvocationMode::Iterating
    } else if implied.contains(&InvocationMode::Total) {
        InvocationMode::Total
    } else {
        InvocationMode::PerEntity
    }
}

/// Strip one leading private marker from a unit identifier.
pub fn strip_private_marker(identifier: &str) -> &str {
    identifier.strip_prefix('_').unwrap_or(identifier)
}
