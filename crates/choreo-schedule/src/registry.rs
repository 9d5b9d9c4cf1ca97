//! Stage buckets: stage tag → module family → registered functors.
//!
//! Registration is append-only except for two rules:
//!
//! - a functor with the same name in the same family and stage replaces
//!   the earlier one in place;
//! - a family that derives from parent families absorbs the parents'
//!   entries, and the parents disappear from every bucket.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::info;

use crate::catalogue::UNIVERSAL_STAGES;
use crate::functor::{Functor, FunctorBuildError};

/// Errors from registering a functor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The stage tag is neither universal nor in the catalogue.
    UnknownStage {
        /// The rejected tag.
        stage: String,
        /// The functor being registered.
        functor: String,
    },
    /// The functor could not be built.
    InvalidFunctor(FunctorBuildError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownStage { stage, functor } => {
                write!(f, "functor '{functor}' registered under unknown stage '{stage}'")
            }
            Self::InvalidFunctor(e) => write!(f, "invalid functor: {e}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidFunctor(e) => Some(e),
            Self::UnknownStage { .. } => None,
        }
    }
}

impl From<FunctorBuildError> for RegistryError {
    fn from(e: FunctorBuildError) -> Self {
        Self::InvalidFunctor(e)
    }
}

/// One bucket entry.
#[derive(Clone, Debug)]
pub struct Registration {
    functor: Arc<Functor>,
    seq: u64,
}

impl Registration {
    /// The registered functor.
    pub fn functor(&self) -> &Arc<Functor> {
        &self.functor
    }

    /// Registration sequence number; later registrations are larger.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What [`StageRegistry::add`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// An earlier functor of the same name was replaced.
    pub replaced: bool,
    /// Parent families absorbed into the registering family.
    pub absorbed: Vec<String>,
}

/// A registered functor together with every stage it is tagged with.
#[derive(Clone, Debug)]
pub struct TaggedFunctor {
    /// The most recently registered functor of this name.
    pub functor: Arc<Functor>,
    /// All stages under which the name is registered, first-seen order.
    pub stages: IndexSet<String>,
}

/// Stage tag → family → entries.
#[derive(Clone, Debug)]
pub struct StageRegistry {
    buckets: IndexMap<String, IndexMap<String, Vec<Registration>>>,
    next_seq: u64,
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StageRegistry {
    /// Create a registry seeded with the universal stages.
    pub fn new() -> Self {
        let mut buckets = IndexMap::new();
        for stage in UNIVERSAL_STAGES {
            buckets.insert(stage.to_string(), IndexMap::new());
        }
        Self {
            buckets,
            next_seq: 0,
        }
    }

    /// Make `stage` a valid registration target.
    pub fn ensure_stage(&mut self, stage: &str) {
        if !self.buckets.contains_key(stage) {
            self.buckets.insert(stage.to_string(), IndexMap::new());
        }
    }

    /// Whether `stage` is a valid registration target.
    pub fn has_stage(&self, stage: &str) -> bool {
        self.buckets.contains_key(stage)
    }

    /// Register `functor` under `stage`.
    ///
    /// Parent families named by the functor are absorbed first, so the
    /// new entry lands in a bucket that already holds the inherited units.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownStage`] if `stage` is not a known bucket.
    pub fn add(&mut self, functor: Arc<Functor>, stage: &str) -> Result<AddOutcome, RegistryError> {
        if !self.buckets.contains_key(stage) {
            return Err(RegistryError::UnknownStage {
                stage: stage.to_string(),
                functor: functor.name().to_string(),
            });
        }
        let absorbed = self.consolidate(functor.family(), functor.inherits());

        let seq = self.next_seq;
        self.next_seq += 1;
        let family = functor.family().to_string();
        let mut replaced = false;
        if let Some(bucket) = self.buckets.get_mut(stage) {
            let entries = bucket.entry(family).or_default();
            let entry = Registration { functor, seq };
            match entries
                .iter_mut()
                .find(|e| e.functor.name() == entry.functor.name())
            {
                Some(existing) => {
                    *existing = entry;
                    replaced = true;
                }
                None => entries.push(entry),
            }
        }
        Ok(AddOutcome { replaced, absorbed })
    }

    /// Move the entries of `parents` into `child` in every bucket.
    ///
    /// A parent entry whose name the child already registers in that
    /// bucket is dropped. Returns the parents that were present.
    pub fn consolidate(&mut self, child: &str, parents: &[String]) -> Vec<String> {
        let mut absorbed = Vec::new();
        for parent in parents.iter().filter(|p| p.as_str() != child) {
            let mut found = false;
            for bucket in self.buckets.values_mut() {
                let Some(inherited) = bucket.shift_remove(parent.as_str()) else {
                    continue;
                };
                found = true;
                let entries = bucket.entry(child.to_string()).or_default();
                for entry in inherited {
                    if !entries
                        .iter()
                        .any(|e| e.functor.name() == entry.functor.name())
                    {
                        entries.push(entry);
                    }
                }
            }
            if found {
                info!(child, parent = parent.as_str(), "absorbed parent family");
                absorbed.push(parent.clone());
            }
        }
        absorbed
    }

    /// Entries for `family` under `stage`, in registration order.
    pub fn entries(&self, stage: &str, family: &str) -> &[Registration] {
        self.buckets
            .get(stage)
            .and_then(|b| b.get(family))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Families with at least one entry, first-seen order.
    pub fn families(&self) -> IndexSet<String> {
        self.buckets
            .values()
            .flat_map(|b| b.iter().filter(|(_, e)| !e.is_empty()).map(|(f, _)| f.clone()))
            .collect()
    }

    /// Whether `family` has any entry.
    pub fn contains_family(&self, family: &str) -> bool {
        self.buckets
            .values()
            .any(|b| b.get(family).is_some_and(|e| !e.is_empty()))
    }

    /// One record per distinct functor name of `family`.
    ///
    /// The functor is the latest registration of that name; its stages
    /// are the union over every bucket the name appears in.
    pub fn tagged_functors(&self, family: &str) -> IndexMap<String, TaggedFunctor> {
        let mut latest: IndexMap<String, (u64, TaggedFunctor)> = IndexMap::new();
        for (stage, bucket) in &self.buckets {
            let Some(entries) = bucket.get(family) else {
                continue;
            };
            for entry in entries {
                let name = entry.functor.name().to_string();
                match latest.get_mut(&name) {
                    Some((seq, tagged)) => {
                        tagged.stages.insert(stage.clone());
                        if entry.seq > *seq {
                            *seq = entry.seq;
                            tagged.functor = Arc::clone(&entry.functor);
                        }
                    }
                    None => {
                        let mut stages = IndexSet::new();
                        stages.insert(stage.clone());
                        latest.insert(
                            name,
                            (
                                entry.seq,
                                TaggedFunctor {
                                    functor: Arc::clone(&entry.functor),
                                    stages,
                                },
                            ),
                        );
                    }
                }
            }
        }
        latest.into_iter().map(|(k, (_, t))| (k, t)).collect()
    }

    /// Drop every entry, keeping the known stages.
    pub fn clear(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        self.next_seq = 0;
    }
}
