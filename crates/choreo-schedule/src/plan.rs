//! Per-family execution plans built from the stage buckets.
//!
//! A [`Schedule`] is an ordered list of priority groups. Groups run in
//! ascending [`PriorityVector`] order; within a group functors run in the
//! order their names are first met walking the stage buckets.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::catalogue::StageCatalogue;
use crate::functor::Functor;
use crate::priority::PriorityVector;
use crate::registry::StageRegistry;

/// Functors sharing one priority vector.
#[derive(Clone, Debug)]
pub struct ScheduleGroup {
    priority: PriorityVector,
    functors: Vec<Arc<Functor>>,
}

impl ScheduleGroup {
    /// Priority shared by the group.
    pub fn priority(&self) -> &PriorityVector {
        &self.priority
    }

    /// Members in execution order.
    pub fn functors(&self) -> &[Arc<Functor>] {
        &self.functors
    }
}

/// Ordered execution plan for one module family.
#[derive(Clone, Debug)]
pub struct Schedule {
    family: String,
    groups: Vec<ScheduleGroup>,
}

impl Schedule {
    /// Build the plan for `family` from the current registry contents.
    ///
    /// Each distinct functor name appears once, carrying every stage it
    /// was registered under. Tags missing from the catalogue are logged
    /// and count as untagged.
    pub fn build(registry: &StageRegistry, catalogue: &StageCatalogue, family: &str) -> Self {
        let tagged = registry.tagged_functors(family);
        let mut by_priority: BTreeMap<PriorityVector, Vec<Arc<Functor>>> = BTreeMap::new();
        for (name, t) in tagged {
            for stage in t.stages.iter().filter(|s| !catalogue.contains(s)) {
                warn!(
                    family,
                    functor = name.as_str(),
                    stage = stage.as_str(),
                    "stage not in catalogue; treated as untagged"
                );
            }
            let priority = PriorityVector::compute(catalogue, &t.stages);
            by_priority.entry(priority).or_default().push(t.functor);
        }
        Self {
            family: family.to_string(),
            groups: by_priority
                .into_iter()
                .map(|(priority, functors)| ScheduleGroup { priority, functors })
                .collect(),
        }
    }

    /// The family this plan runs.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Groups in execution order.
    pub fn groups(&self) -> &[ScheduleGroup] {
        &self.groups
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the plan has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of functors across groups.
    pub fn functor_count(&self) -> usize {
        self.groups.iter().map(|g| g.functors.len()).sum()
    }

    /// All functors in execution order.
    pub fn functors(&self) -> impl Iterator<Item = &Arc<Functor>> + '_ {
        self.groups.iter().flat_map(|g| g.functors.iter())
    }

    /// Functor names, group by group.
    pub fn names(&self) -> Vec<Vec<String>> {
        self.groups
            .iter()
            .map(|g| g.functors.iter().map(|f| f.name().to_string()).collect())
            .collect()
    }
}
