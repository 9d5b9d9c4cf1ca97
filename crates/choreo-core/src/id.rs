//! Strongly-typed identifiers.

use smallvec::SmallVec;
use std::fmt;

/// Identifies one entity (a vertex of the simulated structure).
///
/// Entity ids are the keys of every per-entity property. They carry no
/// meaning beyond ordering: stores keep them ascending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Synthetic id under which aggregate (plant-scale) values are stored.
    pub const AGGREGATE: EntityId = EntityId(1);
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Ordered list of declared input variable names.
///
/// Most computation units read fewer than four variables, so the list
/// stays inline.
pub type InputNames = SmallVec<[String; 4]>;
