//! Priority vectors: numeric, lexicographically ordered row positions.

use std::fmt;

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::catalogue::StageCatalogue;

/// One position per catalogue row; 0 means untagged in that row.
///
/// Compared element by element as integers, so position 10 sorts after
/// position 2.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PriorityVector(SmallVec<[u16; 4]>);

impl PriorityVector {
    /// Compute the vector for a set of stage tags.
    ///
    /// In each row the position is that of the last row entry found in
    /// `tags`, 1-based.
    pub fn compute(catalogue: &StageCatalogue, tags: &IndexSet<String>) -> Self {
        Self(
            catalogue
                .rows()
                .iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .filter(|(_, stage)| tags.contains(stage.as_str()))
                        .map(|(j, _)| (j + 1) as u16)
                        .last()
                        .unwrap_or(0)
                })
                .collect(),
        )
    }

    /// Positions, one per row.
    pub fn positions(&self) -> &[u16] {
        &self.0
    }
}

impl From<Vec<u16>> for PriorityVector {
    fn from(v: Vec<u16>) -> Self {
        Self(v.into())
    }
}

impl fmt::Display for PriorityVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tags(list: &[&str]) -> IndexSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_catalogue_positions() {
        let catalogue = StageCatalogue::default();
        let v = PriorityVector::compute(&catalogue, &tags(&["state", "actual"]));
        assert_eq!(v.positions(), &[0, 4, 0, 4]);
        let untagged = PriorityVector::compute(&catalogue, &tags(&["unknown"]));
        assert_eq!(untagged.positions(), &[0, 0, 0, 0]);
    }

    #[test]
    fn last_matching_tag_in_row_wins() {
        let catalogue = StageCatalogue::default();
        let v = PriorityVector::compute(&catalogue, &tags(&["totalstate", "rate"]));
        assert_eq!(v.positions()[1], 5);
    }

    #[test]
    fn comparison_is_numeric() {
        let a = PriorityVector::from(vec![2]);
        let b = PriorityVector::from(vec![10]);
        assert!(a < b);
        assert!(PriorityVector::from(vec![0, 9]) < PriorityVector::from(vec![1, 0]));
        assert_eq!(b.to_string(), "[10]");
    }

    proptest! {
        #[test]
        fn ordering_matches_lexicographic_integers(
            a in proptest::collection::vec(0u16..20, 3),
            b in proptest::collection::vec(0u16..20, 3),
        ) {
            let expected = a.cmp(&b);
            prop_assert_eq!(PriorityVector::from(a).cmp(&PriorityVector::from(b)), expected);
        }
    }
}
