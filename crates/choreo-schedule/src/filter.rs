//! Focus filtering: which entities a pass acts on.

use indexmap::IndexMap;

use choreo_core::EntityId;
use choreo_store::{Attributes, PropertyStore};

/// Attribute allow-lists. An entity is in focus when, for every filtered
/// attribute, it carries one of the allowed values.
///
/// An entity lacking a filtered attribute is excluded. A filter with no
/// attributes admits every registered entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusFilter {
    allow: IndexMap<String, Vec<String>>,
}

impl FocusFilter {
    /// A filter that admits every entity.
    pub fn any() -> Self {
        Self {
            allow: IndexMap::new(),
        }
    }

    /// Restrict `attribute` to `values`. Replaces any earlier list for it.
    pub fn allow<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow
            .insert(attribute.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Allowed values per attribute.
    pub fn allow_lists(&self) -> &IndexMap<String, Vec<String>> {
        &self.allow
    }

    /// Whether `attributes` pass every allow-list.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.allow.iter().all(|(key, allowed)| {
            attributes
                .get(key)
                .is_some_and(|v| allowed.iter().any(|a| a == v))
        })
    }

    /// Matching entity ids of `store`, ascending.
    pub fn select(&self, store: &PropertyStore) -> Vec<EntityId> {
        store
            .entities()
            .filter(|(_, attrs)| self.matches(attrs))
            .map(|(id, _)| id)
            .collect()
    }
}

/// Root-system defaults: living segments and apices.
impl Default for FocusFilter {
    fn default() -> Self {
        Self::any().allow("label", ["Segment", "Apex"]).allow(
            "type",
            [
                "Base_of_the_root_system",
                "Normal_root_after_emergence",
                "Stopped",
                "Just_Stopped",
                "Root_nodule",
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entities: &[(u64, &str, &str)]) -> PropertyStore {
        let mut s = PropertyStore::new();
        for &(id, label, kind) in entities {
            let mut a = Attributes::new();
            a.insert("label".into(), label.into());
            a.insert("type".into(), kind.into());
            s.add_entity(EntityId(id), a).unwrap();
        }
        s
    }

    #[test]
    fn default_filter_keeps_living_organs() {
        let s = store(&[
            (4, "Segment", "Normal_root_after_emergence"),
            (2, "Apex", "Stopped"),
            (3, "Segment", "Dead"),
            (5, "Dead", "Normal_root_after_emergence"),
        ]);
        assert_eq!(FocusFilter::default().select(&s), [EntityId(2), EntityId(4)]);
    }

    #[test]
    fn any_admits_everything() {
        let s = store(&[(1, "x", "y"), (2, "z", "w")]);
        assert_eq!(FocusFilter::any().select(&s).len(), 2);
    }

    #[test]
    fn missing_attribute_excludes() {
        let mut s = PropertyStore::new();
        s.add_entity(EntityId(1), Attributes::new()).unwrap();
        let f = FocusFilter::any().allow("label", ["Segment"]);
        assert!(f.select(&s).is_empty());
    }
}
