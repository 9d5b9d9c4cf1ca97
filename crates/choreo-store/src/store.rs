//! The per-compartment property store.
//!
//! A [`PropertyStore`] holds one [`SortedArrayMap`] per variable plus an
//! entity registry carrying the non-numeric attributes used for focus
//! filtering. Per-entity variables are keyed by entity id; aggregate
//! variables hold a single value under [`EntityId::AGGREGATE`].

use indexmap::IndexMap;

use choreo_core::EntityId;

use crate::error::StoreError;
use crate::sorted::SortedArrayMap;

/// Non-numeric attributes of one entity (e.g. `label`, `type`).
pub type Attributes = IndexMap<String, String>;

/// How a variable is keyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scale {
    PerEntity,
    Aggregate,
}

#[derive(Clone, Debug)]
struct Column {
    scale: Scale,
    /// Value given to entities added after the column was declared.
    default: Option<f64>,
    values: SortedArrayMap<f64>,
}

/// Variable name → sorted per-entity values, plus the entity registry.
///
/// Structural changes (adding or removing entities, editing attributes)
/// bump [`epoch`](Self::epoch) so the scheduler knows when its focus set
/// is stale. Value writes never do.
#[derive(Clone, Debug, Default)]
pub struct PropertyStore {
    entities: SortedArrayMap<Attributes>,
    columns: IndexMap<String, Column>,
    epoch: u64,
}

impl PropertyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Entity registry ────────────────────────────────────────────

    /// Register an entity with its filtering attributes.
    ///
    /// Every per-entity variable declared with a default receives that
    /// default for the new id.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateEntity`] if `id` is already registered.
    pub fn add_entity(&mut self, id: EntityId, attributes: Attributes) -> Result<(), StoreError> {
        if self.entities.contains_key(id) {
            return Err(StoreError::DuplicateEntity { id });
        }
        self.entities.set(id, attributes);
        for column in self.columns.values_mut() {
            if let (Scale::PerEntity, Some(default)) = (column.scale, column.default) {
                if !column.values.contains_key(id) {
                    column.values.set(id, default);
                }
            }
        }
        self.epoch += 1;
        Ok(())
    }

    /// Remove an entity from the registry and from every per-entity variable.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyNotFound`] if `id` is not registered.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Attributes, StoreError> {
        let attributes = self.entities.remove(id)?;
        for column in self.columns.values_mut() {
            if column.scale == Scale::PerEntity && column.values.contains_key(id) {
                column.values.remove(id)?;
            }
        }
        self.epoch += 1;
        Ok(attributes)
    }

    /// Set one attribute of a registered entity.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyNotFound`] if `id` is not registered.
    pub fn set_attribute(
        &mut self,
        id: EntityId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let attributes = self
            .entities
            .get_mut(id)
            .ok_or(StoreError::KeyNotFound { id })?;
        attributes.insert(key.into(), value.into());
        self.epoch += 1;
        Ok(())
    }

    /// Attributes of a registered entity.
    pub fn attributes(&self, id: EntityId) -> Option<&Attributes> {
        self.entities.get(id)
    }

    /// Registered entity ids, ascending.
    pub fn entity_ids(&self) -> &[EntityId] {
        self.entities.keys()
    }

    /// Iterate registered entities with their attributes, ascending.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Attributes)> + '_ {
        self.entities.iter()
    }

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Structural revision counter.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // ── Variables ──────────────────────────────────────────────────

    fn column_mut(&mut self, name: &str, scale: Scale) -> &mut Column {
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| Column {
                scale,
                default: None,
                values: SortedArrayMap::new(),
            })
    }

    /// Declare a per-entity variable with a default.
    ///
    /// Registered entities lacking a value receive `default`; existing
    /// values are kept. Entities added later also receive `default`.
    pub fn declare_per_entity(&mut self, name: &str, default: f64) {
        let ids: Vec<EntityId> = self.entities.keys().to_vec();
        let column = self.column_mut(name, Scale::PerEntity);
        column.default = Some(default);
        let missing: Vec<(EntityId, f64)> = ids
            .into_iter()
            .filter(|&id| !column.values.contains_key(id))
            .map(|id| (id, default))
            .collect();
        column.values.update(missing);
    }

    /// Set `value` for every registered entity, creating the variable if needed.
    pub fn fill_per_entity(&mut self, name: &str, value: f64) {
        let ids: Vec<EntityId> = self.entities.keys().to_vec();
        let column = self.column_mut(name, Scale::PerEntity);
        if column.default.is_none() {
            column.default = Some(value);
        }
        column.values.update(ids.into_iter().map(|id| (id, value)));
    }

    /// Declare an aggregate variable and set its single value.
    pub fn declare_aggregate(&mut self, name: &str, value: f64) {
        let column = self.column_mut(name, Scale::Aggregate);
        column.scale = Scale::Aggregate;
        column.values.set(EntityId::AGGREGATE, value);
    }

    /// Install a per-entity variable from pre-computed values.
    ///
    /// Replaces any previous variable of the same name.
    pub fn insert_variable(&mut self, name: impl Into<String>, values: SortedArrayMap<f64>) {
        self.columns.insert(
            name.into(),
            Column {
                scale: Scale::PerEntity,
                default: None,
                values,
            },
        );
    }

    /// Whether the variable exists.
    pub fn contains_variable(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Whether the variable is stored under the aggregate id only.
    pub fn is_aggregate(&self, name: &str) -> bool {
        self.columns
            .get(name)
            .is_some_and(|c| c.scale == Scale::Aggregate)
    }

    /// Names of all variables, in declaration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    /// Sorted values of a variable.
    pub fn variable(&self, name: &str) -> Option<&SortedArrayMap<f64>> {
        self.columns.get(name).map(|c| &c.values)
    }

    /// Mutable sorted values of a variable.
    pub fn variable_mut(&mut self, name: &str) -> Option<&mut SortedArrayMap<f64>> {
        self.columns.get_mut(name).map(|c| &mut c.values)
    }

    /// Point read.
    pub fn get(&self, name: &str, id: EntityId) -> Option<f64> {
        self.variable(name)?.get(id).copied()
    }

    /// Point write into an existing variable.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownVariable`] if the variable does not exist.
    pub fn set(&mut self, name: &str, id: EntityId, value: f64) -> Result<(), StoreError> {
        let values = self
            .variable_mut(name)
            .ok_or_else(|| StoreError::UnknownVariable { name: name.into() })?;
        values.set(id, value);
        Ok(())
    }

    /// Aggregate value of a variable.
    pub fn aggregate(&self, name: &str) -> Option<f64> {
        self.get(name, EntityId::AGGREGATE)
    }

    /// Check the sort and index invariants of every map in the store.
    ///
    /// # Errors
    ///
    /// The first [`StoreError::InvariantViolation`] found, with the variable
    /// name prepended.
    pub fn check_invariant(&self) -> Result<(), StoreError> {
        self.entities
            .check_invariant()
            .map_err(|e| prefixed("entities", e))?;
        for (name, column) in &self.columns {
            column
                .values
                .check_invariant()
                .map_err(|e| prefixed(name, e))?;
        }
        Ok(())
    }
}

fn prefixed(name: &str, e: StoreError) -> StoreError {
    match e {
        StoreError::InvariantViolation { reason } => StoreError::InvariantViolation {
            reason: format!("{name}: {reason}"),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(label: &str) -> Attributes {
        let mut a = Attributes::new();
        a.insert("label".into(), label.into());
        a
    }

    #[test]
    fn new_entities_receive_defaults() {
        let mut store = PropertyStore::new();
        store.add_entity(EntityId(1), attrs("Segment")).unwrap();
        store.declare_per_entity("hexose", 0.5);
        store.add_entity(EntityId(2), attrs("Apex")).unwrap();
        assert_eq!(store.get("hexose", EntityId(1)), Some(0.5));
        assert_eq!(store.get("hexose", EntityId(2)), Some(0.5));
    }

    #[test]
    fn declare_keeps_existing_values() {
        let mut store = PropertyStore::new();
        store.add_entity(EntityId(3), attrs("Segment")).unwrap();
        store.add_entity(EntityId(4), attrs("Segment")).unwrap();
        store.insert_variable(
            "length",
            [(EntityId(3), 2.0)].into_iter().collect(),
        );
        store.declare_per_entity("length", 1.0);
        assert_eq!(store.get("length", EntityId(3)), Some(2.0));
        assert_eq!(store.get("length", EntityId(4)), Some(1.0));
    }

    #[test]
    fn fill_overwrites_every_entity() {
        let mut store = PropertyStore::new();
        store.add_entity(EntityId(1), attrs("Segment")).unwrap();
        store.declare_per_entity("c", 3.0);
        store.fill_per_entity("c", 0.0);
        assert_eq!(store.get("c", EntityId(1)), Some(0.0));
    }

    #[test]
    fn remove_entity_clears_per_entity_variables_only() {
        let mut store = PropertyStore::new();
        store.add_entity(EntityId(1), attrs("Segment")).unwrap();
        store.add_entity(EntityId(2), attrs("Segment")).unwrap();
        store.declare_per_entity("c", 1.0);
        store.declare_aggregate("total", 4.0);
        store.remove_entity(EntityId(1)).unwrap();
        assert_eq!(store.variable("c").unwrap().len(), 1);
        assert_eq!(store.aggregate("total"), Some(4.0));
        assert!(store.check_invariant().is_ok());
    }

    #[test]
    fn structural_changes_bump_epoch() {
        let mut store = PropertyStore::new();
        let e0 = store.epoch();
        store.add_entity(EntityId(1), attrs("Segment")).unwrap();
        let e1 = store.epoch();
        assert!(e1 > e0);
        store.declare_per_entity("c", 1.0);
        store.set("c", EntityId(1), 2.0).unwrap();
        assert_eq!(store.epoch(), e1);
        store.set_attribute(EntityId(1), "label", "Dead").unwrap();
        assert!(store.epoch() > e1);
    }

    #[test]
    fn duplicate_and_unknown_errors() {
        let mut store = PropertyStore::new();
        store.add_entity(EntityId(1), attrs("Segment")).unwrap();
        assert_eq!(
            store.add_entity(EntityId(1), attrs("Apex")),
            Err(StoreError::DuplicateEntity { id: EntityId(1) })
        );
        assert_eq!(
            store.set("nope", EntityId(1), 0.0),
            Err(StoreError::UnknownVariable {
                name: "nope".into()
            })
        );
        assert!(store.remove_entity(EntityId(5)).is_err());
    }

    #[test]
    fn aggregate_flag() {
        let mut store = PropertyStore::new();
        store.declare_aggregate("total_hexose", 0.0);
        assert!(store.is_aggregate("total_hexose"));
        assert_eq!(store.aggregate("total_hexose"), Some(0.0));
    }
}
