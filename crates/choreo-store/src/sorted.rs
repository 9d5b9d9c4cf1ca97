//! Sorted dense-array map from [`EntityId`] to values.
//!
//! [`SortedArrayMap`] keeps two aligned vectors (`keys` ascending, `values`
//! at the same positions) plus an id → position index. Point reads and
//! writes of existing ids go through the index in O(1); inserts find their
//! position by binary search and shift the suffix; bulk updates whose new
//! ids all exceed the current maximum append in O(k), anything else falls
//! back to a linear merge of two sorted runs.

use indexmap::IndexMap;

use choreo_core::EntityId;

use crate::error::StoreError;

/// Mapping `EntityId → V` backed by a dense, ascending array.
///
/// # Invariants
///
/// - `keys` is strictly ascending.
/// - `keys.len() == values.len() == index.len()`.
/// - `index[keys[i]] == i` for every live position `i`.
///
/// Every mutating method preserves these; [`check_invariant`](Self::check_invariant)
/// verifies them independently for tests and debug assertions.
#[derive(Clone, Debug)]
pub struct SortedArrayMap<V> {
    keys: Vec<EntityId>,
    values: Vec<V>,
    index: IndexMap<EntityId, usize>,
}

impl<V> SortedArrayMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            index: IndexMap::new(),
        }
    }

    /// Create an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            index: IndexMap::with_capacity(capacity),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether `id` is present.
    pub fn contains_key(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Dense position of `id`, if present.
    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Value stored for `id`.
    pub fn get(&self, id: EntityId) -> Option<&V> {
        let &pos = self.index.get(&id)?;
        self.values.get(pos)
    }

    /// Mutable value stored for `id`.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut V> {
        let &pos = self.index.get(&id)?;
        self.values.get_mut(pos)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> &[EntityId] {
        &self.keys
    }

    /// Values aligned with [`keys`](Self::keys).
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Mutable values aligned with [`keys`](Self::keys).
    ///
    /// Only values are exposed mutably; key order cannot be broken here.
    pub fn values_mut(&mut self) -> &mut [V] {
        &mut self.values
    }

    /// Iterate `(id, value)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &V)> + '_ {
        self.keys.iter().copied().zip(self.values.iter())
    }

    /// Insert or overwrite the value for `id`.
    ///
    /// Existing ids are updated in place and keep their position. New ids
    /// are inserted at their sorted position; the index is refreshed for
    /// every shifted entry. Returns the previous value, if any.
    pub fn set(&mut self, id: EntityId, value: V) -> Option<V> {
        if let Some(&pos) = self.index.get(&id) {
            return Some(std::mem::replace(&mut self.values[pos], value));
        }

        let pos = self.keys.partition_point(|&k| k < id);
        self.keys.insert(pos, id);
        self.values.insert(pos, value);
        for i in pos..self.keys.len() {
            self.index.insert(self.keys[i], i);
        }
        None
    }

    /// Remove `id`, shifting the suffix left.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyNotFound`] if `id` is absent.
    pub fn remove(&mut self, id: EntityId) -> Result<V, StoreError> {
        let pos = self
            .index
            .swap_remove(&id)
            .ok_or(StoreError::KeyNotFound { id })?;
        self.keys.remove(pos);
        let value = self.values.remove(pos);
        for i in pos..self.keys.len() {
            if let Some(slot) = self.index.get_mut(&self.keys[i]) {
                *slot = i;
            }
        }
        Ok(value)
    }

    /// Bulk update from arbitrary `(id, value)` pairs.
    ///
    /// Existing ids are scattered in place. New ids are sorted (the last
    /// occurrence of a repeated id wins) and then either appended, when all
    /// of them exceed the current maximum, or merged with the existing run
    /// followed by a full index rebuild.
    pub fn update<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (EntityId, V)>,
    {
        let mut fresh: Vec<(EntityId, V)> = Vec::new();
        for (id, value) in items {
            match self.index.get(&id) {
                Some(&pos) => self.values[pos] = value,
                None => fresh.push((id, value)),
            }
        }
        if fresh.is_empty() {
            return;
        }

        fresh.sort_by_key(|&(id, _)| id);
        let mut incoming: Vec<(EntityId, V)> = Vec::with_capacity(fresh.len());
        for (id, value) in fresh {
            match incoming.last_mut() {
                Some(last) if last.0 == id => last.1 = value,
                _ => incoming.push((id, value)),
            }
        }

        let monotonic = match (self.keys.last(), incoming.first()) {
            (Some(&max), Some(&(first, _))) => first > max,
            _ => true,
        };

        if monotonic {
            self.keys.reserve(incoming.len());
            self.values.reserve(incoming.len());
            for (id, value) in incoming {
                self.index.insert(id, self.keys.len());
                self.keys.push(id);
                self.values.push(value);
            }
        } else {
            self.merge(incoming);
        }

        debug_assert!(self.check_invariant().is_ok());
    }

    /// Linear merge of the existing run with sorted, disjoint `incoming`.
    fn merge(&mut self, incoming: Vec<(EntityId, V)>) {
        let total = self.keys.len() + incoming.len();
        let old_keys = std::mem::replace(&mut self.keys, Vec::with_capacity(total));
        let old_values = std::mem::replace(&mut self.values, Vec::with_capacity(total));

        let mut old = old_keys.into_iter().zip(old_values).peekable();
        let mut new = incoming.into_iter().peekable();
        loop {
            let take_old = match (old.peek(), new.peek()) {
                (Some(a), Some(b)) => a.0 <= b.0,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_old { old.next() } else { new.next() };
            if let Some((id, value)) = next {
                self.keys.push(id);
                self.values.push(value);
            }
        }

        self.index.clear();
        self.index.reserve(self.keys.len());
        for (i, &id) in self.keys.iter().enumerate() {
            self.index.insert(id, i);
        }
    }

    /// Dense positions for `ids`, in the given order.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyNotFound`] for the first absent id.
    pub fn positions_of(&self, ids: &[EntityId]) -> Result<Vec<usize>, StoreError> {
        ids.iter()
            .map(|&id| self.position(id).ok_or(StoreError::KeyNotFound { id }))
            .collect()
    }

    /// Check ordering and index consistency.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvariantViolation`] describing the first violation.
    pub fn check_invariant(&self) -> Result<(), StoreError> {
        if self.keys.len() != self.values.len() || self.keys.len() != self.index.len() {
            return Err(StoreError::InvariantViolation {
                reason: format!(
                    "lengths disagree: {} keys, {} values, {} index entries",
                    self.keys.len(),
                    self.values.len(),
                    self.index.len()
                ),
            });
        }
        for pair in self.keys.windows(2) {
            if pair[0] >= pair[1] {
                return Err(StoreError::InvariantViolation {
                    reason: format!("keys {} and {} out of order", pair[0], pair[1]),
                });
            }
        }
        for (i, id) in self.keys.iter().enumerate() {
            if self.index.get(id) != Some(&i) {
                return Err(StoreError::InvariantViolation {
                    reason: format!("index of entity {id} does not point at position {i}"),
                });
            }
        }
        Ok(())
    }
}

impl<V: Clone> SortedArrayMap<V> {
    /// Read the values of `ids`, in the given order.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyNotFound`] for the first absent id.
    pub fn gather(&self, ids: &[EntityId]) -> Result<Vec<V>, StoreError> {
        ids.iter()
            .map(|&id| self.get(id).cloned().ok_or(StoreError::KeyNotFound { id }))
            .collect()
    }

    /// Write `values` at dense `positions`.
    ///
    /// # Errors
    ///
    /// [`StoreError::LengthMismatch`] if the slices differ in length, or
    /// [`StoreError::InvariantViolation`] for a position past the end.
    pub fn assign_at(&mut self, positions: &[usize], values: &[V]) -> Result<(), StoreError> {
        if positions.len() != values.len() {
            return Err(StoreError::LengthMismatch {
                expected: positions.len(),
                got: values.len(),
            });
        }
        let len = self.values.len();
        if let Some(&bad) = positions.iter().find(|&&p| p >= len) {
            return Err(StoreError::InvariantViolation {
                reason: format!("position {bad} out of range for length {len}"),
            });
        }
        for (&pos, value) in positions.iter().zip(values) {
            self.values[pos] = value.clone();
        }
        Ok(())
    }

    /// Write `values` for existing `ids`.
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyNotFound`] if any id is absent (nothing is written),
    /// [`StoreError::LengthMismatch`] if the slices differ in length.
    pub fn scatter(&mut self, ids: &[EntityId], values: &[V]) -> Result<(), StoreError> {
        let positions = self.positions_of(ids)?;
        self.assign_at(&positions, values)
    }

    /// Replace every value, aligned with [`keys`](Self::keys).
    ///
    /// # Errors
    ///
    /// [`StoreError::LengthMismatch`] if `values.len() != self.len()`.
    pub fn assign_all(&mut self, values: &[V]) -> Result<(), StoreError> {
        if values.len() != self.values.len() {
            return Err(StoreError::LengthMismatch {
                expected: self.values.len(),
                got: values.len(),
            });
        }
        self.values.clone_from_slice(values);
        Ok(())
    }

    /// Copy into an insertion-ordered map (ascending ids).
    pub fn to_index_map(&self) -> IndexMap<EntityId, V> {
        self.iter().map(|(id, v)| (id, v.clone())).collect()
    }
}

impl<V> Default for SortedArrayMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(EntityId, V)> for SortedArrayMap<V> {
    fn from_iter<I: IntoIterator<Item = (EntityId, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.update(iter);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(raw: &[u64]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId).collect()
    }

    fn map_of(pairs: &[(u64, f64)]) -> SortedArrayMap<f64> {
        pairs.iter().map(|&(k, v)| (EntityId(k), v)).collect()
    }

    #[test]
    fn construction_sorts_keys() {
        let m = map_of(&[(3, 0.3), (1, 0.1), (2, 0.2)]);
        assert_eq!(m.keys(), ids(&[1, 2, 3]).as_slice());
        assert_eq!(m.values(), &[0.1, 0.2, 0.3]);
        assert!(m.check_invariant().is_ok());
    }

    #[test]
    fn insert_update_delete_sequence() {
        let mut m = map_of(&[(3, 0.3), (1, 0.1), (2, 0.2)]);
        m.set(EntityId(5), 0.5);
        m.set(EntityId(4), 0.4);
        assert_eq!(m.keys(), ids(&[1, 2, 3, 4, 5]).as_slice());

        m.update([(EntityId(2), 9.0), (EntityId(10), 1.0), (EntityId(0), 0.0)]);
        assert_eq!(m.keys(), ids(&[0, 1, 2, 3, 4, 5, 10]).as_slice());
        assert_eq!(m.get(EntityId(2)), Some(&9.0));

        m.assign_at(&[0, 2], &[7.0, 8.0]).unwrap();
        assert_eq!(m.get(EntityId(0)), Some(&7.0));
        assert_eq!(m.get(EntityId(2)), Some(&8.0));

        assert_eq!(m.remove(EntityId(3)).unwrap(), 0.3);
        assert!(m.check_invariant().is_ok());
        assert_eq!(m.keys(), ids(&[0, 1, 2, 4, 5, 10]).as_slice());
    }

    #[test]
    fn set_existing_keeps_length_and_order() {
        let mut m = map_of(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        assert_eq!(m.set(EntityId(2), 20.0), Some(2.0));
        assert_eq!(m.len(), 3);
        assert_eq!(m.keys(), ids(&[1, 2, 3]).as_slice());
        assert_eq!(m.position(EntityId(2)), Some(1));
    }

    #[test]
    fn remove_absent_fails() {
        let mut m = map_of(&[(1, 1.0)]);
        assert_eq!(
            m.remove(EntityId(9)),
            Err(StoreError::KeyNotFound { id: EntityId(9) })
        );
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn monotonic_update_appends() {
        let mut m = map_of(&[(1, 1.0), (2, 2.0)]);
        m.update([(EntityId(7), 7.0), (EntityId(5), 5.0)]);
        assert_eq!(m.keys(), ids(&[1, 2, 5, 7]).as_slice());
        assert_eq!(m.position(EntityId(7)), Some(3));
        assert!(m.check_invariant().is_ok());
    }

    #[test]
    fn repeated_new_id_last_wins() {
        let mut m: SortedArrayMap<f64> = SortedArrayMap::new();
        m.update([(EntityId(4), 1.0), (EntityId(4), 2.0), (EntityId(1), 0.0)]);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(EntityId(4)), Some(&2.0));
    }

    #[test]
    fn gather_and_scatter_by_id() {
        let mut m = map_of(&[(10, 1.0), (20, 2.0), (30, 3.0)]);
        assert_eq!(m.gather(&ids(&[30, 10])).unwrap(), vec![3.0, 1.0]);
        m.scatter(&ids(&[20, 30]), &[-2.0, -3.0]).unwrap();
        assert_eq!(m.values(), &[1.0, -2.0, -3.0]);
        assert_eq!(
            m.scatter(&ids(&[99]), &[0.0]),
            Err(StoreError::KeyNotFound { id: EntityId(99) })
        );
    }

    #[test]
    fn assign_all_checks_length() {
        let mut m = map_of(&[(1, 1.0), (2, 2.0)]);
        assert_eq!(
            m.assign_all(&[1.0]),
            Err(StoreError::LengthMismatch {
                expected: 2,
                got: 1
            })
        );
        m.assign_all(&[5.0, 6.0]).unwrap();
        assert_eq!(m.values(), &[5.0, 6.0]);
    }

    #[test]
    fn assign_at_rejects_out_of_range() {
        let mut m = map_of(&[(1, 1.0)]);
        assert!(matches!(
            m.assign_at(&[3], &[0.0]),
            Err(StoreError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn to_index_map_is_ascending() {
        let m = map_of(&[(9, 0.9), (3, 0.3)]);
        let exported: Vec<u64> = m.to_index_map().keys().map(|id| id.0).collect();
        assert_eq!(exported, vec![3, 9]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Set(u64, f64),
        Remove(u64),
        Update(Vec<(u64, f64)>),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..64, -10.0f64..10.0).prop_map(|(k, v)| Op::Set(k, v)),
            (0u64..64).prop_map(Op::Remove),
            prop::collection::vec((0u64..96, -10.0f64..10.0), 0..12).prop_map(Op::Update),
        ]
    }

    proptest! {
        #[test]
        fn invariant_holds_after_every_operation(ops in prop::collection::vec(arb_op(), 0..64)) {
            let mut m: SortedArrayMap<f64> = SortedArrayMap::new();
            let mut model: std::collections::BTreeMap<u64, f64> = std::collections::BTreeMap::new();
            for op in ops {
                match op {
                    Op::Set(k, v) => {
                        m.set(EntityId(k), v);
                        model.insert(k, v);
                    }
                    Op::Remove(k) => {
                        let removed = m.remove(EntityId(k));
                        prop_assert_eq!(removed.is_ok(), model.remove(&k).is_some());
                    }
                    Op::Update(pairs) => {
                        m.update(pairs.iter().map(|&(k, v)| (EntityId(k), v)));
                        for (k, v) in pairs {
                            model.insert(k, v);
                        }
                    }
                }
                prop_assert!(m.check_invariant().is_ok());
                prop_assert_eq!(m.len(), model.len());
            }
            let keys: Vec<u64> = m.keys().iter().map(|id| id.0).collect();
            let expected: Vec<u64> = model.keys().copied().collect();
            prop_assert_eq!(keys, expected);
            for (k, v) in &model {
                prop_assert_eq!(m.get(EntityId(*k)), Some(v));
            }
        }
    }
}
