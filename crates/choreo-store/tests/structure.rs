//! Structural edits keep every column sorted and aligned with the registry.

use std::collections::BTreeSet;

use choreo_core::EntityId;
use choreo_store::{Attributes, PropertyStore, SortedArrayMap};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Edit {
    Add(u64),
    Remove(u64),
    Set(u64, f64),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0u64..64).prop_map(Edit::Add),
        (0u64..64).prop_map(Edit::Remove),
        (0u64..64, -10.0f64..10.0).prop_map(|(id, v)| Edit::Set(id, v)),
    ]
}

proptest! {
    #[test]
    fn edits_preserve_invariants(edits in prop::collection::vec(edit(), 0..200)) {
        let mut store = PropertyStore::new();
        store.declare_per_entity("biomass", 1.0);
        store.declare_aggregate("total", 0.0);
        let mut model = BTreeSet::new();

        for e in edits {
            match e {
                Edit::Add(id) => {
                    let fresh = model.insert(id);
                    prop_assert_eq!(store.add_entity(EntityId(id), Attributes::new()).is_ok(), fresh);
                }
                Edit::Remove(id) => {
                    let present = model.remove(&id);
                    prop_assert_eq!(store.remove_entity(EntityId(id)).is_ok(), present);
                }
                Edit::Set(id, v) => {
                    if model.contains(&id) {
                        store.set("biomass", EntityId(id), v).unwrap();
                        prop_assert_eq!(store.get("biomass", EntityId(id)), Some(v));
                    }
                }
            }
            prop_assert!(store.check_invariant().is_ok());
        }

        let expected: Vec<EntityId> = model.iter().copied().map(EntityId).collect();
        prop_assert_eq!(store.entity_ids(), expected.as_slice());
        prop_assert_eq!(store.variable("biomass").unwrap().keys(), expected.as_slice());
        prop_assert_eq!(store.aggregate("total"), Some(0.0));
    }

    #[test]
    fn update_matches_last_write_wins(
        initial in prop::collection::btree_map(0u64..500, -1.0f64..1.0, 0..50),
        batch in prop::collection::vec((0u64..500, -1.0f64..1.0), 0..100),
    ) {
        let mut map: SortedArrayMap<f64> =
            initial.iter().map(|(&id, &v)| (EntityId(id), v)).collect();
        let mut model = initial.clone();
        for &(id, v) in &batch {
            model.insert(id, v);
        }
        map.update(batch.into_iter().map(|(id, v)| (EntityId(id), v)));

        prop_assert!(map.check_invariant().is_ok());
        let got: Vec<(u64, f64)> = map.iter().map(|(id, &v)| (id.0, v)).collect();
        let want: Vec<(u64, f64)> = model.into_iter().collect();
        prop_assert_eq!(got, want);
    }
}
