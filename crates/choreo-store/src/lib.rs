//! Sorted dense-array property storage for Choreo simulations.
//!
//! Per-step computation touches a filtered subset of entities by id,
//! while downstream consumers export whole variables in id order. The
//! store serves both with one layout:
//!
//! ```text
//! PropertyStore
//! ├── entities: SortedArrayMap<Attributes>   (registry + filter labels)
//! ├── variables: name → SortedArrayMap<f64>  (per-entity or aggregate)
//! └── defaults: name → f64                   (applied to new entities)
//! ```
//!
//! [`SortedArrayMap`] keeps keys ascending in a dense `Vec` and an
//! auxiliary id → position index, giving O(1) point access, O(1)
//! monotonic appends and ascending enumeration without sorting.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod sorted;
pub mod store;

pub use error::StoreError;
pub use sorted::SortedArrayMap;
pub use store::{Attributes, PropertyStore};
