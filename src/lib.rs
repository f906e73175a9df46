//! probe-table: a single-threaded key-value table using open addressing
//! with linear probing and tombstone deletion.
//!
//! Internal Design:
//!
//! Summary
//! - One component, [`Table`], stores every entry directly in a slot array.
//!   Each slot is `Empty`, `Tombstone`, or `Occupied`.
//! - Lookups start at `hash % capacity` and step forward one slot at a
//!   time, skipping tombstones and entries with other keys. They stop at an
//!   empty slot or at the matching key.
//! - New keys go into the first slot at or after the raw index that is not
//!   occupied, so tombstones are reclaimed by later inserts.
//!
//! Growth
//! - `threshold = floor(capacity * load_factor)`. The insert that brings
//!   the live count to the threshold doubles the capacity before `put`
//!   returns.
//! - A resize allocates fresh storage and replays live entries in slot
//!   order. Tombstones are never carried into the new generation.
//! - Each entry stores its precomputed `u64` hash; `K: Hash` is not invoked
//!   during a resize.
//!
//! Constraints
//! - No interior synchronization. Mutation takes `&mut self`, so sharing a
//!   table across threads requires an outer lock.
//! - At most [`MAXIMUM_CAPACITY`] live entries; `put` beyond that fails
//!   with [`TableError::CapacityExhausted`].
//! - Every probe is bounded by one cycle over the slot array. A table whose
//!   slots are all tombstones or foreign keys reports "absent" rather than
//!   spinning.
//!
//! Notes and non-goals
//! - No iteration, persistence, shrink-on-delete, or public hasher
//!   injection. The hasher is hashbrown's default builder.
//! - Missing keys are `None`, never an error.
//!
//! ```
//! use probe_table::Table;
//!
//! let mut t = Table::with_capacity_and_load_factor(4, 0.5)?;
//! assert_eq!(t.put("a", 1)?, None);
//! assert_eq!(t.put("a", 2)?, Some(1));
//! assert_eq!(t.get("a"), Some(&2));
//! assert_eq!(t.remove("a"), Some(2));
//! assert!(t.is_empty());
//! # Ok::<(), probe_table::TableError>(())
//! ```

mod config;
mod error;
mod table;
mod table_proptest;
mod test_hashers;

// Public surface
pub use config::{
    TableConfig, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR, LOAD_FACTOR_EPSILON, MAXIMUM_CAPACITY,
};
pub use error::{Result, TableError};
pub use table::Table;
