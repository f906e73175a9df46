//! Error type shared by table construction and insertion.

use thiserror::Error;

/// Failures reported by [`Table`](crate::Table) and
/// [`TableConfig`](crate::TableConfig).
///
/// Missing keys are never an error; lookups and removals return `None`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    /// Requested initial capacity was zero.
    #[error("invalid table capacity: {0}")]
    InvalidCapacity(usize),

    /// Load factor was not in `(0, 1]`.
    #[error("invalid load factor: {0}")]
    InvalidLoadFactor(f32),

    /// The table already holds `MAXIMUM_CAPACITY` entries.
    #[error("reached maximum capacity: {0}")]
    CapacityExhausted(usize),

    /// Growing the slot array would pass `MAXIMUM_CAPACITY` slots.
    #[error("cannot grow table beyond capacity {0}")]
    CapacityOverflow(usize),

    /// The allocator refused storage for this many slots.
    #[error("cannot allocate {0} slots")]
    AllocationFailed(usize),

    /// A full probe cycle found no slot to place a new entry in.
    #[error("no free slot after probing all {0} slots")]
    NoFreeSlot(usize),
}

pub type Result<T> = core::result::Result<T, TableError>;
