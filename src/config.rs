//! Construction options for [`Table`](crate::Table).

use crate::error::{Result, TableError};
use crate::table::Table;
use core::hash::Hash;

/// Initial slot count when none is given.
pub const DEFAULT_CAPACITY: usize = 1 << 4;
/// Load factor when none is given.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.5;
/// Hard ceiling on the number of live entries, and on the slot count.
pub const MAXIMUM_CAPACITY: usize = 1 << 30;
/// Slack allowed above `1.0` when validating a load factor.
pub const LOAD_FACTOR_EPSILON: f32 = 1e-6;

/// Validated parameters for a new table.
///
/// ```
/// use probe_table::TableConfig;
///
/// let table = TableConfig::default()
///     .with_capacity(64)
///     .with_load_factor(0.75)
///     .build::<&str, u32>()
///     .unwrap();
/// assert_eq!(table.capacity(), 64);
/// assert_eq!(table.threshold(), 48);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    pub capacity: usize,
    pub load_factor: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Check both parameters. NaN load factors are rejected, as are
    /// capacities above `MAXIMUM_CAPACITY`.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity > MAXIMUM_CAPACITY {
            return Err(TableError::InvalidCapacity(self.capacity));
        }
        let lf = self.load_factor;
        if lf.is_nan() || lf <= 0.0 || lf - LOAD_FACTOR_EPSILON > 1.0 {
            return Err(TableError::InvalidLoadFactor(lf));
        }
        Ok(())
    }

    pub fn build<K, V>(self) -> Result<Table<K, V>>
    where
        K: Eq + Hash,
    {
        Table::from_config(self)
    }
}

/// `floor(capacity * load_factor)`, computed in `f64` to keep large
/// capacities exact. Never exceeds `capacity`, even for load factors in
/// the tolerance band above `1.0`.
pub(crate) fn threshold_for(capacity: usize, load_factor: f32) -> usize {
    let threshold = (capacity as f64 * f64::from(load_factor)).floor() as usize;
    threshold.min(capacity)
}
