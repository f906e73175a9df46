//! Table: open addressing with linear probing and tombstone deletion.

use crate::config::{threshold_for, TableConfig, DEFAULT_CAPACITY, MAXIMUM_CAPACITY};
use crate::error::{Result, TableError};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use hashbrown::hash_map::DefaultHashBuilder;
use log::{debug, error, trace};

const RESIZE_FACTOR: usize = 2;
const PROBE_STEP: usize = 1;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

/// A tombstone keeps probe chains intact after a removal; it can be
/// reused by a later insert but never ends a lookup.
#[derive(Debug)]
enum Slot<K, V> {
    Empty,
    Tombstone,
    Occupied(Entry<K, V>),
}

impl<K, V> Slot<K, V> {
    fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied(_))
    }
}

fn empty_slots<K, V>(capacity: usize) -> Box<[Slot<K, V>]> {
    (0..capacity).map(|_| Slot::Empty).collect()
}

/// Like [`empty_slots`], but reports a failed allocation instead of
/// aborting.
fn try_empty_slots<K, V>(capacity: usize) -> Result<Box<[Slot<K, V>]>> {
    let mut slots = Vec::new();
    if slots.try_reserve_exact(capacity).is_err() {
        error!("cannot allocate {} slots", capacity);
        return Err(TableError::AllocationFailed(capacity));
    }
    slots.resize_with(capacity, || Slot::Empty);
    Ok(slots.into_boxed_slice())
}

#[inline]
fn raw_index(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

#[inline]
fn next_index(idx: usize, capacity: usize) -> usize {
    (idx + PROBE_STEP) % capacity
}

/// Store `entry` in the first non-occupied slot at or after its raw
/// index. Returns whether a tombstone was reclaimed.
fn place<K, V>(slots: &mut [Slot<K, V>], entry: Entry<K, V>) -> Result<bool> {
    let capacity = slots.len();
    let mut idx = raw_index(entry.hash, capacity);
    for _ in 0..capacity {
        if !slots[idx].is_occupied() {
            let reclaimed = matches!(slots[idx], Slot::Tombstone);
            slots[idx] = Slot::Occupied(entry);
            return Ok(reclaimed);
        }
        idx = next_index(idx, capacity);
    }
    error!("no free slot among {} occupied slots", capacity);
    Err(TableError::NoFreeSlot(capacity))
}

/// Capacity a table of `capacity` slots must grow to once it holds `live`
/// entries, or `None` while `live` stays below the current threshold.
/// Doubles until the new threshold clears `live`, never past
/// `MAXIMUM_CAPACITY` slots.
fn grown_capacity(capacity: usize, load_factor: f32, live: usize) -> Result<Option<usize>> {
    if live < threshold_for(capacity, load_factor) {
        return Ok(None);
    }
    let mut grown = capacity;
    loop {
        grown = match grown.checked_mul(RESIZE_FACTOR) {
            Some(g) if g <= MAXIMUM_CAPACITY => g,
            _ => {
                error!(
                    "cannot grow {} slots to hold {} entries at load factor {}",
                    capacity, live, load_factor
                );
                return Err(TableError::CapacityOverflow(capacity));
            }
        };
        if live < threshold_for(grown, load_factor) {
            return Ok(Some(grown));
        }
    }
}

/// Single-threaded key-value table.
///
/// Mutation needs `&mut self`; callers sharing a table across threads
/// wrap the whole table in their own lock.
pub struct Table<K, V, S = DefaultHashBuilder> {
    hasher: S,
    slots: Box<[Slot<K, V>]>,
    len: usize,
    tombstones: usize,
    load_factor: f32,
    threshold: usize,
    max_entries: usize,
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash,
{
    /// Empty table with capacity 16 and load factor 0.5.
    pub fn new() -> Self {
        Self::build(
            TableConfig::default(),
            DefaultHashBuilder::default(),
            empty_slots(DEFAULT_CAPACITY),
        )
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::from_config(TableConfig::default().with_capacity(capacity))
    }

    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Result<Self> {
        Self::from_config(TableConfig {
            capacity,
            load_factor,
        })
    }

    pub fn from_config(config: TableConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, DefaultHashBuilder::default())
    }
}

impl<K, V> Default for Table<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Table<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn with_config_and_hasher(config: TableConfig, hasher: S) -> Result<Self> {
        config.validate()?;
        let slots = try_empty_slots(config.capacity)?;
        Ok(Self::build(config, hasher, slots))
    }

    fn build(config: TableConfig, hasher: S, slots: Box<[Slot<K, V>]>) -> Self {
        let threshold = threshold_for(config.capacity, config.load_factor);
        trace!(
            "new table: capacity={} load_factor={} threshold={}",
            config.capacity,
            config.load_factor,
            threshold
        );
        Self {
            hasher,
            slots,
            len: 0,
            tombstones: 0,
            load_factor: config.load_factor,
            threshold,
            max_entries: MAXIMUM_CAPACITY,
        }
    }

    /// Lower the live-entry ceiling so exhaustion can be exercised
    /// without allocating `MAXIMUM_CAPACITY` entries.
    #[cfg(test)]
    pub(crate) fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries;
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Live-entry count at which the next insert grows the table.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Tombstones left by removals since the last resize.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Probe from the raw index past tombstones and other keys. Stops at
    /// an empty slot or after one full cycle, either meaning "absent".
    fn find_index<Q>(&self, hash: u64, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let capacity = self.slots.len();
        let mut idx = raw_index(hash, capacity);
        for _ in 0..capacity {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied(e) if e.hash == hash && e.key.borrow() == q => return Some(idx),
                _ => {}
            }
            idx = next_index(idx, capacity);
        }
        trace!("probe wrapped all {} slots without a stop", capacity);
        None
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        match &self.slots[self.find_index(hash, q)?] {
            Slot::Occupied(e) => Some(&e.value),
            _ => None,
        }
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_index(self.make_hash(q), q).is_some()
    }

    /// Insert or overwrite. Returns the displaced value when `key` was
    /// already present; the stored key is kept in that case.
    ///
    /// An insert that brings the live count to the threshold grows the
    /// table before returning.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        if self.len >= self.max_entries {
            error!("put rejected: table holds {} entries", self.len);
            return Err(TableError::CapacityExhausted(self.len));
        }
        let hash = self.make_hash(&key);
        if let Some(idx) = self.find_index(hash, &key) {
            if let Slot::Occupied(e) = &mut self.slots[idx] {
                return Ok(Some(mem::replace(&mut e.value, value)));
            }
        }

        // Size and allocate the next generation before touching any slot
        // so an overflow or a failed allocation leaves the table as it was.
        let next = match grown_capacity(self.slots.len(), self.load_factor, self.len + 1)? {
            Some(capacity) => Some(try_empty_slots(capacity)?),
            None => None,
        };
        let reclaimed = place(&mut self.slots, Entry { key, value, hash })?;
        if reclaimed {
            self.tombstones -= 1;
        }
        self.len += 1;
        if let Some(slots) = next {
            self.resize(slots)?;
        }
        Ok(None)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.find_index(self.make_hash(q), q)?;
        let Slot::Occupied(e) = mem::replace(&mut self.slots[idx], Slot::Tombstone) else {
            unreachable!("find_index only yields occupied slots");
        };
        self.len -= 1;
        self.tombstones += 1;
        Some(e.value)
    }

    /// Replay every live entry, in slot order, into `slots`. Tombstones
    /// are dropped with the old storage.
    fn resize(&mut self, slots: Box<[Slot<K, V>]>) -> Result<()> {
        let capacity = slots.len();
        let old = mem::replace(&mut self.slots, slots);
        let old_capacity = old.len();
        let shed = mem::take(&mut self.tombstones);
        self.threshold = threshold_for(capacity, self.load_factor);
        self.len = 0;
        for slot in old.into_vec() {
            if let Slot::Occupied(entry) = slot {
                place(&mut self.slots, entry)?;
                self.len += 1;
            }
        }
        debug!(
            "resized table {} -> {} slots: {} entries, threshold {}, {} tombstones shed",
            old_capacity, capacity, self.len, self.threshold, shed
        );
        Ok(())
    }
}

impl<K, V, S> fmt::Debug for Table<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .field("threshold", &self.threshold)
            .field("tombstones", &self.tombstones)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_hashers::{ConstBuildHasher, IdentityBuildHasher};

    fn init_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Trace)
            .is_test(true)
            .try_init();
    }

    fn identity_table(
        capacity: usize,
        load_factor: f32,
    ) -> Table<u64, &'static str, IdentityBuildHasher> {
        Table::with_config_and_hasher(
            TableConfig {
                capacity,
                load_factor,
            },
            IdentityBuildHasher,
        )
        .unwrap()
    }

    fn occupied_at<K, V, S>(t: &Table<K, V, S>, idx: usize) -> bool {
        t.slots[idx].is_occupied()
    }

    /// Invariant: capacity 4 / load factor 0.5 grows to 8 on the second insert
    /// and keeps every mapping across the resize.
    #[test]
    fn small_table_walkthrough() {
        init_test_logger();
        let mut t: Table<&str, i32> = Table::with_capacity_and_load_factor(4, 0.5).unwrap();
        assert_eq!(t.threshold(), 2);

        assert_eq!(t.put("a", 1).unwrap(), None);
        assert_eq!(t.size(), 1);
        assert_eq!(t.capacity(), 4);

        assert_eq!(t.put("b", 2).unwrap(), None);
        assert_eq!(t.size(), 2);
        assert_eq!(t.capacity(), 8);
        assert_eq!(t.threshold(), 4);

        assert_eq!(t.get("a"), Some(&1));
        assert_eq!(t.get("b"), Some(&2));

        assert_eq!(t.remove("a"), Some(1));
        assert_eq!(t.size(), 1);
        assert_eq!(t.get("a"), None);

        assert_eq!(t.put("c", 3).unwrap(), None);
        assert_eq!(t.size(), 2);
    }

    /// Invariant: a removed slot becomes a tombstone that later lookups
    /// probe through.
    #[test]
    fn lookup_probes_past_tombstone() {
        let mut t = identity_table(16, 0.5);
        t.put(1, "one").unwrap();
        t.put(17, "seventeen").unwrap();
        assert!(occupied_at(&t, 1));
        assert!(occupied_at(&t, 2));

        assert_eq!(t.remove(&1), Some("one"));
        assert!(matches!(t.slots[1], Slot::Tombstone));
        assert_eq!(t.tombstones(), 1);
        assert_eq!(t.get(&17), Some(&"seventeen"));
        assert_eq!(t.get(&1), None);
    }

    /// Invariant: a new key colliding on a tombstoned raw slot reclaims it;
    /// the removed key does not resurface.
    #[test]
    fn new_key_reclaims_tombstone() {
        let mut t = identity_table(16, 0.5);
        t.put(1, "one").unwrap();
        t.put(17, "seventeen").unwrap();
        t.remove(&1);

        assert_eq!(t.put(33, "thirty-three").unwrap(), None);
        assert!(occupied_at(&t, 1), "tombstone at the raw slot is reused");
        assert_eq!(t.tombstones(), 0);
        assert_eq!(t.get(&33), Some(&"thirty-three"));
        assert_eq!(t.get(&17), Some(&"seventeen"));
        assert_eq!(t.get(&1), None);
        assert_eq!(t.len(), 2);
    }

    /// Invariant: overwriting a key found beyond a tombstone updates that
    /// entry rather than inserting a duplicate into the tombstone.
    #[test]
    fn overwrite_beyond_tombstone_keeps_single_slot() {
        let mut t = identity_table(16, 0.5);
        t.put(1, "one").unwrap();
        t.put(17, "a").unwrap();
        t.remove(&1);

        assert_eq!(t.put(17, "b").unwrap(), Some("a"));
        assert_eq!(t.len(), 1);
        assert!(!occupied_at(&t, 1));
        assert_eq!(t.remove(&17), Some("b"));
        assert_eq!(t.get(&17), None);
    }

    /// Invariant: when churn tombstones every slot, lookups and inserts stop
    /// after one probe cycle instead of spinning.
    #[test]
    fn saturated_tombstones_terminate() {
        let mut t = identity_table(8, 1.0);
        for k in 0..8u64 {
            t.put(k, "x").unwrap();
            assert_eq!(t.remove(&k), Some("x"));
        }
        assert_eq!(t.tombstones(), 8);
        assert!(t.is_empty());

        assert_eq!(t.get(&100), None);
        assert_eq!(t.remove(&100), None);
        assert_eq!(t.put(100, "hundred").unwrap(), None);
        assert!(occupied_at(&t, 4));
        assert_eq!(t.get(&100), Some(&"hundred"));
        assert_eq!(t.tombstones(), 7);
        assert_eq!(t.capacity(), 8);
    }

    /// Invariant: resize discards tombstones and replays live entries only.
    #[test]
    fn resize_sheds_tombstones() {
        init_test_logger();
        let mut t = identity_table(8, 0.5);
        t.put(0, "zero").unwrap();
        t.put(1, "one").unwrap();
        t.remove(&0);
        t.put(2, "two").unwrap();
        t.put(3, "three").unwrap();
        assert_eq!(t.tombstones(), 1);

        t.put(4, "four").unwrap();
        assert_eq!(t.capacity(), 16);
        assert_eq!(t.tombstones(), 0);
        assert_eq!(t.len(), 4);
        assert!(t.slots.iter().all(|s| !matches!(s, Slot::Tombstone)));
        for (k, v) in [(1u64, "one"), (2, "two"), (3, "three"), (4, "four")] {
            assert_eq!(t.get(&k), Some(&v));
        }
        assert_eq!(t.get(&0), None);
    }

    /// Invariant: equal-hash keys are told apart by `Eq` along the probe chain.
    #[test]
    fn collision_handling_with_const_hasher() {
        let mut t: Table<String, i32, ConstBuildHasher> =
            Table::with_config_and_hasher(TableConfig::default(), ConstBuildHasher).unwrap();
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            t.put(k.to_string(), i as i32).unwrap();
        }
        assert_eq!(t.get("a"), Some(&0));
        assert_eq!(t.get("d"), Some(&3));
        assert_eq!(t.remove("b"), Some(1));
        assert_eq!(t.get("c"), Some(&2));
        assert_eq!(t.get("b"), None);
        assert_eq!(t.len(), 3);
    }

    /// Invariant: a tiny load factor keeps doubling until the live count
    /// sits below the threshold.
    #[test]
    fn tiny_load_factor_grows_until_below_threshold() {
        let mut t: Table<u32, u32> = Table::with_capacity_and_load_factor(4, 0.1).unwrap();
        assert_eq!(t.threshold(), 0);
        t.put(7, 7).unwrap();
        assert!(t.len() < t.threshold());
        assert_eq!(t.capacity(), 32);
        assert_eq!(t.threshold(), 3);
        assert_eq!(t.get(&7), Some(&7));
    }

    /// Invariant: load factor 1.0 fills to capacity minus one before growing.
    #[test]
    fn full_load_factor_grows_at_capacity() {
        let mut t = identity_table(4, 1.0);
        for k in 0..3 {
            t.put(k, "v").unwrap();
        }
        assert_eq!(t.capacity(), 4);
        t.put(3, "v").unwrap();
        assert_eq!(t.capacity(), 8);
        assert_eq!(t.len(), 4);
    }

    /// Invariant: a load factor in the tolerance band above 1.0 still grows
    /// once every slot is filled; the next new key lands in the grown table.
    #[test]
    fn load_factor_above_one_grows_at_capacity() {
        let capacity = 1usize << 20;
        let mut t: Table<u64, (), IdentityBuildHasher> = Table::with_config_and_hasher(
            TableConfig {
                capacity,
                load_factor: 1.0 + 8.0 * f32::EPSILON,
            },
            IdentityBuildHasher,
        )
        .unwrap();
        assert_eq!(t.threshold(), capacity);

        for k in 0..capacity as u64 - 1 {
            t.put(k, ()).unwrap();
        }
        assert_eq!(t.capacity(), capacity);
        t.put(capacity as u64 - 1, ()).unwrap();
        assert_eq!(t.capacity(), 2 * capacity);
        assert_eq!(t.len(), capacity);

        assert_eq!(t.put(capacity as u64, ()).unwrap(), None);
        assert_eq!(t.len(), capacity + 1);
        assert_eq!(t.get(&(capacity as u64)), Some(&()));
        assert_eq!(t.get(&0), Some(&()));
    }

    /// Invariant: at the entry ceiling `put` fails without changing the
    /// table, while overwrites are also refused.
    #[test]
    fn put_at_ceiling_is_rejected() {
        let mut t: Table<&str, i32> = Table::new();
        t.set_max_entries(2);
        t.put("a", 1).unwrap();
        t.put("b", 2).unwrap();
        assert_eq!(t.put("c", 3), Err(TableError::CapacityExhausted(2)));
        assert_eq!(t.put("a", 9), Err(TableError::CapacityExhausted(2)));
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("a"), Some(&1));
        assert_eq!(t.get("c"), None);

        t.remove("b");
        assert_eq!(t.put("c", 3).unwrap(), None);
    }

    /// Invariant: growth sizing reports overflow instead of wrapping, and
    /// stays put below the threshold.
    #[test]
    fn grown_capacity_sizing() {
        assert_eq!(grown_capacity(16, 0.5, 7).unwrap(), None);
        assert_eq!(grown_capacity(16, 0.5, 8).unwrap(), Some(32));
        assert_eq!(grown_capacity(4, 0.1, 1).unwrap(), Some(32));
        let top = 1usize << (usize::BITS - 1);
        assert_eq!(
            grown_capacity(top, 0.5, top),
            Err(TableError::CapacityOverflow(top))
        );
        assert_eq!(
            grown_capacity(MAXIMUM_CAPACITY / 2, 1.0, MAXIMUM_CAPACITY / 2).unwrap(),
            Some(MAXIMUM_CAPACITY)
        );
        assert_eq!(
            grown_capacity(MAXIMUM_CAPACITY, 1.0, MAXIMUM_CAPACITY),
            Err(TableError::CapacityOverflow(MAXIMUM_CAPACITY))
        );
    }

    /// Invariant: a load factor so small that no slot count up to the
    /// ceiling clears one entry is refused instead of allocating.
    #[test]
    fn tiny_load_factor_stops_at_slot_ceiling() {
        assert_eq!(
            grown_capacity(16, 1e-9, 1),
            Err(TableError::CapacityOverflow(16))
        );

        let mut t: Table<u32, u32> = Table::with_capacity_and_load_factor(16, 1e-9).unwrap();
        assert_eq!(t.put(1, 1), Err(TableError::CapacityOverflow(16)));
        assert!(t.is_empty());
        assert_eq!(t.capacity(), 16);
        assert_eq!(t.get(&1), None);
    }

    #[test]
    fn debug_shows_bookkeeping() {
        let t: Table<&str, i32> = Table::new();
        let s = format!("{:?}", t);
        assert!(s.contains("capacity: 16"));
        assert!(s.contains("threshold: 8"));
    }
}
