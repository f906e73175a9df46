#![cfg(test)]

// Deterministic hashers shared by the unit and property tests.

use std::hash::{BuildHasher, Hasher};

#[derive(Clone, Default)]
pub(crate) struct ConstBuildHasher;
pub(crate) struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    } // every key starts probing at slot 0
}

/// `u64` keys hash to themselves, so `key % capacity` is the raw slot.
#[derive(Clone, Default)]
pub(crate) struct IdentityBuildHasher;
#[derive(Default)]
pub(crate) struct IdentityHasher(u64);
impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher::default()
    }
}
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}
