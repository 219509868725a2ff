//! HashCoder: turns `Hash` keys into the `u64` codes stored in [`Link`]s.
//!
//! The map itself never hashes anything; it only compares precomputed codes.
//! This helper is for callers who do not already have a hash function of
//! their own. Codes are only comparable when produced by the same
//! `HashCoder`, so keep one per map.

use crate::node::Link;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

#[derive(Clone, Debug, Default)]
pub struct HashCoder<S = DefaultHashBuilder> {
    hasher: S,
}

impl HashCoder {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<S: BuildHasher> HashCoder<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }

    #[inline]
    pub fn hash_code<Q>(&self, key: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(key)
    }

    /// A detached link carrying the code for `key`.
    #[inline]
    pub fn link<Id, Q>(&self, key: &Q) -> Link<Id>
    where
        Q: ?Sized + Hash,
    {
        Link::new(self.hash_code(key))
    }
}
