//! HMap: the public map facade over two bucket tables.

use crate::bucket_table::BucketTable;
use crate::config::Config;
use crate::error::MapError;
use crate::iter::Iter;
use crate::migration::{Migration, MigrationProgress};
use crate::node::{Arena, Linked};
use core::fmt::Debug;

/// Chained hash map over payloads stored in a caller-owned [`Arena`].
///
/// The map holds a *newer* table that receives every insert and, while a
/// migration episode is running, an *older* table being drained into it.
/// Every `lookup`, `insert` and `delete` performs one bounded migration step,
/// so growth cost is spread across ordinary traffic. Nothing runs in the
/// background: a map that is never touched again after growth started stays
/// half-migrated, holding both slot arrays, until its next operation.
///
/// The map stores arena ids only. Payloads are never allocated, copied or
/// freed by the map; only their embedded [`Link`](crate::Link) is rewritten.
/// All methods taking an arena must be given the same arena every time.
///
/// Not `Clone`: a copy would share chains with the original through the
/// payload links.
///
/// ```compile_fail
/// use progressive_hmap::HMap;
///
/// let m: HMap<usize> = HMap::new();
/// let _copy = m.clone();
/// ```
#[derive(Debug)]
pub struct HMap<Id> {
    newer: BucketTable<Id>,
    migration: Migration<Id>,
    config: Config,
}

impl<Id: Copy + Eq + Debug> Default for HMap<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + Eq + Debug> HMap<Id> {
    /// An empty map with the default [`Config`]. Nothing is allocated until
    /// the first insert.
    pub fn new() -> Self {
        Self {
            newer: BucketTable::new(),
            migration: Migration::new(),
            config: Config::new(),
        }
    }

    pub fn with_config(config: Config) -> Result<Self, MapError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// An empty map whose first table has `capacity` slots (rounded up to a
    /// power of two).
    pub fn with_capacity(capacity: usize) -> Result<Self, MapError> {
        Self::with_capacity_and_config(capacity, Config::new())
    }

    /// A presized map with a custom [`Config`]. `capacity` takes the place of
    /// `config.initial_capacity` for the first table.
    pub fn with_capacity_and_config(capacity: usize, config: Config) -> Result<Self, MapError> {
        let mut m = Self::with_config(config)?;
        m.reserve(capacity)?;
        Ok(m)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of payloads across both tables.
    #[inline]
    pub fn len(&self) -> usize {
        self.newer.len() + self.migration.older().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot count of the newer table; 0 before the first allocation.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.newer.capacity()
    }

    #[inline]
    pub fn is_migrating(&self) -> bool {
        self.migration.is_active()
    }

    pub fn migration_progress(&self) -> Option<MigrationProgress> {
        self.migration.progress()
    }

    /// Size the first table ahead of time. Only takes effect while nothing
    /// has been allocated yet; afterwards use [`resize`](Self::resize).
    pub fn reserve(&mut self, capacity: usize) -> Result<(), MapError> {
        if self.newer.is_allocated() {
            return Ok(());
        }
        self.newer = BucketTable::try_with_capacity(capacity)?;
        tracing::debug!(capacity = self.newer.capacity(), "reserved");
        Ok(())
    }

    fn help_migrate<A>(&mut self, arena: &mut A)
    where
        A: Arena<Id = Id> + ?Sized,
    {
        self.migration
            .step(&mut self.newer, arena, self.config.migration_work);
    }

    /// Find the payload with hash code `hcode` for which `eq` holds,
    /// searching the newer table and then the older one.
    pub fn lookup<A, F>(&mut self, arena: &mut A, hcode: u64, mut eq: F) -> Option<Id>
    where
        A: Arena<Id = Id> + ?Sized,
        F: FnMut(&A::Item) -> bool,
    {
        self.help_migrate(arena);
        let arena = &*arena;
        if let Some(from) = self.newer.lookup(arena, hcode, &mut eq) {
            return self.newer.target(arena, from);
        }
        let older = self.migration.older();
        older
            .lookup(arena, hcode, eq)
            .and_then(|from| older.target(arena, from))
    }

    /// [`lookup`](Self::lookup) driven by a probe payload that is not stored
    /// in the arena. `eq` receives the stored candidate and the probe.
    pub fn lookup_node<A, F>(&mut self, arena: &mut A, key: &A::Item, mut eq: F) -> Option<Id>
    where
        A: Arena<Id = Id> + ?Sized,
        F: FnMut(&A::Item, &A::Item) -> bool,
    {
        let hcode = key.link().hash_code();
        self.lookup(arena, hcode, |n| eq(n, key))
    }

    /// Insert the payload `id` into the newer table.
    ///
    /// No uniqueness check is made; callers that need unique keys look up
    /// first. Fails only when the very first table cannot be allocated, in
    /// which case nothing is linked. A failed growth allocation is absorbed
    /// and retried on a later insert.
    pub fn insert<A>(&mut self, arena: &mut A, id: Id) -> Result<(), MapError>
    where
        A: Arena<Id = Id> + ?Sized,
    {
        if !self.newer.is_allocated() {
            self.newer = BucketTable::try_with_capacity(self.config.initial_capacity)?;
        }
        self.newer.insert(arena, id);

        if !self.migration.is_active()
            && self.newer.len() >= self.config.growth_threshold(self.newer.capacity())
        {
            let target = self.newer.capacity().saturating_mul(2);
            self.migration.trigger(&mut self.newer, target);
        }
        self.help_migrate(arena);
        Ok(())
    }

    /// Unlink the payload with hash code `hcode` for which `eq` holds and
    /// return its id. The payload stays in the arena; it is the caller's to
    /// keep or drop.
    pub fn delete<A, F>(&mut self, arena: &mut A, hcode: u64, mut eq: F) -> Option<Id>
    where
        A: Arena<Id = Id> + ?Sized,
        F: FnMut(&A::Item) -> bool,
    {
        self.help_migrate(arena);
        if let Some(from) = self.newer.lookup(&*arena, hcode, &mut eq) {
            return self.newer.detach(arena, from);
        }
        let older = self.migration.older_mut();
        let from = older.lookup(&*arena, hcode, eq)?;
        let id = older.detach(arena, from);
        self.migration.finish_if_drained();
        id
    }

    /// [`delete`](Self::delete) driven by a probe payload.
    pub fn delete_node<A, F>(&mut self, arena: &mut A, key: &A::Item, mut eq: F) -> Option<Id>
    where
        A: Arena<Id = Id> + ?Sized,
        F: FnMut(&A::Item, &A::Item) -> bool,
    {
        let hcode = key.link().hash_code();
        self.delete(arena, hcode, |n| eq(n, key))
    }

    /// Requested capacity after validation and the live-count floor.
    fn realized_capacity(&self, target: usize) -> Result<usize, MapError> {
        if !target.is_power_of_two() {
            return Err(MapError::InvalidCapacity { requested: target });
        }
        let len = self.len();
        if target >= len {
            return Ok(target);
        }
        len.checked_next_power_of_two()
            .ok_or(MapError::InvalidCapacity { requested: target })
    }

    /// Move the map to a table of `target` slots through a progressive
    /// migration.
    ///
    /// `target` must be a non-zero power of two. A target below the live
    /// count is raised to the smallest power of two that holds every entry.
    /// Any migration already running is first finished synchronously, which
    /// makes this the one operation whose latency grows with the map size.
    /// The new episode gets a single step here; later operations carry it
    /// forward.
    pub fn resize<A>(&mut self, arena: &mut A, target: usize) -> Result<(), MapError>
    where
        A: Arena<Id = Id> + ?Sized,
    {
        let target = self.realized_capacity(target)?;
        if self.newer.capacity() == target && !self.migration.is_active() {
            return Ok(());
        }

        // Draining never changes the newer table's capacity, so the new slot
        // array can be allocated up front. A failure leaves the map untouched.
        let fresh = if self.newer.capacity() == target {
            None
        } else {
            Some(BucketTable::try_with_capacity(target)?)
        };
        self.migration.drain(&mut self.newer, arena);
        let Some(fresh) = fresh else {
            return Ok(());
        };

        tracing::debug!(
            from = self.newer.capacity(),
            to = target,
            entries = self.len(),
            "resize"
        );
        if !self.newer.is_allocated() {
            self.newer = fresh;
            return Ok(());
        }
        self.migration.begin(&mut self.newer, fresh);
        self.help_migrate(arena);
        Ok(())
    }

    /// Like [`resize`](Self::resize), but rehashes every entry into the new
    /// table before returning. No migration is in flight afterwards.
    pub fn resize_immediate<A>(&mut self, arena: &mut A, target: usize) -> Result<(), MapError>
    where
        A: Arena<Id = Id> + ?Sized,
    {
        let target = self.realized_capacity(target)?;
        if self.newer.capacity() == target && !self.migration.is_active() {
            return Ok(());
        }

        let mut fresh = BucketTable::try_with_capacity(target)?;
        tracing::debug!(
            from = self.newer.capacity(),
            to = target,
            entries = self.len(),
            "immediate resize"
        );
        let mut older = self.migration.take_older();
        older.move_all_into(&mut fresh, arena);
        self.newer.move_all_into(&mut fresh, arena);
        self.newer = fresh;
        Ok(())
    }

    /// Release both slot arrays and forget every entry. Payloads are left in
    /// the arena untouched. The configuration is kept.
    pub fn clear(&mut self) {
        if self.newer.is_allocated() || self.migration.is_active() {
            tracing::debug!(entries = self.len(), "clear");
        }
        self.newer = BucketTable::new();
        self.migration = Migration::new();
    }

    /// Visit every payload: newer table first, then older; slot order, then
    /// chain order. Does not advance migration.
    pub fn iter<'a, A>(&'a self, arena: &'a A) -> Iter<'a, A>
    where
        A: Arena<Id = Id> + ?Sized,
    {
        Iter::new(arena, &self.newer, self.migration.older())
    }

    #[cfg(test)]
    pub(crate) fn newer_len(&self) -> usize {
        self.newer.len()
    }

    #[cfg(test)]
    pub(crate) fn older_len(&self) -> usize {
        self.migration.older().len()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent<A>(&self, arena: &A)
    where
        A: Arena<Id = Id> + ?Sized,
    {
        self.newer.assert_consistent(arena);
        self.migration.older().assert_consistent(arena);
        assert_eq!(self.is_migrating(), self.migration.older().is_allocated());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Link;
    use slotmap::{DefaultKey, SlotMap};

    #[derive(Debug)]
    struct Item {
        link: Link<DefaultKey>,
        key: String,
        value: i32,
    }

    impl Linked<DefaultKey> for Item {
        fn link(&self) -> &Link<DefaultKey> {
            &self.link
        }
        fn link_mut(&mut self) -> &mut Link<DefaultKey> {
            &mut self.link
        }
    }

    // Identity-ish hash so tests control slot placement.
    fn item(key: &str, hcode: u64, value: i32) -> Item {
        Item {
            link: Link::new(hcode),
            key: key.to_string(),
            value,
        }
    }

    fn probe(key: &str, hcode: u64) -> Item {
        item(key, hcode, 0)
    }

    fn key_eq(a: &Item, b: &Item) -> bool {
        a.key == b.key
    }

    type Store = SlotMap<DefaultKey, Item>;

    fn populate(map: &mut HMap<DefaultKey>, arena: &mut Store, n: u64) -> Vec<DefaultKey> {
        (0..n)
            .map(|i| {
                let id = arena.insert(item(&format!("k{}", i), i, i as i32));
                map.insert(arena, id).unwrap();
                id
            })
            .collect()
    }

    #[test]
    fn new_map_allocates_lazily() {
        let mut arena = Store::new();
        let mut m = HMap::new();
        assert_eq!(m.capacity(), 0);
        assert!(m.is_empty());
        let id = arena.insert(item("a", 1, 1));
        m.insert(&mut arena, id).unwrap();
        assert_eq!(m.capacity(), 4);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn growth_triggers_at_load_factor() {
        let mut arena = Store::new();
        let mut m = HMap::new();
        populate(&mut m, &mut arena, 31);
        assert!(!m.is_migrating());
        assert_eq!(m.capacity(), 4);

        // 32 entries in 4 slots reaches 4 * 8.
        let id = arena.insert(item("k31", 31, 31));
        m.insert(&mut arena, id).unwrap();
        assert_eq!(m.capacity(), 8);
        // One step of 128 moves drains all 32 at once.
        assert!(!m.is_migrating());
        assert_eq!(m.len(), 32);
        m.assert_consistent(&arena);
    }

    #[test]
    fn migration_spreads_over_operations() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(4)).unwrap();
        let ids = populate(&mut m, &mut arena, 32);
        assert!(m.is_migrating());
        assert_eq!(m.newer_len() + m.older_len(), 32);

        // Every key stays findable while migration proceeds.
        for (i, &id) in ids.iter().enumerate() {
            let found = m.lookup_node(&mut arena, &probe(&format!("k{}", i), i as u64), key_eq);
            assert_eq!(found, Some(id));
            m.assert_consistent(&arena);
        }
        assert!(!m.is_migrating());
        assert_eq!(m.newer_len(), 32);
    }

    #[test]
    fn lookup_steps_migration_on_reads() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(1)).unwrap();
        populate(&mut m, &mut arena, 32);
        let before = m.migration_progress().unwrap().remaining;
        assert!(m.lookup(&mut arena, 999, |_| false).is_none());
        let after = m.migration_progress().unwrap().remaining;
        assert_eq!(after + 1, before);
    }

    #[test]
    fn delete_from_older_table_mid_migration() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(1)).unwrap();
        populate(&mut m, &mut arena, 32);
        assert!(m.older_len() > 20);

        let removed = m
            .delete_node(&mut arena, &probe("k30", 30), key_eq)
            .expect("present");
        assert_eq!(arena[removed].value, 30);
        assert_eq!(m.len(), 31);
        assert!(m.lookup_node(&mut arena, &probe("k30", 30), key_eq).is_none());
        m.assert_consistent(&arena);
    }

    #[test]
    fn deleting_last_older_entry_ends_episode() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(
            Config::new()
                .with_initial_capacity(1)
                .with_max_load_factor(3)
                .with_migration_work(1),
        )
        .unwrap();
        // Three entries in one slot trigger growth; the first step moves k2.
        populate(&mut m, &mut arena, 3);
        assert!(m.is_migrating());
        assert_eq!(m.older_len(), 2);

        // The delete's own step moves k1; k0 is then unlinked from the older
        // table, which releases it.
        let got = m.delete(&mut arena, 0, |i| i.key == "k0");
        assert_eq!(got.map(|id| arena[id].value), Some(0));
        assert!(!m.is_migrating());
        assert_eq!(m.len(), 2);
        m.assert_consistent(&arena);
    }

    #[test]
    fn delete_absent_is_none() {
        let mut arena = Store::new();
        let mut m = HMap::new();
        assert!(m.delete(&mut arena, 5, |_| true).is_none());
        populate(&mut m, &mut arena, 3);
        assert!(m.delete_node(&mut arena, &probe("zz", 1), key_eq).is_none());
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn resize_rejects_invalid_targets_without_side_effects() {
        let mut arena = Store::new();
        let mut m = HMap::new();
        populate(&mut m, &mut arena, 5);
        for bad in [0usize, 3, 12, 100] {
            assert_eq!(
                m.resize(&mut arena, bad),
                Err(MapError::InvalidCapacity { requested: bad })
            );
            assert_eq!(
                m.resize_immediate(&mut arena, bad),
                Err(MapError::InvalidCapacity { requested: bad })
            );
        }
        assert_eq!(m.capacity(), 4);
        assert_eq!(m.len(), 5);
    }

    #[test]
    fn resize_floors_at_live_count() {
        let mut arena = Store::new();
        let mut m = HMap::new();
        populate(&mut m, &mut arena, 20);
        m.resize(&mut arena, 8).unwrap();
        assert_eq!(m.capacity(), 32);
        assert_eq!(m.len(), 20);
        m.assert_consistent(&arena);
    }

    #[test]
    fn resize_leaves_progressive_episode_behind() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(2)).unwrap();
        populate(&mut m, &mut arena, 16);
        assert!(!m.is_migrating());
        m.resize(&mut arena, 64).unwrap();
        assert_eq!(m.capacity(), 64);
        assert!(m.is_migrating());
        assert_eq!(m.older_len(), 14);
    }

    #[test]
    fn resize_drains_running_episode_first() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(1)).unwrap();
        populate(&mut m, &mut arena, 32);
        assert!(m.is_migrating());
        assert_eq!(m.capacity(), 8);

        // The 4 -> 8 episode is finished first, then an 8 -> 64 one begins.
        m.resize(&mut arena, 64).unwrap();
        assert_eq!(m.capacity(), 64);
        let p = m.migration_progress().unwrap();
        assert_eq!(p.older_capacity, 8);
        assert_eq!(p.remaining, 31);
    }

    #[test]
    fn resize_to_capacity_reached_by_draining_stops_there() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(
            Config::new()
                .with_max_load_factor(2)
                .with_migration_work(1),
        )
        .unwrap();
        populate(&mut m, &mut arena, 8);
        assert!(m.is_migrating());
        assert_eq!(m.capacity(), 8);

        m.resize(&mut arena, 8).unwrap();
        assert!(!m.is_migrating());
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.newer_len(), 8);
    }

    #[test]
    fn resize_same_capacity_is_noop() {
        let mut arena = Store::new();
        let mut m = HMap::new();
        populate(&mut m, &mut arena, 3);
        m.resize(&mut arena, 4).unwrap();
        assert_eq!(m.capacity(), 4);
        assert!(!m.is_migrating());
    }

    #[test]
    fn resize_on_unallocated_map_allocates_directly() {
        let mut arena = Store::new();
        let mut m: HMap<DefaultKey> = HMap::new();
        m.resize(&mut arena, 16).unwrap();
        assert_eq!(m.capacity(), 16);
        assert!(!m.is_migrating());
    }

    #[test]
    fn resize_immediate_rehashes_everything() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(1)).unwrap();
        let ids = populate(&mut m, &mut arena, 40);
        assert!(m.is_migrating());

        m.resize_immediate(&mut arena, 128).unwrap();
        assert!(!m.is_migrating());
        assert_eq!(m.capacity(), 128);
        assert_eq!(m.newer_len(), 40);
        m.assert_consistent(&arena);
        for (i, &id) in ids.iter().enumerate() {
            assert_eq!(m.lookup(&mut arena, i as u64, |n| n.value == i as i32), Some(id));
        }

        // Shrink with floor.
        m.resize_immediate(&mut arena, 2).unwrap();
        assert_eq!(m.capacity(), 64);
        assert_eq!(m.len(), 40);
    }

    #[test]
    fn reserve_only_affects_unallocated_map() {
        let mut arena = Store::new();
        let mut m = HMap::with_capacity(100).unwrap();
        assert_eq!(m.capacity(), 128);
        m.reserve(1024).unwrap();
        assert_eq!(m.capacity(), 128);
        populate(&mut m, &mut arena, 10);
        assert_eq!(m.capacity(), 128);

        let mut fresh: HMap<DefaultKey> = HMap::new();
        assert_eq!(
            fresh.reserve(0),
            Err(MapError::InvalidCapacity { requested: 0 })
        );
        assert_eq!(fresh.capacity(), 0);
    }

    #[test]
    fn with_config_rejects_invalid() {
        assert!(HMap::<DefaultKey>::with_config(Config::new().with_initial_capacity(3)).is_err());
    }

    #[test]
    fn clear_releases_everything_and_map_is_reusable() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(1)).unwrap();
        populate(&mut m, &mut arena, 40);
        assert!(m.is_migrating());
        m.clear();
        assert_eq!(m.len(), 0);
        assert_eq!(m.capacity(), 0);
        assert!(!m.is_migrating());
        m.clear();
        assert_eq!(m.len(), 0);
        assert_eq!(m.config().migration_work, 1);

        let id = arena.insert(item("again", 7, 7));
        m.insert(&mut arena, id).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.iter(&arena).count(), 1);
        assert_eq!(m.lookup(&mut arena, 7, |n| n.key == "again"), Some(id));
    }

    #[test]
    fn failed_resize_leaves_episode_in_flight() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(1)).unwrap();
        populate(&mut m, &mut arena, 40);
        let before = m.migration_progress();
        assert!(before.is_some());

        // Far too many slots to allocate.
        let err = m.resize(&mut arena, 1 << 60);
        assert!(matches!(err, Err(MapError::AllocationFailure(_))), "{:?}", err);
        assert_eq!(m.migration_progress(), before);
        assert_eq!((m.capacity(), m.len()), (8, 40));

        let err = m.resize_immediate(&mut arena, 1 << 60);
        assert!(matches!(err, Err(MapError::AllocationFailure(_))), "{:?}", err);
        assert_eq!(m.migration_progress(), before);
        m.assert_consistent(&arena);
        for i in 0..40u64 {
            assert!(m.lookup_node(&mut arena, &probe(&format!("k{}", i), i), key_eq).is_some());
        }
    }

    #[test]
    fn absorbed_growth_failure_is_retried_on_next_insert() {
        let mut arena = Store::new();
        let mut m = HMap::new();
        populate(&mut m, &mut arena, 31);

        // The 32nd insert reaches the threshold, but its growth allocation fails.
        let id = arena.insert(item("k31", 31, 31));
        m.newer.insert(&mut arena, id);
        assert!(!m.migration.trigger(&mut m.newer, 1 << 60));
        assert!(!m.is_migrating());
        assert_eq!((m.capacity(), m.len()), (4, 32));

        // Still over the threshold, so the next insert grows.
        let id = arena.insert(item("k32", 32, 32));
        m.insert(&mut arena, id).unwrap();
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.len(), 33);
        m.assert_consistent(&arena);
    }

    #[test]
    fn presized_map_keeps_custom_config() {
        let mut arena = Store::new();
        let config = Config::new().with_max_load_factor(1).with_migration_work(2);
        let mut m = HMap::with_capacity_and_config(16, config).unwrap();
        assert_eq!(m.capacity(), 16);
        assert_eq!(m.config(), &config);

        // Load factor 1: the 16th entry triggers growth.
        populate(&mut m, &mut arena, 16);
        assert_eq!(m.capacity(), 32);
        assert!(m.is_migrating());

        assert!(HMap::<DefaultKey>::with_capacity_and_config(
            16,
            Config::new().with_migration_work(0)
        )
        .is_err());
    }

    #[test]
    fn iter_covers_both_tables_mid_migration() {
        let mut arena = Store::new();
        let mut m = HMap::with_config(Config::new().with_migration_work(1)).unwrap();
        populate(&mut m, &mut arena, 50);
        assert!(m.is_migrating());
        let mut values: Vec<i32> = m.iter(&arena).map(|(_, n)| n.value).collect();
        values.sort_unstable();
        assert_eq!(values, (0..50).collect::<Vec<_>>());
    }
}
