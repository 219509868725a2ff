//! Migration: incremental transfer from the older table into the newer one.
//!
//! A migration episode starts when the newer table is swapped out for a
//! larger (or explicitly sized) one; the displaced table becomes the older
//! table. Every map operation then calls [`Migration::step`], which moves a
//! bounded number of payloads across. When the older table runs dry its slot
//! array is released and the episode ends.
//!
//! A migration is in progress exactly when the older table is allocated.

use crate::bucket_table::{BucketTable, SlotRef};
use crate::node::Arena;
use core::fmt::Debug;
use core::mem;

/// Snapshot of an in-flight migration episode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MigrationProgress {
    /// Next older-table slot to drain.
    pub cursor: usize,
    /// Slot count of the older table.
    pub older_capacity: usize,
    /// Payloads still waiting in the older table.
    pub remaining: usize,
}

#[derive(Debug)]
pub(crate) struct Migration<Id> {
    older: BucketTable<Id>,
    cursor: usize,
}

impl<Id> Default for Migration<Id> {
    fn default() -> Self {
        Self {
            older: BucketTable::default(),
            cursor: 0,
        }
    }
}

impl<Id: Copy + Eq + Debug> Migration<Id> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.older.is_allocated()
    }

    #[inline]
    pub(crate) fn older(&self) -> &BucketTable<Id> {
        &self.older
    }

    #[inline]
    pub(crate) fn older_mut(&mut self) -> &mut BucketTable<Id> {
        &mut self.older
    }

    pub(crate) fn progress(&self) -> Option<MigrationProgress> {
        self.is_active().then(|| MigrationProgress {
            cursor: self.cursor,
            older_capacity: self.older.capacity(),
            remaining: self.older.len(),
        })
    }

    /// Start an episode: `fresh` becomes the newer table and the current
    /// newer table becomes the older one.
    pub(crate) fn begin(&mut self, newer: &mut BucketTable<Id>, fresh: BucketTable<Id>) {
        debug_assert!(!self.is_active(), "migration already in progress");
        self.older = mem::replace(newer, fresh);
        self.cursor = 0;
        tracing::debug!(
            from_capacity = self.older.capacity(),
            to_capacity = newer.capacity(),
            entries = self.older.len(),
            "migration started"
        );
    }

    /// Growth trigger: move the newer table aside for one of `target` slots.
    /// Allocation failure leaves everything as it was and returns false; a
    /// later insert retries.
    pub(crate) fn trigger(&mut self, newer: &mut BucketTable<Id>, target: usize) -> bool {
        if self.is_active() {
            return false;
        }
        match BucketTable::try_with_capacity(target) {
            Ok(fresh) => {
                self.begin(newer, fresh);
                true
            }
            Err(err) => {
                tracing::warn!(
                    capacity = newer.capacity(),
                    entries = newer.len(),
                    error = %err,
                    "growth deferred: could not allocate larger table"
                );
                false
            }
        }
    }

    /// Move up to `work` payloads from the older table into `newer`,
    /// draining slots in cursor order. Returns the number moved. A no-op when
    /// no migration is in progress.
    pub(crate) fn step<A>(&mut self, newer: &mut BucketTable<Id>, arena: &mut A, work: usize) -> usize
    where
        A: Arena<Id = Id> + ?Sized,
    {
        if !self.is_active() {
            return 0;
        }
        let mut moved = 0;
        while moved < work && !self.older.is_empty() {
            match self.older.detach(arena, SlotRef::Head(self.cursor)) {
                Some(id) => {
                    newer.insert(arena, id);
                    moved += 1;
                }
                None => self.cursor += 1,
            }
        }
        tracing::trace!(moved, cursor = self.cursor, remaining = self.older.len(), "migration step");
        self.finish_if_drained();
        moved
    }

    /// Run the episode to completion in one call.
    pub(crate) fn drain<A>(&mut self, newer: &mut BucketTable<Id>, arena: &mut A)
    where
        A: Arena<Id = Id> + ?Sized,
    {
        self.step(newer, arena, usize::MAX);
    }

    /// Release the older table once it holds nothing.
    pub(crate) fn finish_if_drained(&mut self) {
        if self.is_active() && self.older.is_empty() {
            tracing::debug!(capacity = self.older.capacity(), "migration finished");
            self.older = BucketTable::new();
            self.cursor = 0;
        }
    }

    /// Abandon the episode and hand back the older table with whatever it
    /// still holds.
    pub(crate) fn take_older(&mut self) -> BucketTable<Id> {
        self.cursor = 0;
        mem::take(&mut self.older)
    }
}
