//! Iteration over every payload in a map: the newer table first, then the
//! older one; within a table, slot order then chain order.

use crate::bucket_table::BucketTable;
use crate::node::{node_of, Arena, Linked};
use core::iter::FusedIterator;

/// Iterator returned by [`HMap::iter`](crate::HMap::iter).
///
/// It borrows both the map and the arena, so neither can be mutated (and no
/// migration step can run) while it is alive.
pub struct Iter<'a, A: Arena + ?Sized> {
    arena: &'a A,
    tables: [&'a BucketTable<A::Id>; 2],
    table: usize,
    slot: usize,
    cur: Option<A::Id>,
    remaining: usize,
}

impl<'a, A: Arena + ?Sized> Iter<'a, A> {
    pub(crate) fn new(
        arena: &'a A,
        newer: &'a BucketTable<A::Id>,
        older: &'a BucketTable<A::Id>,
    ) -> Self {
        Self {
            arena,
            tables: [newer, older],
            table: 0,
            slot: 0,
            cur: None,
            remaining: newer.len() + older.len(),
        }
    }
}

impl<'a, A: Arena + ?Sized> Iterator for Iter<'a, A> {
    type Item = (A::Id, &'a A::Item);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.cur {
                let node = node_of(self.arena, id);
                self.cur = node.link().next();
                self.remaining -= 1;
                return Some((id, node));
            }
            let table = *self.tables.get(self.table)?;
            if self.slot < table.capacity() {
                self.cur = table.slot_head(self.slot);
                self.slot += 1;
            } else {
                self.table += 1;
                self.slot = 0;
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, A: Arena + ?Sized> ExactSizeIterator for Iter<'a, A> {}

impl<'a, A: Arena + ?Sized> FusedIterator for Iter<'a, A> {}
