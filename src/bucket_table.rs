//! BucketTable: fixed-capacity array of chain heads.
//!
//! Each slot holds the id of the first payload in its chain; the rest of the
//! chain is threaded through the payloads' embedded [`Link`]s. A payload
//! reachable from slot `i` always satisfies `hash_code & mask == i`.
//!
//! The table knows nothing about migration. It allocates its slot array
//! fallibly and never touches the payloads beyond their links.

use crate::error::MapError;
use crate::node::{link_mut_of, node_of, Arena, Linked};
use core::fmt::Debug;

/// Position of a chain link that points at a payload: either a slot head
/// or the successor field of the preceding payload.
///
/// Returned by [`BucketTable::lookup`] so that [`BucketTable::detach`] can
/// unlink without searching the chain again.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlotRef<Id> {
    Head(usize),
    After(Id),
}

#[derive(Debug)]
pub struct BucketTable<Id> {
    slots: Box<[Option<Id>]>,
    mask: usize,
    len: usize,
}

impl<Id> Default for BucketTable<Id> {
    fn default() -> Self {
        Self {
            slots: Box::default(),
            mask: 0,
            len: 0,
        }
    }
}

impl<Id: Copy + Eq + Debug> BucketTable<Id> {
    /// An unallocated table: no slots, nothing inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a table with `capacity` empty slots, rounding up to the next
    /// power of two.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, MapError> {
        let n = match capacity.checked_next_power_of_two() {
            Some(n) if capacity > 0 => n,
            _ => {
                return Err(MapError::InvalidCapacity {
                    requested: capacity,
                })
            }
        };
        let mut slots = Vec::new();
        slots.try_reserve_exact(n)?;
        slots.resize(n, None);
        Ok(Self {
            slots: slots.into_boxed_slice(),
            mask: n - 1,
            len: 0,
        })
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Number of slots; 0 when unallocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn slot_of(&self, hcode: u64) -> usize {
        (hcode & self.mask as u64) as usize
    }

    /// First payload of slot `i`.
    #[inline]
    pub fn slot_head(&self, i: usize) -> Option<Id> {
        self.slots.get(i).copied().flatten()
    }

    /// Prepend `id` to the chain of its slot. No duplicate check is made.
    ///
    /// The table must be allocated.
    pub fn insert<A>(&mut self, arena: &mut A, id: Id)
    where
        A: Arena<Id = Id> + ?Sized,
    {
        debug_assert!(self.is_allocated(), "insert into unallocated table");
        let slot = self.slot_of(node_of(&*arena, id).link().hash_code());
        let head = self.slots[slot];
        link_mut_of(arena, id).set_next(head);
        self.slots[slot] = Some(id);
        self.len += 1;
    }

    /// Find the link that points at the first payload with hash code `hcode`
    /// for which `eq` holds. `eq` only runs on hash code matches.
    pub fn lookup<A, F>(&self, arena: &A, hcode: u64, mut eq: F) -> Option<SlotRef<Id>>
    where
        A: Arena<Id = Id> + ?Sized,
        F: FnMut(&A::Item) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }
        let slot = self.slot_of(hcode);
        let mut from = SlotRef::Head(slot);
        let mut cur = self.slots[slot];
        while let Some(id) = cur {
            let node = node_of(arena, id);
            if node.link().hash_code() == hcode && eq(node) {
                return Some(from);
            }
            from = SlotRef::After(id);
            cur = node.link().next();
        }
        None
    }

    /// The payload `from` points at, if any.
    pub fn target<A>(&self, arena: &A, from: SlotRef<Id>) -> Option<Id>
    where
        A: Arena<Id = Id> + ?Sized,
    {
        match from {
            SlotRef::Head(i) => self.slots.get(i).copied().flatten(),
            SlotRef::After(prev) => node_of(arena, prev).link().next(),
        }
    }

    /// Unlink the payload `from` points at and return its id. The detached
    /// payload's successor is cleared so it can be reinserted anywhere.
    pub fn detach<A>(&mut self, arena: &mut A, from: SlotRef<Id>) -> Option<Id>
    where
        A: Arena<Id = Id> + ?Sized,
    {
        let id = self.target(&*arena, from)?;
        let next = node_of(&*arena, id).link().next();
        match from {
            SlotRef::Head(i) => self.slots[i] = next,
            SlotRef::After(prev) => link_mut_of(arena, prev).set_next(next),
        }
        link_mut_of(arena, id).set_next(None);
        self.len -= 1;
        Some(id)
    }

    /// Move every payload into `dest`, leaving this table allocated but empty.
    pub(crate) fn move_all_into<A>(&mut self, dest: &mut BucketTable<Id>, arena: &mut A)
    where
        A: Arena<Id = Id> + ?Sized,
    {
        for i in 0..self.slots.len() {
            while let Some(id) = self.detach(arena, SlotRef::Head(i)) {
                dest.insert(arena, id);
            }
        }
        debug_assert_eq!(self.len, 0);
    }

    /// Walk every chain and check slot membership and the live count.
    #[cfg(test)]
    pub(crate) fn assert_consistent<A>(&self, arena: &A)
    where
        A: Arena<Id = Id> + ?Sized,
    {
        let mut seen = 0;
        for (i, head) in self.slots.iter().enumerate() {
            let mut cur = *head;
            while let Some(id) = cur {
                let link = node_of(arena, id).link();
                assert_eq!(self.slot_of(link.hash_code()), i, "{:?} in wrong slot", id);
                seen += 1;
                cur = link.next();
            }
        }
        assert_eq!(seen, self.len, "chain walk disagrees with live count");
    }
}
