//! Embedded links and the arenas that own linked payloads.
//!
//! A payload joins a map by embedding one [`Link`] and implementing
//! [`Linked`]. Payloads live in a caller-owned [`Arena`]; the map only ever
//! stores arena ids, reads `Link::hash_code`, and rewrites `Link` successors.

use core::fmt::Debug;
use slotmap::{Key, SlotMap};

/// Chain link embedded in a payload: the precomputed hash code and the id of
/// the next payload in the same slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link<Id> {
    hcode: u64,
    next: Option<Id>,
}

impl<Id> Link<Id> {
    /// A detached link carrying `hcode`. The code must not change while the
    /// payload is inserted.
    pub const fn new(hcode: u64) -> Self {
        Self { hcode, next: None }
    }

    #[inline]
    pub fn hash_code(&self) -> u64 {
        self.hcode
    }

    #[inline]
    pub(crate) fn next(&self) -> Option<Id>
    where
        Id: Copy,
    {
        self.next
    }

    #[inline]
    pub(crate) fn set_next(&mut self, next: Option<Id>) {
        self.next = next;
    }
}

/// Implemented by payloads that embed a [`Link`].
pub trait Linked<Id> {
    fn link(&self) -> &Link<Id>;
    fn link_mut(&mut self) -> &mut Link<Id>;
}

impl<Id> Linked<Id> for Link<Id> {
    fn link(&self) -> &Link<Id> {
        self
    }
    fn link_mut(&mut self) -> &mut Link<Id> {
        self
    }
}

/// Caller-managed storage for linked payloads, addressed by `Id`.
///
/// The map never inserts into or removes from an arena. Removing a payload
/// from its arena while it is still inserted in a map is a contract
/// violation; the map panics when it next reaches that id.
pub trait Arena {
    type Id: Copy + Eq + Debug;
    type Item: Linked<Self::Id>;

    fn node(&self, id: Self::Id) -> Option<&Self::Item>;
    fn node_mut(&mut self, id: Self::Id) -> Option<&mut Self::Item>;
}

impl<K: Key, T: Linked<K>> Arena for SlotMap<K, T> {
    type Id = K;
    type Item = T;

    #[inline]
    fn node(&self, id: K) -> Option<&T> {
        self.get(id)
    }
    #[inline]
    fn node_mut(&mut self, id: K) -> Option<&mut T> {
        self.get_mut(id)
    }
}

impl<T: Linked<usize>> Arena for [T] {
    type Id = usize;
    type Item = T;

    #[inline]
    fn node(&self, id: usize) -> Option<&T> {
        <[T]>::get(self, id)
    }
    #[inline]
    fn node_mut(&mut self, id: usize) -> Option<&mut T> {
        <[T]>::get_mut(self, id)
    }
}

impl<T: Linked<usize>> Arena for Vec<T> {
    type Id = usize;
    type Item = T;

    #[inline]
    fn node(&self, id: usize) -> Option<&T> {
        self.as_slice().get(id)
    }
    #[inline]
    fn node_mut(&mut self, id: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(id)
    }
}

#[cold]
#[inline(never)]
fn dangling<Id: Debug>(id: Id) -> ! {
    panic!("node {:?} is linked into the map but missing from its arena", id)
}

#[inline]
pub(crate) fn node_of<A: Arena + ?Sized>(arena: &A, id: A::Id) -> &A::Item {
    match arena.node(id) {
        Some(n) => n,
        None => dangling(id),
    }
}

#[inline]
pub(crate) fn link_mut_of<A: Arena + ?Sized>(arena: &mut A, id: A::Id) -> &mut Link<A::Id> {
    match arena.node_mut(id) {
        Some(n) => n.link_mut(),
        None => dangling(id),
    }
}
