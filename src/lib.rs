//! progressive-hmap: a single-threaded chained hash map whose payloads
//! carry their own links and live in a caller-owned arena, and which grows
//! by progressive rehashing so that no single insert pays for a full rehash.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an embeddable associative container where the caller owns every
//!   payload and the map owns only its slot arrays.
//! - Layers:
//!   - BucketTable<Id>: fixed-capacity power-of-two array of chain heads.
//!     Chains are threaded through the payloads' embedded `Link`s. Knows
//!     nothing about migration.
//!   - Migration<Id>: owns the older table and a cursor; moves a bounded
//!     number of payloads into the newer table per step and releases the
//!     older slot array when it runs dry.
//!   - HMap<Id>: public facade. Newer table plus migration state; every
//!     lookup/insert/delete runs one migration step first (insert: after).
//!   - Iter: lazy walk of newer then older, slot order then chain order.
//!
//! Constraints
//! - Single-threaded. Every operation runs to completion; there is no
//!   background task. Share across threads only behind an external lock
//!   around the whole map and its arena.
//! - The map never allocates, copies, or frees a payload. It reads the hash
//!   code in each payload's `Link` and rewrites the successor field only.
//! - Hash codes are precomputed by the caller (see `HashCoder` for a
//!   ready-made source). Equality is a caller-supplied closure and runs only
//!   after a hash code match.
//! - No uniqueness enforcement: callers look up before inserting when keys
//!   must be unique.
//! - HMap does not implement `Clone`. The chains live in the payloads'
//!   links, so two maps would share and corrupt them.
//!
//! Intrusive embedding
//! - A payload embeds one `Link<Id>` and implements `Linked<Id>`. Payloads
//!   live in an `Arena` (a `slotmap::SlotMap`, a `Vec`, or a slice) and the
//!   map stores arena ids instead of addresses. Recovering the payload from
//!   a link is an arena lookup, so no offset arithmetic or unsafe code is
//!   needed.
//! - Removing a payload from its arena while it is still linked breaks the
//!   contract; the map panics when it next reaches the missing id.
//!
//! Growth
//! - The first insert allocates `Config::initial_capacity` slots (4).
//! - When the newer table holds `capacity * max_load_factor` entries (8 per
//!   slot) and no migration is running, a table of twice the size becomes
//!   the newer table and the old one starts draining, `migration_work`
//!   (128) payloads per step.
//! - Growth allocation failure is absorbed; the insert still succeeds and a
//!   later insert retries. Only the first lazy allocation can fail an insert.
//! - `resize` drains any running episode synchronously, then seeds a new
//!   progressive one toward the requested size and takes a single step. A
//!   map left alone after `resize` keeps both slot arrays until its next
//!   operation. `resize_immediate` rehashes everything before returning.
//!
//! Iteration and mutation
//! - `HMap::iter` borrows the map and the arena immutably, so the borrow
//!   checker rules out mutation during iteration. Iteration never advances
//!   migration.
//!
//! Errors
//! - `MapError::AllocationFailure` when a slot array cannot be allocated,
//!   `MapError::InvalidCapacity` for zero or non-power-of-two requests. An
//!   absent key is `None`, never an error.

mod bucket_table;
mod config;
mod error;
mod hash_code;
mod hmap;
mod hmap_proptest;
mod iter;
mod migration;
mod node;

// Public surface
pub use config::{
    Config, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_LOAD_FACTOR, DEFAULT_MIGRATION_WORK,
};
pub use error::MapError;
pub use hash_code::HashCoder;
pub use hmap::HMap;
pub use iter::Iter;
pub use migration::MigrationProgress;
pub use node::{Arena, Link, Linked};
