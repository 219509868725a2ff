//! Tuning knobs for growth and migration.

use crate::error::MapError;

/// Slot count used for the first lazy allocation.
pub const DEFAULT_INITIAL_CAPACITY: usize = 4;
/// Entries per slot at which the newer table starts a migration episode.
pub const DEFAULT_MAX_LOAD_FACTOR: usize = 8;
/// Node moves performed by one migration step.
pub const DEFAULT_MIGRATION_WORK: usize = 128;

/// Growth and migration parameters for an [`HMap`](crate::HMap).
///
/// The defaults match the behavior most callers want: a 4-slot first table,
/// growth at 8 entries per slot, and 128 node moves per migration step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub initial_capacity: usize,
    pub max_load_factor: usize,
    pub migration_work: usize,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            migration_work: DEFAULT_MIGRATION_WORK,
        }
    }

    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub const fn with_max_load_factor(mut self, factor: usize) -> Self {
        self.max_load_factor = factor;
        self
    }

    pub const fn with_migration_work(mut self, work: usize) -> Self {
        self.migration_work = work;
        self
    }

    /// Check every field; `HMap::with_config` refuses a config that fails this.
    pub fn validate(&self) -> Result<(), MapError> {
        if !self.initial_capacity.is_power_of_two() {
            return Err(MapError::InvalidCapacity {
                requested: self.initial_capacity,
            });
        }
        if self.max_load_factor == 0 {
            return Err(MapError::InvalidConfig("max_load_factor must be at least 1"));
        }
        if self.migration_work == 0 {
            return Err(MapError::InvalidConfig("migration_work must be at least 1"));
        }
        Ok(())
    }

    /// Entry count at which a table of `capacity` slots should grow.
    pub(crate) fn growth_threshold(&self, capacity: usize) -> usize {
        capacity.saturating_mul(self.max_load_factor)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
