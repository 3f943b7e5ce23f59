//! # Config - Shoal shared settings
//!
//! Constants and the [`EngineConfig`] consumed by the `index`, `wal`, and
//! `engine` crates.
//!
//! ## Environment
//!
//! ```text
//! SHOAL_LEAF_CAPACITY        keys per B-tree leaf              (default: 128)
//! SHOAL_INTERIOR_CAPACITY    separators per interior node      (default: 128)
//! SHOAL_WAL_SYNC             fsync every log append            (default: "true")
//! SHOAL_WAL_BACKUP           keep a .full copy on log replace  (default: "false")
//! SHOAL_TOLERATE_CORRUPTION  open despite corrupt log records  (default: "false")
//! ```

/// Default number of keys held by one B-tree leaf before it splits.
pub const DEFAULT_LEAF_CAPACITY: usize = 128;
/// Default number of separator keys held by one interior node before it splits.
pub const DEFAULT_INTERIOR_CAPACITY: usize = 128;
/// Smallest node capacity the B-tree accepts. Splitting needs at least two
/// entries on each side.
pub const MIN_NODE_CAPACITY: usize = 4;

/// Default tower height cap for skip lists (efficient up to ~65K elements).
pub const DEFAULT_SKIP_LIST_MAX_LEVEL: usize = 16;

/// Upper bound on a single key or value inside a log record (64 MiB).
///
/// A length field above this is treated as a malformed record rather than a
/// torn tail.
pub const MAX_RECORD_FIELD_LEN: usize = 64 * 1024 * 1024;

/// Settings for a mutable segment and the log backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Keys per B-tree leaf.
    pub leaf_capacity: usize,
    /// Separator keys per B-tree interior node.
    pub interior_capacity: usize,
    /// If `true`, every log append is followed by `fsync`.
    pub wal_sync: bool,
    /// If `true`, replacing the log first appends its old content to `<path>.full`.
    pub incremental_backup: bool,
    /// Stop the recovery scan at the first I/O failure.
    pub stop_on_io_error: bool,
    /// Stop the recovery scan at the first checksum or decode failure.
    pub stop_on_checksum_failure: bool,
    /// Open the segment even when recovery reports corrupt records, dropping
    /// the records that failed validation.
    pub tolerate_corrupt_records: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            interior_capacity: DEFAULT_INTERIOR_CAPACITY,
            wal_sync: true,
            incremental_backup: false,
            stop_on_io_error: true,
            stop_on_checksum_failure: false,
            tolerate_corrupt_records: false,
        }
    }
}

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl EngineConfig {
    /// Builds a config from `SHOAL_*` environment variables.
    ///
    /// Unset or unparsable variables keep their default. Capacities below
    /// [`MIN_NODE_CAPACITY`] are raised to it.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let leaf_capacity: usize = env_or("SHOAL_LEAF_CAPACITY", "")
            .parse()
            .unwrap_or(defaults.leaf_capacity);
        let interior_capacity: usize = env_or("SHOAL_INTERIOR_CAPACITY", "")
            .parse()
            .unwrap_or(defaults.interior_capacity);
        let wal_sync: bool = env_or("SHOAL_WAL_SYNC", "true").parse().unwrap_or(true);
        let incremental_backup: bool = env_or("SHOAL_WAL_BACKUP", "false")
            .parse()
            .unwrap_or(false);
        let tolerate_corrupt_records: bool = env_or("SHOAL_TOLERATE_CORRUPTION", "false")
            .parse()
            .unwrap_or(false);

        Self {
            leaf_capacity: leaf_capacity.max(MIN_NODE_CAPACITY),
            interior_capacity: interior_capacity.max(MIN_NODE_CAPACITY),
            wal_sync,
            incremental_backup,
            tolerate_corrupt_records,
            ..defaults
        }
    }

    /// Returns a copy with both node capacities set to `capacity`.
    #[must_use]
    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = capacity.max(MIN_NODE_CAPACITY);
        self.interior_capacity = capacity.max(MIN_NODE_CAPACITY);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = EngineConfig::default();
        assert_eq!(c.leaf_capacity, DEFAULT_LEAF_CAPACITY);
        assert_eq!(c.interior_capacity, DEFAULT_INTERIOR_CAPACITY);
        assert!(c.wal_sync);
        assert!(!c.incremental_backup);
        assert!(!c.tolerate_corrupt_records);
    }

    #[test]
    fn node_capacity_is_clamped() {
        let c = EngineConfig::default().with_node_capacity(1);
        assert_eq!(c.leaf_capacity, MIN_NODE_CAPACITY);
        assert_eq!(c.interior_capacity, MIN_NODE_CAPACITY);

        let c = EngineConfig::default().with_node_capacity(32);
        assert_eq!(c.leaf_capacity, 32);
    }
}
