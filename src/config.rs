//! Voxblocks global configuration options.

use std::{
    num::NonZeroUsize,
    sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Global configuration options for the voxblocks crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Max Block Size Warning Threshold
/// > default: `500_000_000`
///
/// When assembling blocks, a warning is logged if the estimated average block size in bytes is at or above this threshold.
/// The warning is advisory and never changes how blocks are assembled.
///
/// ## Default Block Size
/// > default: `150M` (`157_286_400` bytes)
///
/// The target average block size in bytes used by [`BlockSizeSpec::default`](crate::block_size::BlockSizeSpec::default).
///
/// ## Number of Partitions
/// > default: [`std::thread::available_parallelism`]`()`
///
/// The number of partitions used when collections are created or shuffled without an explicit partition count.
#[derive(Debug)]
pub struct Config {
    max_block_size_warning_threshold: u64,
    default_block_size: u64,
    num_partitions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_block_size_warning_threshold: 500_000_000,
            default_block_size: 150 * 1024 * 1024,
            num_partitions: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

impl Config {
    /// Get the [max block size warning threshold](#max-block-size-warning-threshold) configuration.
    #[must_use]
    pub fn max_block_size_warning_threshold(&self) -> u64 {
        self.max_block_size_warning_threshold
    }

    /// Set the [max block size warning threshold](#max-block-size-warning-threshold) configuration.
    pub fn set_max_block_size_warning_threshold(&mut self, threshold: u64) {
        self.max_block_size_warning_threshold = threshold;
    }

    /// Get the [default block size](#default-block-size) configuration.
    #[must_use]
    pub fn default_block_size(&self) -> u64 {
        self.default_block_size
    }

    /// Set the [default block size](#default-block-size) configuration.
    pub fn set_default_block_size(&mut self, block_size: u64) {
        self.default_block_size = block_size;
    }

    /// Get the [number of partitions](#number-of-partitions) configuration.
    #[must_use]
    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /// Set the [number of partitions](#number-of-partitions) configuration.
    ///
    /// A value of zero is treated as one.
    pub fn set_num_partitions(&mut self, num_partitions: usize) {
        self.num_partitions = num_partitions.max(1);
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global voxblocks configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global voxblocks configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
