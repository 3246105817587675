//! Block assembly.
//!
//! [`assemble`] converts an image collection into blocks:
//!  1. the image metadata is established and the strategy is bound to it,
//!  2. every record is split into fragments in parallel,
//!  3. fragments are exchanged so that every fragment of a block lands in one group,
//!  4. groups are sorted into storage order, and
//!  5. every group is combined into a block in parallel.

use crate::{
    blocks::Blocks,
    config::global_config,
    data_type::Element,
    errors::BlockingError,
    images::Images,
    keys::ImageKey,
    strategy::BlockingStrategy,
};

/// Block assembly options.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    max_block_size_warning_threshold: u64,
    num_partitions: usize,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptionsBuilder::new().build()
    }
}

impl AssembleOptions {
    /// Create a new assemble options builder.
    #[must_use]
    pub fn builder() -> AssembleOptionsBuilder {
        AssembleOptionsBuilder::new()
    }

    /// Return the max block size warning threshold in bytes.
    #[must_use]
    pub fn max_block_size_warning_threshold(&self) -> u64 {
        self.max_block_size_warning_threshold
    }

    /// Set the max block size warning threshold in bytes.
    pub fn set_max_block_size_warning_threshold(&mut self, threshold: u64) {
        self.max_block_size_warning_threshold = threshold;
    }

    /// Return the number of partitions of the exchange.
    #[must_use]
    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /// Set the number of partitions of the exchange.
    pub fn set_num_partitions(&mut self, num_partitions: usize) {
        self.num_partitions = num_partitions.max(1);
    }
}

/// Builder for [`AssembleOptions`].
#[derive(Debug, Clone)]
pub struct AssembleOptionsBuilder {
    max_block_size_warning_threshold: u64,
    num_partitions: usize,
}

impl Default for AssembleOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AssembleOptionsBuilder {
    /// Create a new assemble options builder with defaults from the global configuration.
    #[must_use]
    pub fn new() -> Self {
        let config = global_config();
        Self {
            max_block_size_warning_threshold: config.max_block_size_warning_threshold(),
            num_partitions: config.num_partitions(),
        }
    }

    /// Build into assemble options.
    #[must_use]
    pub fn build(&self) -> AssembleOptions {
        AssembleOptions {
            max_block_size_warning_threshold: self.max_block_size_warning_threshold,
            num_partitions: self.num_partitions,
        }
    }

    /// Set the max block size warning threshold in bytes.
    #[must_use]
    pub fn max_block_size_warning_threshold(mut self, threshold: u64) -> Self {
        self.max_block_size_warning_threshold = threshold;
        self
    }

    /// Set the number of partitions of the exchange.
    #[must_use]
    pub fn num_partitions(mut self, num_partitions: usize) -> Self {
        self.num_partitions = num_partitions.max(1);
        self
    }
}

/// Assemble `images` into blocks with `strategy`.
///
/// The dimensions and number of images are established on `images` and `strategy` is bound to them.
/// A warning is logged if the average block size is at or above the warning threshold of `options`.
///
/// # Errors
/// Returns a [`BlockingError`] if the images are empty, the strategy cannot be bound to the images, a record does not match the image dimensions, or a block cannot be combined.
pub fn assemble<K: ImageKey, T: Element>(
    images: &mut Images<K, T>,
    strategy: &mut BlockingStrategy,
    options: &AssembleOptions,
) -> Result<Blocks<K, T>, BlockingError> {
    let metadata = images.metadata()?;
    let num_blocks = strategy.bind(&metadata)?.geometry().num_blocks();
    strategy.check_average_block_size(options.max_block_size_warning_threshold())?;

    let strategy = &*strategy;
    let fragments = images
        .records()
        .try_flat_map(|record| strategy.split(record))?;
    tracing::debug!(
        "split {} images into {} fragments",
        metadata.nimages(),
        fragments.count()
    );

    let groups = fragments
        .group_by_key(options.num_partitions())
        .sort_by(|(a, _), (b, _)| a.cmp_storage_order(b));
    debug_assert_eq!(groups.count(), num_blocks);

    let blocks = groups.try_map(|(spatial_key, fragments)| strategy.combine(&spatial_key, fragments))?;
    tracing::debug!("assembled {} blocks", blocks.count());
    Ok(Blocks::new(blocks, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_options() {
        assert!(AssembleOptions::default().num_partitions() >= 1);
        let mut options = AssembleOptions::builder()
            .max_block_size_warning_threshold(10)
            .num_partitions(0)
            .build();
        assert_eq!(options.max_block_size_warning_threshold(), 10);
        assert_eq!(options.num_partitions(), 1);
        options.set_num_partitions(4);
        options.set_max_block_size_warning_threshold(20);
        assert_eq!(options.num_partitions(), 4);
        assert_eq!(options.max_block_size_warning_threshold(), 20);
    }
}
