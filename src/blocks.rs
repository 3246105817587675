//! Blocks.
//!
//! A [`Block`] is a stack of every image of a collection cut to one spatial tile of the block grid.
//! The leading axis of the stacked array indexes images in ascending image key order, and the remaining axes are the spatial axes of the tile.
//!
//! Blocks cut with padding include a halo of elements from neighbouring tiles.
//! The [`BlockPlacement`] of a block records the exact tile (the core), the padded extent, and where the halo was truncated at the image boundary.

mod series;

pub use series::Series;

use itertools::izip;
use ndarray::{ArrayD, ArrayViewD, Axis, Slice};
use rayon::prelude::*;

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    collection::Collection,
    data_type::{DataType, Element},
    dimensions::Dimensions,
    errors::BlockingError,
    images::{Images, ImagesMetadata},
    keys::{ImageKey, PartitioningKey, SpatialKey},
};

/// The placement of a block within an image.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BlockPlacement {
    core: ArraySubset,
    padded: ArraySubset,
    padding: Vec<usize>,
    core_in_padded: ArraySubset,
}

impl BlockPlacement {
    /// Create a new placement of an unpadded block.
    #[must_use]
    pub fn new(core: ArraySubset) -> Self {
        Self {
            padded: core.clone(),
            padding: vec![0; core.dimensionality()],
            core_in_padded: ArraySubset::new_with_shape(core.shape().to_vec()),
            core,
        }
    }

    /// Create a new placement of a padded block.
    ///
    /// `padded` is the core grown by the requested `padding` and clamped to the image.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `padded` or `padding` does not match `core`.
    pub fn new_padded(
        core: ArraySubset,
        padded: ArraySubset,
        padding: Vec<usize>,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        for len in [padded.dimensionality(), padding.len()] {
            if len != core.dimensionality() {
                return Err(IncompatibleDimensionalityError::new(
                    len,
                    core.dimensionality(),
                ));
            }
        }
        let core_in_padded = core.relative_to(&padded)?;
        Ok(Self {
            core,
            padded,
            padding,
            core_in_padded,
        })
    }

    /// Return the exact tile of the block.
    #[must_use]
    pub fn core(&self) -> &ArraySubset {
        &self.core
    }

    /// Return the padded extent of the block.
    ///
    /// Equal to the core if the block is unpadded.
    #[must_use]
    pub fn padded(&self) -> &ArraySubset {
        &self.padded
    }

    /// Return the requested padding per axis.
    #[must_use]
    pub fn padding(&self) -> &[usize] {
        &self.padding
    }

    /// Returns true if any padding was requested.
    #[must_use]
    pub fn is_padded(&self) -> bool {
        self.padding.iter().any(|&padding| padding > 0)
    }

    /// Return the actual halo `(before, after)` of every axis.
    #[must_use]
    pub fn halo(&self) -> Vec<(usize, usize)> {
        izip!(
            self.core.start(),
            self.core.end_exc(),
            self.padded.start(),
            self.padded.end_exc()
        )
        .map(|(core_start, core_end, padded_start, padded_end)| {
            (
                core_start.saturating_sub(*padded_start),
                padded_end.saturating_sub(core_end),
            )
        })
        .collect()
    }

    /// Return whether the halo `(before, after)` of every axis was truncated at the image boundary.
    #[must_use]
    pub fn truncated(&self) -> Vec<(bool, bool)> {
        std::iter::zip(self.halo(), &self.padding)
            .map(|((before, after), &padding)| (before < padding, after < padding))
            .collect()
    }

    /// Return the core in the coordinates of the padded extent.
    #[must_use]
    pub fn core_in_padded(&self) -> &ArraySubset {
        &self.core_in_padded
    }
}

/// A fragment of one image cut to the padded extent of one block.
#[derive(Clone, Debug)]
pub struct BlockFragment<K, T> {
    key: PartitioningKey<K>,
    placement: BlockPlacement,
    data: ArrayD<T>,
}

impl<K: ImageKey, T: Element> BlockFragment<K, T> {
    /// Create a new block fragment.
    #[must_use]
    pub fn new(key: PartitioningKey<K>, placement: BlockPlacement, data: ArrayD<T>) -> Self {
        Self {
            key,
            placement,
            data,
        }
    }

    /// Return the partitioning key.
    #[must_use]
    pub fn key(&self) -> &PartitioningKey<K> {
        &self.key
    }

    /// Return the placement.
    #[must_use]
    pub fn placement(&self) -> &BlockPlacement {
        &self.placement
    }

    /// Return the fragment data.
    #[must_use]
    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    /// Convert into the partitioning key, placement and data.
    #[must_use]
    pub fn into_parts(self) -> (PartitioningKey<K>, BlockPlacement, ArrayD<T>) {
        (self.key, self.placement, self.data)
    }
}

/// A stack of every image of a collection cut to one block.
#[derive(Clone, Debug)]
pub struct Block<K, T> {
    spatial_key: SpatialKey,
    placement: BlockPlacement,
    image_keys: Vec<K>,
    data: ArrayD<T>,
}

impl<K: ImageKey, T: Element> Block<K, T> {
    /// Create a new block.
    ///
    /// `data` has a leading axis with one entry per image key, followed by the axes of the padded extent of `placement`.
    ///
    /// # Errors
    /// Returns a [`BlockingError`] if the shape of `data` is incompatible with `image_keys` and `placement`.
    pub fn new(
        spatial_key: SpatialKey,
        placement: BlockPlacement,
        image_keys: Vec<K>,
        data: ArrayD<T>,
    ) -> Result<Self, BlockingError> {
        let expected: Vec<usize> = std::iter::once(image_keys.len())
            .chain(placement.padded().shape().iter().copied())
            .collect();
        if data.shape() != expected.as_slice() {
            return Err(BlockingError::InvalidArgument(format!(
                "block {spatial_key} data has shape {:?}, expected {expected:?}",
                data.shape()
            )));
        }
        Ok(Self {
            spatial_key,
            placement,
            image_keys,
            data,
        })
    }

    /// Return the spatial key.
    #[must_use]
    pub fn spatial_key(&self) -> &SpatialKey {
        &self.spatial_key
    }

    /// Return the placement.
    #[must_use]
    pub fn placement(&self) -> &BlockPlacement {
        &self.placement
    }

    /// Return the exact tile of the block.
    #[must_use]
    pub fn core_subset(&self) -> &ArraySubset {
        self.placement.core()
    }

    /// Return the padded extent of the block.
    #[must_use]
    pub fn padded_subset(&self) -> &ArraySubset {
        self.placement.padded()
    }

    /// Return the image keys in stacked order.
    #[must_use]
    pub fn image_keys(&self) -> &[K] {
        &self.image_keys
    }

    /// Return the number of stacked images.
    #[must_use]
    pub fn nimages(&self) -> usize {
        self.image_keys.len()
    }

    /// Return the stacked data, including any halo.
    #[must_use]
    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    /// Convert into the stacked data.
    #[must_use]
    pub fn into_data(self) -> ArrayD<T> {
        self.data
    }

    /// Return a view of the stacked data without the halo.
    #[must_use]
    pub fn core(&self) -> ArrayViewD<'_, T> {
        let ranges = self.placement.core_in_padded().to_ranges();
        self.data.slice_each_axis(|axis| match axis.axis.index() {
            0 => Slice::from(..),
            i => Slice::from(ranges[i - 1].clone()),
        })
    }
}

/// A collection of blocks covering every image of a collection.
///
/// Blocks are held in storage order, where the first axis of the spatial key varies fastest.
#[derive(Clone, Debug)]
pub struct Blocks<K, T> {
    blocks: Collection<Block<K, T>>,
    metadata: ImagesMetadata,
}

impl<K: ImageKey, T: Element> Blocks<K, T> {
    /// Create a new blocks collection.
    ///
    /// `blocks` must be in storage order.
    #[must_use]
    pub fn new(blocks: Collection<Block<K, T>>, metadata: ImagesMetadata) -> Self {
        Self { blocks, metadata }
    }

    /// Return the metadata of the images the blocks were cut from.
    #[must_use]
    pub fn metadata(&self) -> &ImagesMetadata {
        &self.metadata
    }

    /// Return the image dimensions.
    #[must_use]
    pub fn dims(&self) -> &Dimensions {
        self.metadata.dims()
    }

    /// Return the number of images.
    #[must_use]
    pub fn nimages(&self) -> usize {
        self.metadata.nimages()
    }

    /// Return the data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.metadata.data_type()
    }

    /// Return the number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.count()
    }

    /// Returns true if there are no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Return the underlying collection.
    #[must_use]
    pub fn collection(&self) -> &Collection<Block<K, T>> {
        &self.blocks
    }

    /// Iterate over the blocks in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Block<K, T>> {
        self.blocks.iter()
    }

    /// Convert into blocks in storage order.
    #[must_use]
    pub fn into_blocks(self) -> Vec<Block<K, T>> {
        self.blocks.into_records()
    }

    /// Convert to one series per voxel.
    ///
    /// Series are cut from the core of every block, so padding does not duplicate voxels.
    #[must_use]
    pub fn to_series(&self) -> Series<T> {
        let records = self.blocks.flat_map(|block| {
            let core = block.core();
            let start = block.core_subset().start();
            let local = ArraySubset::new_with_shape(block.core_subset().shape().to_vec());
            std::iter::zip(core.lanes(Axis(0)), local.indices())
                .map(|(lane, local)| {
                    let indices = std::iter::zip(local, start)
                        .map(|(local, start)| local + start)
                        .collect::<Vec<_>>();
                    (indices, lane.to_owned())
                })
                .collect::<Vec<_>>()
        });
        let records = records.sort_by(|(a, _), (b, _)| a.iter().rev().cmp(b.iter().rev()));
        tracing::debug!("converted {} blocks to {} series", self.len(), records.count());
        Series::new(records.into_records(), self.dims().clone(), self.nimages())
    }

    /// Reassemble every image from the cores of the blocks.
    ///
    /// # Errors
    /// Returns a [`BlockingError`] if there are no blocks, the blocks hold different image keys, or the blocks do not fit the image dimensions.
    pub fn to_images(&self) -> Result<Images<K, T>, BlockingError> {
        let first = self.blocks.first().ok_or(BlockingError::EmptyImages)?;
        let image_keys = first.image_keys().to_vec();
        if let Some(block) = self
            .blocks
            .iter()
            .find(|block| block.image_keys() != image_keys.as_slice())
        {
            return Err(BlockingError::InvalidArgument(format!(
                "block {} holds different image keys than block {}",
                block.spatial_key(),
                first.spatial_key()
            )));
        }

        let dims = self.dims();
        let records = image_keys
            .into_par_iter()
            .enumerate()
            .map(|(i, key)| {
                let mut image = ArrayD::from_elem(dims.shape(), T::default());
                let mut image_view = image.view_mut();
                for block in self.blocks.iter() {
                    let stacked = block.data().index_axis(Axis(0), i);
                    let source = block.placement().core_in_padded().view(&stacked)?;
                    block
                        .core_subset()
                        .view_mut(&mut image_view)?
                        .assign(&source);
                }
                Ok::<_, BlockingError>((key, image))
            })
            .collect::<Result<Vec<_>, BlockingError>>()?;
        Ok(Images::with_metadata(
            Collection::from_records_default(records),
            self.metadata.clone(),
        ))
    }
}
