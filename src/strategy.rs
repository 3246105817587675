//! Blocking strategies.
//!
//! A [`BlockingStrategy`] splits image records into block fragments and combines the fragments of every image into a [`Block`].
//!
//! A strategy is created unbound from a [`SplitSpec`] and a [`Padding`].
//! Binding it to the [`ImagesMetadata`] of a collection computes the [`BlockGeometry`].
//! Splitting and combining require a bound strategy.
//!
//! Strategies come in two kinds:
//!  - [`BlockingKind::Simple`] cuts every image into the exact tiles of the block grid.
//!  - [`BlockingKind::Padded`] grows every tile by a halo of neighbouring elements, clamped at the image boundary.

use itertools::Itertools;
use ndarray::{ArrayD, Axis};
use thiserror::Error;

use crate::{
    block_size::Padding,
    blocks::{Block, BlockFragment, BlockPlacement},
    data_type::Element,
    errors::BlockingError,
    geometry::{BlockGeometry, GeometryError, SplitSpec},
    images::{ImageRecord, ImagesMetadata},
    keys::{ImageKey, PartitioningKey, SpatialKey},
};

/// The blocking strategy is not bound to image metadata.
#[derive(Copy, Clone, Debug, Error)]
#[error("the blocking strategy is not bound to image metadata")]
pub struct NotBoundError;

/// The number of fragments of a block does not match the number of images.
#[derive(Clone, Debug, Error)]
#[error("block {spatial_key} has {got} fragments, expected {expected}")]
pub struct IncompleteBlockError {
    spatial_key: SpatialKey,
    expected: usize,
    got: usize,
}

impl IncompleteBlockError {
    /// Create a new incomplete block error.
    #[must_use]
    pub fn new(spatial_key: SpatialKey, expected: usize, got: usize) -> Self {
        Self {
            spatial_key,
            expected,
            got,
        }
    }

    /// Return the spatial key of the block.
    #[must_use]
    pub fn spatial_key(&self) -> &SpatialKey {
        &self.spatial_key
    }

    /// Return the expected number of fragments.
    #[must_use]
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Return the number of fragments received.
    #[must_use]
    pub fn got(&self) -> usize {
        self.got
    }
}

/// The kind of a blocking strategy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BlockingKind {
    /// Blocks are the exact tiles of the block grid.
    Simple,
    /// Blocks are tiles grown by a halo.
    Padded(Padding),
}

/// The state of a blocking strategy bound to image metadata.
#[derive(Clone, Debug)]
pub struct StrategyBinding {
    metadata: ImagesMetadata,
    geometry: BlockGeometry,
    padding: Vec<usize>,
    keys: Vec<SpatialKey>,
}

impl StrategyBinding {
    /// Return the metadata the strategy is bound to.
    #[must_use]
    pub fn metadata(&self) -> &ImagesMetadata {
        &self.metadata
    }

    /// Return the block geometry.
    #[must_use]
    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    /// Return the padding of every axis.
    #[must_use]
    pub fn padding(&self) -> &[usize] {
        &self.padding
    }

    /// Return the spatial keys of every block in storage order.
    #[must_use]
    pub fn keys(&self) -> &[SpatialKey] {
        &self.keys
    }
}

/// A blocking strategy.
#[derive(Clone, Debug)]
pub struct BlockingStrategy {
    kind: BlockingKind,
    split_spec: SplitSpec,
    binding: Option<StrategyBinding>,
}

impl BlockingStrategy {
    /// Create a new unbound blocking strategy.
    ///
    /// The strategy is [`BlockingKind::Simple`] if `padding` is zero, otherwise [`BlockingKind::Padded`].
    #[must_use]
    pub fn new(split_spec: SplitSpec, padding: impl Into<Padding>) -> Self {
        let padding = padding.into();
        let kind = if padding.is_zero() {
            BlockingKind::Simple
        } else {
            BlockingKind::Padded(padding)
        };
        Self {
            kind,
            split_spec,
            binding: None,
        }
    }

    /// Create a new unbound simple blocking strategy.
    #[must_use]
    pub fn simple(split_spec: SplitSpec) -> Self {
        Self::new(split_spec, Padding::default())
    }

    /// Create a new unbound padded blocking strategy.
    ///
    /// A zero `padding` creates a simple strategy.
    #[must_use]
    pub fn padded(split_spec: SplitSpec, padding: impl Into<Padding>) -> Self {
        Self::new(split_spec, padding)
    }

    /// Create a new unbound blocking strategy targeting an average block size of `block_size` bytes.
    #[must_use]
    pub fn from_block_size(block_size: u64, padding: impl Into<Padding>) -> Self {
        Self::new(SplitSpec::Bytes(block_size), padding)
    }

    /// Create a new unbound blocking strategy with `splits` per axis.
    #[must_use]
    pub fn from_splits(splits: Vec<usize>, padding: impl Into<Padding>) -> Self {
        Self::new(SplitSpec::Splits(splits), padding)
    }

    /// Return the kind of the strategy.
    #[must_use]
    pub fn kind(&self) -> &BlockingKind {
        &self.kind
    }

    /// Return the split specification.
    #[must_use]
    pub fn split_spec(&self) -> &SplitSpec {
        &self.split_spec
    }

    /// Returns true if the strategy is bound to image metadata.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Bind the strategy to image metadata and compute the block geometry.
    ///
    /// Binding to the metadata the strategy is already bound to does nothing.
    /// Binding to different metadata recomputes the geometry.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] if the split specification or padding is invalid for the image dimensions.
    pub fn bind(&mut self, metadata: &ImagesMetadata) -> Result<&StrategyBinding, GeometryError> {
        if let Some(binding) = self.binding.take() {
            if binding.metadata == *metadata {
                return Ok(&*self.binding.insert(binding));
            }
        }
        let dims = metadata.dims();
        let geometry = BlockGeometry::from_split_spec(
            dims.clone(),
            metadata.element_size(),
            &self.split_spec,
        )?;
        let padding = match &self.kind {
            BlockingKind::Simple => vec![0; dims.dimensionality()],
            BlockingKind::Padded(padding) => padding.for_dimensionality(dims.dimensionality())?,
        };
        let keys = geometry.keys();
        tracing::debug!(
            "bound {:?} blocking strategy to {} images with dimensions {dims}: splits {:?}, padding {padding:?}",
            self.kind,
            metadata.nimages(),
            geometry.splits(),
        );
        Ok(&*self.binding.insert(StrategyBinding {
            metadata: metadata.clone(),
            geometry,
            padding,
            keys,
        }))
    }

    /// Return the binding.
    ///
    /// # Errors
    /// Returns [`NotBoundError`] if the strategy is not bound.
    pub fn binding(&self) -> Result<&StrategyBinding, NotBoundError> {
        self.binding.as_ref().ok_or(NotBoundError)
    }

    /// Return the block geometry.
    ///
    /// # Errors
    /// Returns [`NotBoundError`] if the strategy is not bound.
    pub fn geometry(&self) -> Result<&BlockGeometry, NotBoundError> {
        Ok(self.binding()?.geometry())
    }

    /// Estimate the average size of a block in bytes.
    ///
    /// A block stacks every image, so this is the size of every image divided by the number of blocks.
    ///
    /// # Errors
    /// Returns [`NotBoundError`] if the strategy is not bound.
    pub fn estimate_average_block_bytes(&self) -> Result<u64, NotBoundError> {
        let binding = self.binding()?;
        let total = u128::from(binding.metadata.image_bytes()) * binding.metadata.nimages() as u128;
        let average = total / binding.geometry.num_blocks() as u128;
        Ok(u64::try_from(average).unwrap_or(u64::MAX))
    }

    /// Log a warning if the estimated average block size is at or above `threshold` bytes.
    ///
    /// Returns true if a warning was logged.
    ///
    /// # Errors
    /// Returns [`NotBoundError`] if the strategy is not bound.
    pub fn check_average_block_size(&self, threshold: u64) -> Result<bool, NotBoundError> {
        let average = self.estimate_average_block_bytes()?;
        let oversized = average >= threshold;
        if oversized {
            tracing::warn!(
                "average block size of {average} bytes exceeds suggested max size of {threshold} bytes"
            );
        }
        Ok(oversized)
    }

    fn placement(
        &self,
        binding: &StrategyBinding,
        spatial_key: &SpatialKey,
    ) -> Result<BlockPlacement, BlockingError> {
        let core = binding.geometry.block_subset(spatial_key)?;
        match &self.kind {
            BlockingKind::Simple => Ok(BlockPlacement::new(core)),
            BlockingKind::Padded(_) => {
                let padded = binding
                    .geometry
                    .padded_block_subset(spatial_key, &binding.padding)?;
                Ok(BlockPlacement::new_padded(
                    core,
                    padded,
                    binding.padding.clone(),
                )?)
            }
        }
    }

    /// Split an image record into one fragment per block.
    ///
    /// Fragments are returned in storage order, keyed by the spatial key of their block.
    ///
    /// # Errors
    /// Returns a [`BlockingError`] if the strategy is not bound, or the record does not match the bound dimensions and data type.
    pub fn split<K: ImageKey, T: Element>(
        &self,
        record: &ImageRecord<K, T>,
    ) -> Result<Vec<(SpatialKey, BlockFragment<K, T>)>, BlockingError> {
        let binding = self.binding()?;
        let (image_key, array) = record;
        if T::DATA_TYPE != binding.metadata.data_type() {
            return Err(BlockingError::DataTypeMismatch(
                T::DATA_TYPE,
                binding.metadata.data_type(),
            ));
        }
        if array.shape() != binding.metadata.dims().shape() {
            return Err(BlockingError::RecordShapeMismatch(
                array.shape().to_vec(),
                binding.metadata.dims().clone(),
            ));
        }
        let view = array.view();
        binding
            .keys
            .iter()
            .map(|spatial_key| {
                let placement = self.placement(binding, spatial_key)?;
                let data = placement.padded().view(&view)?.to_owned();
                let key = PartitioningKey::new(spatial_key.clone(), image_key.clone());
                Ok::<_, BlockingError>((
                    spatial_key.clone(),
                    BlockFragment::new(key, placement, data),
                ))
            })
            .collect()
    }

    /// Combine the fragments of every image of one block into a [`Block`].
    ///
    /// Fragments may arrive in any order; the stacked images are in ascending image key order.
    ///
    /// # Errors
    /// Returns a [`BlockingError`] if the strategy is not bound, the number of fragments does not match the number of images, a fragment belongs to another block, or two fragments have the same image key.
    pub fn combine<K: ImageKey, T: Element>(
        &self,
        spatial_key: &SpatialKey,
        mut fragments: Vec<BlockFragment<K, T>>,
    ) -> Result<Block<K, T>, BlockingError> {
        let binding = self.binding()?;
        let nimages = binding.metadata.nimages();
        if fragments.len() != nimages {
            return Err(
                IncompleteBlockError::new(spatial_key.clone(), nimages, fragments.len()).into(),
            );
        }
        if let Some(fragment) = fragments
            .iter()
            .find(|fragment| fragment.key().spatial_key() != spatial_key)
        {
            return Err(BlockingError::ForeignFragment(
                fragment.key().spatial_key().clone(),
                spatial_key.clone(),
            ));
        }
        fragments.sort_by(|a, b| a.key().image_key().cmp(b.key().image_key()));
        if let Some((a, _)) = fragments
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.key().image_key() == b.key().image_key())
        {
            return Err(BlockingError::DuplicateImageKey(
                format!("{:?}", a.key().image_key()),
                spatial_key.clone(),
            ));
        }

        let placement = self.placement(binding, spatial_key)?;
        let views: Vec<_> = fragments.iter().map(|fragment| fragment.data().view()).collect();
        let data: ArrayD<T> = ndarray::stack(Axis(0), &views)?;
        let image_keys = fragments
            .into_iter()
            .map(|fragment| fragment.into_parts().0.into_image_key())
            .collect();
        Block::new(spatial_key.clone(), placement, image_keys, data)
    }
}
