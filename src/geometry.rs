//! Block geometry.
//!
//! Computes how many splits to make along each axis of an image, and where the resulting blocks start and end.
//!
//! Splits are either given explicitly, or chosen so that the average block size is no larger than a target number of bytes.
//! When an axis does not divide evenly, the first `size % splits` blocks along that axis are one element larger than the rest.

use std::ops::Range;

use thiserror::Error;

use crate::{
    array::ArrayShape,
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    dimensions::Dimensions,
    keys::SpatialKey,
};

/// How to split an image into blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SplitSpec {
    /// A target average block size in bytes.
    Bytes(u64),
    /// An explicit number of splits per axis.
    Splits(Vec<usize>),
}

/// A block geometry error.
#[derive(Clone, Debug, Error)]
pub enum GeometryError {
    /// A split count is zero or exceeds the size of its axis.
    #[error("split count {splits} along axis {axis} is invalid for an axis of size {size}")]
    InvalidSplitCount {
        /// The axis.
        axis: usize,
        /// The split count.
        splits: usize,
        /// The axis size.
        size: usize,
    },
    /// The target block size is zero.
    #[error("the target block size must be greater than zero bytes")]
    ZeroBlockSize,
    /// The spatial key is outside of the block grid.
    #[error("spatial key {0} is outside of the block grid with shape {1:?}")]
    InvalidSpatialKey(SpatialKey, ArrayShape),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
}

/// Compute the number of splits per axis so that the average block size does not exceed `target_bytes`.
///
/// `element_bytes` is the size of one element of a block, which includes every image stacked in the block.
///
/// Every axis starts with a single split.
/// The axis with the largest block extent (ties going to the lowest axis) gains one split at a time, until the projected average block size is within `target_bytes` or every axis is fully split.
///
/// # Errors
/// Returns [`GeometryError::ZeroBlockSize`] if `target_bytes` is zero.
pub fn splits_for_block_size(
    dims: &Dimensions,
    element_bytes: u64,
    target_bytes: u64,
) -> Result<Vec<usize>, GeometryError> {
    if target_bytes == 0 {
        return Err(GeometryError::ZeroBlockSize);
    }
    let total_bytes = u128::from(dims.num_elements()) * u128::from(element_bytes);
    let target_bytes = u128::from(target_bytes);
    let mut splits = vec![1usize; dims.dimensionality()];
    loop {
        let num_blocks: u128 = splits.iter().map(|&splits| splits as u128).product();
        if total_bytes.div_ceil(num_blocks) <= target_bytes {
            break;
        }
        let axis = (0..splits.len())
            .filter(|&axis| splits[axis] < dims[axis])
            .max_by(|&a, &b| {
                dims[a]
                    .div_ceil(splits[a])
                    .cmp(&dims[b].div_ceil(splits[b]))
                    .then(b.cmp(&a))
            });
        match axis {
            Some(axis) => splits[axis] += 1,
            None => break,
        }
    }
    tracing::debug!(
        "splits {splits:?} for dimensions {dims} with {element_bytes} bytes per element and a target of {target_bytes} bytes"
    );
    Ok(splits)
}

/// Validate an explicit number of splits per axis.
///
/// # Errors
/// Returns a [`GeometryError`] if `splits` does not match the dimensionality of `dims`, or any split count is zero or exceeds the size of its axis.
pub fn validate_splits(dims: &Dimensions, splits: &[usize]) -> Result<Vec<usize>, GeometryError> {
    if splits.len() != dims.dimensionality() {
        return Err(
            IncompatibleDimensionalityError::new(splits.len(), dims.dimensionality()).into(),
        );
    }
    for (axis, (&splits, &size)) in std::iter::zip(splits, dims.iter()).enumerate() {
        if splits == 0 || splits > size {
            return Err(GeometryError::InvalidSplitCount { axis, splits, size });
        }
    }
    Ok(splits.to_vec())
}

/// Compute the number of splits per axis from a [`SplitSpec`].
///
/// # Errors
/// See [`splits_for_block_size`] and [`validate_splits`].
pub fn compute_splits(
    dims: &Dimensions,
    element_bytes: u64,
    split_spec: &SplitSpec,
) -> Result<Vec<usize>, GeometryError> {
    match split_spec {
        SplitSpec::Bytes(target_bytes) => splits_for_block_size(dims, element_bytes, *target_bytes),
        SplitSpec::Splits(splits) => validate_splits(dims, splits),
    }
}

/// Divide `0..axis_size` into `split_count` contiguous ranges.
///
/// The first `axis_size % split_count` ranges are one element longer than the rest.
///
/// # Errors
/// Returns [`GeometryError::InvalidSplitCount`] if `split_count` is zero or exceeds `axis_size`.
pub fn compute_boundaries(
    axis_size: usize,
    split_count: usize,
) -> Result<Vec<Range<usize>>, GeometryError> {
    if split_count == 0 || split_count > axis_size {
        return Err(GeometryError::InvalidSplitCount {
            axis: 0,
            splits: split_count,
            size: axis_size,
        });
    }
    let base = axis_size / split_count;
    let remainder = axis_size % split_count;
    Ok((0..split_count)
        .scan(0, |offset, i| {
            let start = *offset;
            *offset += base + usize::from(i < remainder);
            Some(start..*offset)
        })
        .collect())
}

/// The grid of blocks covering an image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockGeometry {
    dims: Dimensions,
    splits: Vec<usize>,
    boundaries: Vec<Vec<Range<usize>>>,
}

impl BlockGeometry {
    /// Create a new block geometry with `splits` per axis of `dims`.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] if `splits` are invalid for `dims`.
    pub fn new(dims: Dimensions, splits: &[usize]) -> Result<Self, GeometryError> {
        let splits = validate_splits(&dims, splits)?;
        let boundaries = std::iter::zip(dims.iter(), &splits)
            .enumerate()
            .map(|(axis, (&size, &splits))| {
                compute_boundaries(size, splits).map_err(|err| match err {
                    GeometryError::InvalidSplitCount { splits, size, .. } => {
                        GeometryError::InvalidSplitCount { axis, splits, size }
                    }
                    err => err,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dims,
            splits,
            boundaries,
        })
    }

    /// Create a new block geometry from a [`SplitSpec`].
    ///
    /// # Errors
    /// Returns a [`GeometryError`] if the split specification is invalid for `dims`.
    pub fn from_split_spec(
        dims: Dimensions,
        element_bytes: u64,
        split_spec: &SplitSpec,
    ) -> Result<Self, GeometryError> {
        let splits = compute_splits(&dims, element_bytes, split_spec)?;
        Self::new(dims, &splits)
    }

    /// Return the image dimensions.
    #[must_use]
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Return the number of splits per axis.
    #[must_use]
    pub fn splits(&self) -> &[usize] {
        &self.splits
    }

    /// The grid shape (i.e. number of blocks per axis).
    #[must_use]
    pub fn grid_shape(&self) -> &[usize] {
        &self.splits
    }

    /// Return the total number of blocks.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.splits.iter().product()
    }

    /// Return the block boundaries along `axis`.
    #[must_use]
    pub fn boundaries(&self, axis: usize) -> Option<&[Range<usize>]> {
        self.boundaries.get(axis).map(Vec::as_slice)
    }

    /// Returns true if `spatial_key` is within the block grid.
    #[must_use]
    pub fn contains_key(&self, spatial_key: &SpatialKey) -> bool {
        spatial_key.dimensionality() == self.splits.len()
            && std::iter::zip(spatial_key.iter(), &self.splits).all(|(index, splits)| index < splits)
    }

    /// Return the [`ArraySubset`] of the block at `spatial_key`.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidSpatialKey`] if `spatial_key` is outside of the block grid.
    pub fn block_subset(&self, spatial_key: &SpatialKey) -> Result<ArraySubset, GeometryError> {
        if !self.contains_key(spatial_key) {
            return Err(GeometryError::InvalidSpatialKey(
                spatial_key.clone(),
                self.splits.clone(),
            ));
        }
        let ranges: Vec<Range<usize>> = std::iter::zip(spatial_key.iter(), &self.boundaries)
            .map(|(&index, boundaries)| boundaries[index].clone())
            .collect();
        Ok(ArraySubset::new_with_ranges(&ranges))
    }

    /// Return the [`ArraySubset`] of the block at `spatial_key` grown by `padding` on both sides of every axis.
    ///
    /// The padded subset is clamped to the image, so blocks at the edge of the grid have less (or no) padding on their outer sides.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] if `spatial_key` is outside of the block grid or `padding` does not match the dimensionality.
    pub fn padded_block_subset(
        &self,
        spatial_key: &SpatialKey,
        padding: &[usize],
    ) -> Result<ArraySubset, GeometryError> {
        let subset = self.block_subset(spatial_key)?;
        Ok(subset.grow_bounded(padding, padding, &self.dims)?)
    }

    /// Return every spatial key of the grid in storage order (the first axis varies fastest).
    #[must_use]
    pub fn keys(&self) -> Vec<SpatialKey> {
        let mut keys: Vec<SpatialKey> = ArraySubset::new_with_shape(self.splits.clone())
            .indices()
            .map(SpatialKey::new)
            .collect();
        keys.sort_by(SpatialKey::cmp_storage_order);
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(shape: &[usize]) -> Dimensions {
        Dimensions::try_from(shape).unwrap()
    }

    #[test]
    fn boundaries_even() {
        assert_eq!(compute_boundaries(4, 2).unwrap(), vec![0..2, 2..4]);
        assert_eq!(compute_boundaries(4, 4).unwrap(), vec![0..1, 1..2, 2..3, 3..4]);
        assert_eq!(compute_boundaries(5, 1).unwrap(), vec![0..5]);
    }

    #[test]
    fn boundaries_remainder() {
        assert_eq!(compute_boundaries(10, 3).unwrap(), vec![0..4, 4..7, 7..10]);
        assert_eq!(compute_boundaries(7, 4).unwrap(), vec![0..2, 2..4, 4..6, 6..7]);
    }

    #[test]
    fn boundaries_partition_axis() {
        for axis_size in 1..40 {
            for split_count in 1..=axis_size {
                let boundaries = compute_boundaries(axis_size, split_count).unwrap();
                assert_eq!(boundaries.len(), split_count);
                assert_eq!(boundaries.first().unwrap().start, 0);
                assert_eq!(boundaries.last().unwrap().end, axis_size);
                for (a, b) in boundaries.iter().zip(boundaries.iter().skip(1)) {
                    assert_eq!(a.end, b.start);
                }
                let lengths: Vec<usize> = boundaries.iter().map(ExactSizeIterator::len).collect();
                assert_eq!(lengths.iter().sum::<usize>(), axis_size);
                let min = *lengths.iter().min().unwrap();
                let max = *lengths.iter().max().unwrap();
                assert!(min >= 1);
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn boundaries_invalid() {
        assert!(matches!(
            compute_boundaries(4, 0),
            Err(GeometryError::InvalidSplitCount { splits: 0, .. })
        ));
        assert!(matches!(
            compute_boundaries(4, 5),
            Err(GeometryError::InvalidSplitCount { splits: 5, size: 4, .. })
        ));
    }

    #[test]
    fn splits_validate() {
        let dims = dims(&[4, 4]);
        assert_eq!(validate_splits(&dims, &[2, 2]).unwrap(), vec![2, 2]);
        assert_eq!(validate_splits(&dims, &[4, 1]).unwrap(), vec![4, 1]);
        assert!(matches!(
            validate_splits(&dims, &[0, 2]),
            Err(GeometryError::InvalidSplitCount { axis: 0, .. })
        ));
        assert!(matches!(
            validate_splits(&dims, &[2, 5]),
            Err(GeometryError::InvalidSplitCount { axis: 1, .. })
        ));
        assert!(matches!(
            validate_splits(&dims, &[2]),
            Err(GeometryError::IncompatibleDimensionality(_))
        ));
    }

    #[test]
    fn splits_for_block_size_fits() {
        // 4*4 elements * 8 bytes = 128 bytes, everything fits in one block
        let dims = dims(&[4, 4]);
        assert_eq!(splits_for_block_size(&dims, 8, 128).unwrap(), vec![1, 1]);
        assert_eq!(splits_for_block_size(&dims, 8, 1024).unwrap(), vec![1, 1]);
    }

    #[test]
    fn splits_for_block_size_largest_axis_first() {
        let dims = dims(&[8, 2]);
        // 16 elements * 1 byte, a target of 8 bytes needs two blocks, split the longest axis
        assert_eq!(splits_for_block_size(&dims, 1, 8).unwrap(), vec![2, 1]);
        // ties go to the first axis
        let dims_square = Dimensions::try_from([4, 4]).unwrap();
        assert_eq!(splits_for_block_size(&dims_square, 1, 8).unwrap(), vec![2, 1]);
        assert_eq!(splits_for_block_size(&dims_square, 1, 4).unwrap(), vec![2, 2]);
    }

    #[test]
    fn splits_for_block_size_within_target() {
        let dims = dims(&[64, 48, 10]);
        for target in [1u64, 7, 100, 1000, 4096, 20_000, 1_000_000] {
            let splits = splits_for_block_size(&dims, 4, target).unwrap();
            let geometry = BlockGeometry::new(dims.clone(), &splits).unwrap();
            let average = (dims.num_elements() * 4).div_ceil(geometry.num_blocks() as u64);
            let fully_split = std::iter::zip(&splits, dims.iter()).all(|(s, d)| s == d);
            assert!(average <= target || fully_split);
            // deterministic
            assert_eq!(splits, splits_for_block_size(&dims, 4, target).unwrap());
        }
    }

    #[test]
    fn splits_for_block_size_fully_split() {
        let dims = dims(&[3, 2]);
        assert_eq!(splits_for_block_size(&dims, 16, 1).unwrap(), vec![3, 2]);
        assert!(matches!(
            splits_for_block_size(&dims, 16, 0),
            Err(GeometryError::ZeroBlockSize)
        ));
    }

    #[test]
    fn compute_splits_dispatch() {
        let dims = dims(&[4, 4]);
        assert_eq!(
            compute_splits(&dims, 8, &SplitSpec::Splits(vec![2, 2])).unwrap(),
            vec![2, 2]
        );
        assert_eq!(
            compute_splits(&dims, 8, &SplitSpec::Bytes(32)).unwrap(),
            vec![2, 2]
        );
    }

    #[test]
    fn block_geometry() {
        let geometry = BlockGeometry::new(dims(&[5, 4]), &[2, 2]).unwrap();
        assert_eq!(geometry.num_blocks(), 4);
        assert_eq!(geometry.grid_shape(), &[2, 2]);
        assert_eq!(geometry.boundaries(0).unwrap(), &[0..3, 3..5]);
        assert_eq!(
            geometry.block_subset(&[1, 0].into()).unwrap(),
            ArraySubset::new_with_ranges(&[3..5, 0..2])
        );
        assert!(geometry.block_subset(&[2, 0].into()).is_err());
        assert!(geometry.block_subset(&[0].into()).is_err());
        assert!(matches!(
            BlockGeometry::new(dims(&[5, 4]), &[6, 1]),
            Err(GeometryError::InvalidSplitCount { axis: 0, .. })
        ));
    }

    #[test]
    fn block_geometry_padded() {
        let geometry = BlockGeometry::new(dims(&[6, 6]), &[3, 3]).unwrap();
        assert_eq!(
            geometry.padded_block_subset(&[1, 1].into(), &[1, 1]).unwrap(),
            ArraySubset::new_with_ranges(&[1..5, 1..5])
        );
        assert_eq!(
            geometry.padded_block_subset(&[0, 2].into(), &[1, 1]).unwrap(),
            ArraySubset::new_with_ranges(&[0..3, 3..6])
        );
        assert_eq!(
            geometry.padded_block_subset(&[0, 0].into(), &[5, 0]).unwrap(),
            ArraySubset::new_with_ranges(&[0..6, 0..2])
        );
        assert!(geometry.padded_block_subset(&[0, 0].into(), &[1]).is_err());
    }

    #[test]
    fn block_geometry_keys_storage_order() {
        let geometry = BlockGeometry::new(dims(&[4, 6, 2]), &[2, 3, 1]).unwrap();
        let keys = geometry.keys();
        assert_eq!(keys.len(), geometry.num_blocks());
        assert_eq!(
            keys.iter().map(|key| key.indices().to_vec()).collect::<Vec<_>>(),
            vec![
                vec![0, 0, 0],
                vec![1, 0, 0],
                vec![0, 1, 0],
                vec![1, 1, 0],
                vec![0, 2, 0],
                vec![1, 2, 0],
            ]
        );
    }
}
