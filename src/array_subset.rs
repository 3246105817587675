//! Array subsets.
//!
//! An [`ArraySubset`] is a hyper-rectangle within an array, defined by a start and a shape.
//! Subsets describe the exact tile of a block, its padded extent, and the core region of a padded block.

mod indices_iterator;

pub use indices_iterator::IndicesIterator;

use derive_more::Display;
use itertools::izip;
use ndarray::{ArrayViewD, ArrayViewMutD};
use thiserror::Error;

use crate::array::{slice_ranges, slice_ranges_mut, ArrayIndices, ArrayShape};

/// An array subset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

impl ArraySubset {
    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset from a list of [`Range`](std::ops::Range)s.
    #[must_use]
    pub fn new_with_ranges(ranges: &[std::ops::Range<usize>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self { start, shape }
    }

    /// Create a new array subset from a start and end (exclusive).
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the size of `start` and `end` do not match.
    pub fn new_with_start_end_exc(
        start: ArrayIndices,
        end: ArrayIndices,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == end.len() {
            let shape = std::iter::zip(&start, end)
                .map(|(&start, end)| end.saturating_sub(start))
                .collect();
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(start.len(), end.len()))
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[usize] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the array subset as a list of ranges, one per axis.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<std::ops::Range<usize>> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(&start, &size)| start..start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    ///
    /// Equal to the product of the components of its shape.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().map(|&size| size as u64).product()
    }

    /// Grow the array subset by `before` and `after` elements on each axis, clamped to `[0, array_shape)`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `before`, `after` or `array_shape` do not match the array subset dimensionality.
    pub fn grow_bounded(
        &self,
        before: &[usize],
        after: &[usize],
        array_shape: &[usize],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        for len in [before.len(), after.len(), array_shape.len()] {
            if len != self.dimensionality() {
                return Err(IncompatibleDimensionalityError::new(
                    len,
                    self.dimensionality(),
                ));
            }
        }
        let start = std::iter::zip(&self.start, before)
            .map(|(start, before)| start.saturating_sub(*before))
            .collect();
        let end = izip!(self.end_exc(), after, array_shape)
            .map(|(end, after, shape)| std::cmp::min(end.saturating_add(*after), *shape))
            .collect();
        Self::new_with_start_end_exc(start, end)
    }

    /// Return this array subset in the coordinates of `subset_other`.
    ///
    /// The start of the returned array subset is relative to the start of `subset_other`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `subset_other` does not match the dimensionality of this array subset.
    pub fn relative_to(&self, subset_other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        if subset_other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                subset_other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let mut starts = Vec::with_capacity(self.start.len());
        let mut shapes = Vec::with_capacity(self.start.len());
        for (start, size, other_start, other_size) in izip!(
            &self.start,
            &self.shape,
            subset_other.start(),
            subset_other.shape(),
        ) {
            let output_start = start.saturating_sub(*other_start);
            let output_end =
                std::cmp::min((start + size).saturating_sub(*other_start), *other_size);
            starts.push(output_start);
            shapes.push(output_end.saturating_sub(output_start));
        }
        Ok(Self {
            start: starts,
            shape: shapes,
        })
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[usize]) -> bool {
        if self.dimensionality() != array_shape.len() {
            return false;
        }

        for (subset_start, subset_shape, shape) in izip!(self.start(), self.shape(), array_shape) {
            if subset_start + subset_shape > *shape {
                return false;
            }
        }
        true
    }

    /// Returns true if `subset_other` is entirely within this array subset.
    #[must_use]
    pub fn contains(&self, subset_other: &Self) -> bool {
        subset_other.dimensionality() == self.dimensionality()
            && izip!(self.to_ranges(), subset_other.to_ranges())
                .all(|(this, other)| this.start <= other.start && other.end <= this.end)
    }

    /// Return a view of the elements of `array` within this array subset.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleArrayShapeError`] if the shape of `array` does not encapsulate this array subset.
    pub fn view<'a, T>(
        &self,
        array: &'a ArrayViewD<'_, T>,
    ) -> Result<ArrayViewD<'a, T>, IncompatibleArrayShapeError> {
        if self.inbounds(array.shape()) {
            Ok(slice_ranges(array, &self.to_ranges()))
        } else {
            Err(IncompatibleArrayShapeError(
                array.shape().to_vec(),
                self.clone(),
            ))
        }
    }

    /// Return a mutable view of the elements of `array` within this array subset.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleArrayShapeError`] if the shape of `array` does not encapsulate this array subset.
    pub fn view_mut<'a, T>(
        &self,
        array: &'a mut ArrayViewMutD<'_, T>,
    ) -> Result<ArrayViewMutD<'a, T>, IncompatibleArrayShapeError> {
        if self.inbounds(array.shape()) {
            Ok(slice_ranges_mut(array, &self.to_ranges()))
        } else {
            Err(IncompatibleArrayShapeError(
                array.shape().to_vec(),
                self.clone(),
            ))
        }
    }

    /// Returns an iterator over the indices of elements within the subset.
    ///
    /// Iterates over the last dimension fastest (i.e. C-contiguous order).
    #[must_use]
    pub fn indices(&self) -> IndicesIterator {
        IndicesIterator::new(self.clone())
    }
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An incompatible array shape error.
#[derive(Clone, Debug, Error)]
#[error("incompatible array shape {0:?} with array subset {1}")]
pub struct IncompatibleArrayShapeError(ArrayShape, ArraySubset);
