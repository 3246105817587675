//! Array shape and index helpers shared by the geometry, strategy and block modules.

use ndarray::{ArrayViewD, ArrayViewMutD, Slice};

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<usize>;

/// The shape of an array.
pub type ArrayShape = Vec<usize>;

/// Slice every axis of `array` with the corresponding range in `ranges`.
///
/// `ranges` must have one range per axis and every range must be within bounds.
pub(crate) fn slice_ranges<'a, T>(
    array: &'a ArrayViewD<'_, T>,
    ranges: &[std::ops::Range<usize>],
) -> ArrayViewD<'a, T> {
    debug_assert_eq!(array.ndim(), ranges.len());
    array.slice_each_axis(|axis| Slice::from(ranges[axis.axis.index()].clone()))
}

/// Mutably slice every axis of `array` with the corresponding range in `ranges`.
pub(crate) fn slice_ranges_mut<'a, T>(
    array: &'a mut ArrayViewMutD<'_, T>,
    ranges: &[std::ops::Range<usize>],
) -> ArrayViewMutD<'a, T> {
    debug_assert_eq!(array.ndim(), ranges.len());
    array.slice_each_axis_mut(|axis| Slice::from(ranges[axis.axis.index()].clone()))
}
