//! Image dimensions.
//!
//! [`Dimensions`] describe the extent of every image in a collection.
//! Every axis is non-zero, and the minimum and maximum index along an axis are `0` and `size - 1`.

use derive_more::Deref;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::array::ArrayShape;

/// The dimensions of an image or volume.
///
/// Axis `0` is the fastest varying logical axis (e.g. `x`).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Debug, Deref)]
#[serde(try_from = "ArrayShape", into = "ArrayShape")]
pub struct Dimensions(ArrayShape);

/// An invalid shape error.
#[derive(Clone, Debug, Error)]
pub enum InvalidShapeError {
    /// The shape has no axes.
    #[error("dimensions must have at least one axis")]
    ZeroDimensional,
    /// An axis has zero size.
    #[error("axis {0} of shape {1:?} has zero size")]
    ZeroSizedAxis(usize, ArrayShape),
    /// The number of elements does not fit in a `u64`.
    #[error("shape {0:?} has more than u64::MAX elements")]
    TooManyElements(ArrayShape),
}

impl Dimensions {
    /// Create new dimensions from a shape.
    ///
    /// # Errors
    /// Returns [`InvalidShapeError`] if `shape` is empty, any axis has zero size, or the number of elements overflows a `u64`.
    pub fn new(shape: ArrayShape) -> Result<Self, InvalidShapeError> {
        if shape.is_empty() {
            return Err(InvalidShapeError::ZeroDimensional);
        }
        if let Some(axis) = shape.iter().position(|&size| size == 0) {
            return Err(InvalidShapeError::ZeroSizedAxis(axis, shape));
        }
        if shape
            .iter()
            .try_fold(1u64, |acc, &size| acc.checked_mul(size as u64))
            .is_none()
        {
            return Err(InvalidShapeError::TooManyElements(shape));
        }
        Ok(Self(shape))
    }

    /// Return the number of axes.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.0.len()
    }

    /// Return the size of `axis`, or [`None`] if `axis` is out of range.
    #[must_use]
    pub fn size(&self, axis: usize) -> Option<usize> {
        self.0.get(axis).copied()
    }

    /// Return the minimum index along `axis`. Always zero.
    #[must_use]
    pub fn min(&self, axis: usize) -> Option<usize> {
        self.size(axis).map(|_| 0)
    }

    /// Return the maximum (inclusive) index along `axis`.
    #[must_use]
    pub fn max(&self, axis: usize) -> Option<usize> {
        self.size(axis).map(|size| size - 1)
    }

    /// Return the minimum index of every axis.
    #[must_use]
    pub fn mins(&self) -> ArrayShape {
        vec![0; self.dimensionality()]
    }

    /// Return the maximum (inclusive) index of every axis.
    #[must_use]
    pub fn maxs(&self) -> ArrayShape {
        self.0.iter().map(|size| size - 1).collect()
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.0
    }

    /// Return the number of elements.
    ///
    /// Equal to the product of the components of the shape, which always fits in a `u64`.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.0.iter().map(|&size| size as u64).product()
    }
}

impl core::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({})", itertools::join(&self.0, ", "))
    }
}

impl From<Dimensions> for ArrayShape {
    fn from(dimensions: Dimensions) -> Self {
        dimensions.0
    }
}

impl AsRef<[usize]> for Dimensions {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

macro_rules! try_from_dimensions {
    ( $t:ty ) => {
        impl TryFrom<$t> for Dimensions {
            type Error = InvalidShapeError;
            fn try_from(value: $t) -> Result<Self, Self::Error> {
                Dimensions::new(value.to_vec())
            }
        }
    };
    ( $t:ty, $g:ident ) => {
        impl<const $g: usize> TryFrom<$t> for Dimensions {
            type Error = InvalidShapeError;
            fn try_from(value: $t) -> Result<Self, Self::Error> {
                Dimensions::new(value.to_vec())
            }
        }
    };
}

try_from_dimensions!(Vec<usize>);
try_from_dimensions!(&[usize]);
try_from_dimensions!([usize; N], N);
try_from_dimensions!(&[usize; N], N);
