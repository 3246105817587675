//! Blocking errors.
//!
//! [`BlockingError`] aggregates every error that can occur while splitting images into blocks and combining them.

use thiserror::Error;

use crate::{
    array::ArrayShape,
    array_subset::{IncompatibleArrayShapeError, IncompatibleDimensionalityError},
    block_size::TypeSpecError,
    data_type::DataType,
    dimensions::{Dimensions, InvalidShapeError},
    geometry::GeometryError,
    keys::SpatialKey,
    strategy::{IncompleteBlockError, NotBoundError},
};

/// Blocking errors.
#[derive(Debug, Error)]
pub enum BlockingError {
    /// Invalid image dimensions.
    #[error(transparent)]
    InvalidShape(#[from] InvalidShapeError),
    /// A block geometry error.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// The blocking strategy has not been bound to image metadata.
    #[error(transparent)]
    NotBound(#[from] NotBoundError),
    /// A block is missing fragments or has too many.
    #[error(transparent)]
    IncompleteBlock(#[from] IncompleteBlockError),
    /// An invalid block size specification.
    #[error(transparent)]
    TypeSpec(#[from] TypeSpecError),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// An array subset does not fit an array.
    #[error(transparent)]
    IncompatibleArrayShape(#[from] IncompatibleArrayShapeError),
    /// An array shape error.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    /// The image collection has no records.
    #[error("the image collection is empty")]
    EmptyImages,
    /// An image record does not have the dimensions of the collection.
    #[error("image record has shape {0:?}, expected dimensions {1}")]
    RecordShapeMismatch(ArrayShape, Dimensions),
    /// The data type of the images does not match the data type the strategy was bound to.
    #[error("data type {0} does not match bound data type {1}")]
    DataTypeMismatch(DataType, DataType),
    /// A fragment belongs to a different block than the one being combined.
    #[error("fragment with spatial key {0} cannot be combined into block {1}")]
    ForeignFragment(SpatialKey, SpatialKey),
    /// Two fragments of a block have the same image key.
    #[error("duplicate image key {0} in block {1}")]
    DuplicateImageKey(String, SpatialKey),
    /// An axis is out of range.
    #[error("axis {axis} is out of range for dimensionality {dimensionality}")]
    InvalidAxis {
        /// The axis.
        axis: usize,
        /// The dimensionality.
        dimensionality: usize,
    },
    /// An invalid argument.
    #[error("{0}")]
    InvalidArgument(String),
}
