use ndarray::Array1;

use crate::{array::ArrayIndices, dimensions::Dimensions};

/// One series per voxel of an image collection.
///
/// Every series has one value per image, in ascending image key order.
/// Records are in storage order, where the first axis of the voxel indices varies fastest.
#[derive(Clone, Debug)]
pub struct Series<T> {
    records: Vec<(ArrayIndices, Array1<T>)>,
    dims: Dimensions,
    nimages: usize,
}

impl<T> Series<T> {
    /// Create a new series collection.
    ///
    /// `records` must hold one record per voxel of `dims` in storage order.
    #[must_use]
    pub(crate) fn new(
        records: Vec<(ArrayIndices, Array1<T>)>,
        dims: Dimensions,
        nimages: usize,
    ) -> Self {
        debug_assert_eq!(records.len() as u64, dims.num_elements());
        Self {
            records,
            dims,
            nimages,
        }
    }

    /// Return the image dimensions.
    #[must_use]
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Return the length of every series.
    #[must_use]
    pub fn nimages(&self) -> usize {
        self.nimages
    }

    /// Return the number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the voxel indices and series in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&[usize], &Array1<T>)> {
        self.records
            .iter()
            .map(|(indices, series)| (indices.as_slice(), series))
    }

    /// Return the series of the voxel at `indices`, or [`None`] if `indices` are out of bounds.
    #[must_use]
    pub fn get(&self, indices: &[usize]) -> Option<&Array1<T>> {
        if indices.len() != self.dims.dimensionality()
            || std::iter::zip(indices, self.dims.iter()).any(|(index, size)| index >= size)
        {
            return None;
        }
        let mut position = 0;
        let mut stride = 1;
        for (index, size) in std::iter::zip(indices, self.dims.iter()) {
            position += index * stride;
            stride *= size;
        }
        self.records.get(position).map(|(_, series)| series)
    }

    /// Convert into voxel indices and series in storage order.
    #[must_use]
    pub fn into_records(self) -> Vec<(ArrayIndices, Array1<T>)> {
        self.records
    }
}
