//! Image collections.
//!
//! [`Images`] is a partitioned collection of `(key, array)` records where every array has the same [`Dimensions`] and element type.
//!
//! The dimensions and number of images of a collection are cached.
//! Dimensions are established by probing one record with [`Images::establish_dims`] and validated against every record when it is split into blocks.
//! The image count is established with [`Images::count`] and cleared whenever records are added or removed.

use ndarray::{Array2, ArrayD, ArrayView2, Axis, Ix2, Slice};

use crate::{
    block_size::{BlockSizeSpec, Padding},
    blocks::{Blocks, Series},
    collection::Collection,
    data_type::{is_nan, DataType, Element, NumericElement},
    dimensions::Dimensions,
    errors::BlockingError,
    filters,
    keys::ImageKey,
    pipeline::{assemble, AssembleOptions},
};

/// An image record, an image key and its array.
pub type ImageRecord<K, T> = (K, ArrayD<T>);

/// Return the larger of `a` and `b`, or whichever is NaN.
fn max_nan<T: PartialOrd>(a: T, b: T) -> T {
    if is_nan(&a) || a >= b {
        a
    } else {
        b
    }
}

/// Return the smaller of `a` and `b`, or whichever is NaN.
fn min_nan<T: PartialOrd>(a: T, b: T) -> T {
    if is_nan(&a) || a <= b {
        a
    } else {
        b
    }
}

/// The metadata of an image collection.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ImagesMetadata {
    dims: Dimensions,
    data_type: DataType,
    nimages: usize,
}

impl ImagesMetadata {
    /// Create new images metadata.
    #[must_use]
    pub fn new(dims: Dimensions, data_type: DataType, nimages: usize) -> Self {
        Self {
            dims,
            data_type,
            nimages,
        }
    }

    /// Return the image dimensions.
    #[must_use]
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Return the data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the number of images.
    #[must_use]
    pub fn nimages(&self) -> usize {
        self.nimages
    }

    /// Return the size in bytes of one element of a block, which stacks every image.
    ///
    /// Saturates at `u64::MAX`.
    #[must_use]
    pub fn element_size(&self) -> u64 {
        (self.data_type.size() as u64).saturating_mul(self.nimages as u64)
    }

    /// Return the size in bytes of one image.
    ///
    /// Saturates at `u64::MAX`.
    #[must_use]
    pub fn image_bytes(&self) -> u64 {
        self.dims
            .num_elements()
            .saturating_mul(self.data_type.size() as u64)
    }
}

/// A collection of images or volumes.
#[derive(Clone, Debug)]
pub struct Images<K, T> {
    records: Collection<ImageRecord<K, T>>,
    dims: Option<Dimensions>,
    nimages: Option<usize>,
}

impl<K: ImageKey, T: Element> Images<K, T> {
    /// Create a new image collection from `records`.
    ///
    /// Records are distributed over the [number of partitions](crate::config::Config#number-of-partitions) of the global configuration.
    #[must_use]
    pub fn new(records: Vec<ImageRecord<K, T>>) -> Self {
        Self::from_collection(Collection::from_records_default(records))
    }

    /// Create a new image collection from a partitioned collection of records.
    #[must_use]
    pub fn from_collection(records: Collection<ImageRecord<K, T>>) -> Self {
        Self {
            records,
            dims: None,
            nimages: None,
        }
    }

    /// Create a new image collection from records in existing partitions.
    #[must_use]
    pub fn from_partitions(partitions: Vec<Vec<ImageRecord<K, T>>>) -> Self {
        Self::from_collection(Collection::from_partitions(partitions))
    }

    /// Create a new image collection with known dimensions.
    ///
    /// The dimensions are validated against every record when the collection is split into blocks.
    #[must_use]
    pub fn with_dims(records: Vec<ImageRecord<K, T>>, dims: Dimensions) -> Self {
        Self {
            dims: Some(dims),
            ..Self::new(records)
        }
    }

    pub(crate) fn with_metadata(
        records: Collection<ImageRecord<K, T>>,
        metadata: ImagesMetadata,
    ) -> Self {
        Self {
            records,
            dims: Some(metadata.dims),
            nimages: Some(metadata.nimages),
        }
    }

    /// Return the records.
    #[must_use]
    pub fn records(&self) -> &Collection<ImageRecord<K, T>> {
        &self.records
    }

    /// Convert into records in partition order.
    #[must_use]
    pub fn into_records(self) -> Vec<ImageRecord<K, T>> {
        self.records.into_records()
    }

    /// Return the image dimensions if they have been established.
    #[must_use]
    pub fn dims(&self) -> Option<&Dimensions> {
        self.dims.as_ref()
    }

    /// Establish the image dimensions from the first record if they are not known.
    ///
    /// # Errors
    /// Returns [`BlockingError::EmptyImages`] if there are no records, or [`BlockingError::InvalidShape`] if the first record has an invalid shape.
    pub fn establish_dims(&mut self) -> Result<&Dimensions, BlockingError> {
        if self.dims.is_none() {
            let (_, array) = self.records.first().ok_or(BlockingError::EmptyImages)?;
            let dims = Dimensions::new(array.shape().to_vec())?;
            tracing::debug!("established image dimensions {dims} from the first record");
            self.dims = Some(dims);
        }
        self.dims.as_ref().ok_or(BlockingError::EmptyImages)
    }

    /// Return the number of images if it has been counted.
    #[must_use]
    pub fn nimages(&self) -> Option<usize> {
        self.nimages
    }

    /// Count the images and cache the result.
    pub fn count(&mut self) -> usize {
        *self.nimages.get_or_insert_with(|| self.records.count())
    }

    /// Return the data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// Establish the dimensions and number of images and return the collection metadata.
    ///
    /// # Errors
    /// Returns [`BlockingError::EmptyImages`] if there are no records, [`BlockingError::InvalidShape`] if the dimensions cannot be established, or [`BlockingError::RecordShapeMismatch`] if the first record does not match known dimensions.
    pub fn metadata(&mut self) -> Result<ImagesMetadata, BlockingError> {
        let dims = self.establish_dims()?.clone();
        if let Some((_, array)) = self.records.first() {
            if array.shape() != dims.shape() {
                return Err(BlockingError::RecordShapeMismatch(
                    array.shape().to_vec(),
                    dims,
                ));
            }
        }
        let nimages = self.count();
        if nimages == 0 {
            return Err(BlockingError::EmptyImages);
        }
        Ok(ImagesMetadata::new(dims, T::DATA_TYPE, nimages))
    }

    /// Clear the cached number of images.
    pub fn reset_counts(&mut self) {
        self.nimages = None;
    }

    /// Append a record.
    pub fn push(&mut self, record: ImageRecord<K, T>) {
        self.records.push(record);
        self.reset_counts();
    }

    /// Append records.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ImageRecord<K, T>>) {
        self.records.extend(records);
        self.reset_counts();
    }

    /// Keep the records for which `predicate` returns true.
    #[must_use]
    pub fn filter(self, predicate: impl Fn(&ImageRecord<K, T>) -> bool + Sync + Send) -> Self {
        Self {
            records: self.records.filter(predicate),
            dims: self.dims,
            nimages: None,
        }
    }

    /// Transform every image with `f`.
    ///
    /// `f` must preserve the shape of the image, the cached dimensions are kept.
    #[must_use]
    pub fn map_values<U: Element>(
        self,
        f: impl Fn(ArrayD<T>) -> ArrayD<U> + Sync + Send,
    ) -> Images<K, U> {
        Images {
            records: self.records.map(|(key, array)| (key, f(array))),
            dims: self.dims,
            nimages: self.nimages,
        }
    }

    fn map_geometry<U: Element>(
        self,
        dims: Dimensions,
        f: impl Fn(ArrayD<T>) -> ArrayD<U> + Sync + Send,
    ) -> Images<K, U> {
        Images {
            records: self.records.map(|(key, array)| (key, f(array))),
            dims: Some(dims),
            nimages: self.nimages,
        }
    }

    /// Subtract `value` from every element of every image.
    ///
    /// Integer elements wrap around on overflow.
    #[must_use]
    pub fn subtract(self, value: T) -> Self
    where
        T: NumericElement,
    {
        self.map_values(|array| array.mapv_into(|x| x.wrapping_sub(value)))
    }

    /// Subtract `image` from every image.
    ///
    /// Integer elements wrap around on overflow.
    ///
    /// # Errors
    /// Returns [`BlockingError::RecordShapeMismatch`] if the shape of `image` does not match the image dimensions.
    pub fn subtract_image(mut self, image: &ArrayD<T>) -> Result<Self, BlockingError>
    where
        T: NumericElement,
    {
        let dims = self.establish_dims()?;
        if image.shape() != dims.shape() {
            return Err(BlockingError::RecordShapeMismatch(
                image.shape().to_vec(),
                dims.clone(),
            ));
        }
        Ok(self.map_values(|mut array| {
            array.zip_mut_with(image, |x, &y| *x = x.wrapping_sub(y));
            array
        }))
    }

    fn projection_dims(&mut self, axis: usize) -> Result<Dimensions, BlockingError> {
        let dims = self.establish_dims()?;
        if axis >= dims.dimensionality() {
            return Err(BlockingError::InvalidAxis {
                axis,
                dimensionality: dims.dimensionality(),
            });
        }
        let mut shape = dims.shape().to_vec();
        shape.remove(axis);
        Ok(Dimensions::new(shape)?)
    }

    /// Compute the maximum projection of every image along `axis`.
    ///
    /// A lane containing NaN projects to NaN.
    ///
    /// # Errors
    /// Returns [`BlockingError::InvalidAxis`] if `axis` is out of range, or [`BlockingError::InvalidShape`] if the images have a single axis.
    pub fn max_projection(mut self, axis: usize) -> Result<Self, BlockingError> {
        let dims = self.projection_dims(axis)?;
        Ok(self.map_geometry(dims, |array| {
            array.map_axis(Axis(axis), |lane| {
                lane.iter()
                    .copied()
                    .reduce(max_nan)
                    .unwrap_or_default()
            })
        }))
    }

    /// Compute the maximum plus minimum projection of every image along `axis`.
    ///
    /// Integer elements wrap around on overflow, and a lane containing NaN projects to NaN.
    ///
    /// # Errors
    /// Returns [`BlockingError::InvalidAxis`] if `axis` is out of range, or [`BlockingError::InvalidShape`] if the images have a single axis.
    pub fn maxmin_projection(mut self, axis: usize) -> Result<Self, BlockingError>
    where
        T: NumericElement,
    {
        let dims = self.projection_dims(axis)?;
        Ok(self.map_geometry(dims, |array| {
            array.map_axis(Axis(axis), |lane| {
                lane.iter()
                    .copied()
                    .fold(None, |extrema: Option<(T, T)>, x| match extrema {
                        None => Some((x, x)),
                        Some((min, max)) => Some((min_nan(min, x), max_nan(max, x))),
                    })
                    .map(|(min, max)| max.wrapping_add(min))
                    .unwrap_or_default()
            })
        }))
    }

    /// Apply `filter` to every two-dimensional image, or to every plane along the third axis of a volume.
    fn filter_planes(
        mut self,
        filter: impl Fn(ArrayView2<'_, T>) -> Result<Array2<T>, BlockingError> + Sync + Send,
    ) -> Result<Self, BlockingError> {
        let dims = self.establish_dims()?.clone();
        if !matches!(dims.dimensionality(), 2 | 3) {
            return Err(BlockingError::InvalidArgument(format!(
                "cannot filter images with dimensions {dims}, images must be 2D or 3D"
            )));
        }
        let records = self.records.try_map(
            |(key, mut array)| -> Result<ImageRecord<K, T>, BlockingError> {
                if array.shape() != dims.shape() {
                    return Err(BlockingError::RecordShapeMismatch(
                        array.shape().to_vec(),
                        dims.clone(),
                    ));
                }
                if array.ndim() == 2 {
                    let filtered = filter(array.view().into_dimensionality::<Ix2>()?)?;
                    return Ok((key, filtered.into_dyn()));
                }
                for mut plane in array.axis_iter_mut(Axis(2)) {
                    let filtered = filter(plane.view().into_dimensionality::<Ix2>()?)?;
                    plane.assign(&filtered.into_dyn());
                }
                Ok((key, array))
            },
        )?;
        Ok(Self {
            records,
            dims: Some(dims),
            nimages: self.nimages,
        })
    }

    /// Smooth every image with a gaussian filter of standard deviation `sigma`.
    ///
    /// Two-dimensional images are filtered whole, volumes are filtered plane by plane along the third axis.
    /// See [`filters::gaussian_filter`].
    ///
    /// # Errors
    /// Returns [`BlockingError::InvalidArgument`] if the images are not two or three-dimensional or `sigma` is not positive and finite.
    pub fn gaussian_filter(self, sigma: f64) -> Result<Self, BlockingError>
    where
        T: NumericElement,
    {
        filters::gaussian_kernel(sigma)?;
        self.filter_planes(|plane| filters::gaussian_filter(plane, sigma))
    }

    /// Smooth every image with a median filter over a `size` by `size` window.
    ///
    /// Two-dimensional images are filtered whole, volumes are filtered plane by plane along the third axis.
    /// See [`filters::median_filter`].
    ///
    /// # Errors
    /// Returns [`BlockingError::InvalidArgument`] if the images are not two or three-dimensional or `size` is zero.
    pub fn median_filter(self, size: usize) -> Result<Self, BlockingError> {
        if size == 0 {
            return Err(BlockingError::InvalidArgument(
                "median filter size must be positive".to_string(),
            ));
        }
        self.filter_planes(|plane| filters::median_filter(plane, size))
    }

    /// Subsample every image with the same stride `factor` along every axis.
    ///
    /// # Errors
    /// See [`Images::subsample_per_axis`].
    pub fn subsample(mut self, factor: usize) -> Result<Self, BlockingError> {
        let factors = vec![factor; self.establish_dims()?.dimensionality()];
        self.subsample_per_axis(&factors)
    }

    /// Subsample every image with a stride of `factors[i]` along axis `i`.
    ///
    /// The new size of an axis is the number of elements visited by its stride, `ceil(size / factor)`.
    ///
    /// # Errors
    /// Returns a [`BlockingError`] if any factor is zero or the number of factors does not match the image dimensionality.
    pub fn subsample_per_axis(mut self, factors: &[usize]) -> Result<Self, BlockingError> {
        let dims = self.establish_dims()?;
        if factors.len() != dims.dimensionality() {
            return Err(crate::array_subset::IncompatibleDimensionalityError::new(
                factors.len(),
                dims.dimensionality(),
            )
            .into());
        }
        let steps = factors
            .iter()
            .map(|&factor| match isize::try_from(factor) {
                Ok(step) if step > 0 => Ok(step),
                _ => Err(BlockingError::InvalidArgument(format!(
                    "sampling factors must be positive, got {factors:?}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let new_dims = Dimensions::new(
            std::iter::zip(dims.iter(), factors)
                .map(|(size, factor)| size.div_ceil(*factor))
                .collect(),
        )?;
        tracing::debug!("subsampling images from {dims} to {new_dims}");
        Ok(self.map_geometry(new_dims, move |array| {
            array
                .slice_each_axis(|axis| Slice::new(0, None, steps[axis.axis.index()]))
                .to_owned()
        }))
    }

    /// Select the planes `bottom..=top` (or `bottom+1..top` if not `inclusive`) of three-dimensional images.
    ///
    /// Planes are indexed along the third axis.
    /// If a single plane is selected, the third axis is removed.
    ///
    /// # Errors
    /// Returns [`BlockingError::InvalidArgument`] if the images are not three-dimensional with more than one plane, no planes are selected, or a selected plane is out of range.
    pub fn planes(mut self, bottom: usize, top: usize, inclusive: bool) -> Result<Self, BlockingError> {
        let dims = self.establish_dims()?;
        if dims.dimensionality() != 3 || dims[2] == 1 {
            return Err(BlockingError::InvalidArgument(format!(
                "cannot select planes of images with dimensions {dims}, images must be 3D"
            )));
        }
        let planes = if inclusive {
            bottom..top.saturating_add(1)
        } else {
            bottom.saturating_add(1)..top
        };
        if planes.is_empty() {
            return Err(BlockingError::InvalidArgument(format!(
                "no planes selected with range ({bottom}, {top}) and inclusive={inclusive}"
            )));
        }
        let last = dims.max(2).unwrap_or_default();
        if planes.end - 1 > last {
            return Err(BlockingError::InvalidArgument(format!(
                "cannot include plane {}, last plane is {last}",
                planes.end - 1
            )));
        }
        let squeeze = planes.len() == 1;
        let mut shape = vec![dims[0], dims[1]];
        if !squeeze {
            shape.push(planes.len());
        }
        let new_dims = Dimensions::new(shape)?;
        Ok(self.map_geometry(new_dims, move |array| {
            let selected = array.slice_axis(Axis(2), Slice::from(planes.clone()));
            if squeeze {
                selected.index_axis(Axis(2), 0).to_owned()
            } else {
                selected.to_owned()
            }
        }))
    }

    /// Split every image into blocks.
    ///
    /// Equivalent to [`assemble`] with a strategy created from `block_size_spec` and `padding`, and the default [`AssembleOptions`].
    ///
    /// # Errors
    /// Returns a [`BlockingError`] if the images cannot be split into blocks.
    pub fn to_blocks(
        &mut self,
        block_size_spec: impl Into<BlockSizeSpec>,
        padding: impl Into<Padding>,
    ) -> Result<Blocks<K, T>, BlockingError> {
        let mut strategy = block_size_spec.into().into_strategy(padding.into());
        assemble(self, &mut strategy, &AssembleOptions::default())
    }

    /// Convert to one series per voxel.
    ///
    /// Equivalent to `images.to_blocks(block_size_spec, 0)?.to_series()`.
    ///
    /// # Errors
    /// Returns a [`BlockingError`] if the images cannot be split into blocks.
    pub fn to_series(
        &mut self,
        block_size_spec: impl Into<BlockSizeSpec>,
    ) -> Result<Series<T>, BlockingError> {
        Ok(self.to_blocks(block_size_spec, Padding::default())?.to_series())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn images_2d() -> Images<u32, i32> {
        Images::new(vec![
            (0, array![[1, 5], [3, 2]].into_dyn()),
            (1, array![[4, 0], [2, 7]].into_dyn()),
        ])
    }

    #[test]
    fn images_metadata() {
        let mut images = images_2d();
        assert_eq!(images.dims(), None);
        assert_eq!(images.nimages(), None);
        let metadata = images.metadata().unwrap();
        assert_eq!(metadata.dims().shape(), &[2, 2]);
        assert_eq!(metadata.nimages(), 2);
        assert_eq!(metadata.data_type(), DataType::Int32);
        assert_eq!(metadata.element_size(), 8);
        assert_eq!(metadata.image_bytes(), 16);
        assert_eq!(images.nimages(), Some(2));

        images.push((2, array![[0, 0], [0, 0]].into_dyn()));
        assert_eq!(images.nimages(), None);
        assert_eq!(images.count(), 3);
        let images = images.filter(|(key, _)| *key != 1);
        assert_eq!(images.nimages(), None);
        assert!(images.dims().is_some());
    }

    #[test]
    fn images_empty() {
        let mut images: Images<u32, f32> = Images::new(vec![]);
        assert!(matches!(
            images.establish_dims(),
            Err(BlockingError::EmptyImages)
        ));
        assert!(matches!(images.metadata(), Err(BlockingError::EmptyImages)));
    }

    #[test]
    fn images_subtract() {
        let images = images_2d().subtract(1);
        assert_eq!(
            images.into_records()[1].1,
            array![[3, -1], [1, 6]].into_dyn()
        );
        let images = images_2d()
            .subtract_image(&array![[1, 0], [2, 2]].into_dyn())
            .unwrap();
        assert_eq!(
            images.into_records()[0].1,
            array![[0, 5], [1, 0]].into_dyn()
        );
        assert!(matches!(
            images_2d().subtract_image(&array![[1, 0, 0]].into_dyn()),
            Err(BlockingError::RecordShapeMismatch(..))
        ));
    }

    #[test]
    fn images_projection() {
        let images = images_2d().max_projection(0).unwrap();
        assert_eq!(images.dims().unwrap().shape(), &[2]);
        let records = images.into_records();
        assert_eq!(records[0].1, array![3, 5].into_dyn());
        assert_eq!(records[1].1, array![4, 7].into_dyn());

        let images = images_2d().maxmin_projection(1).unwrap();
        let records = images.into_records();
        assert_eq!(records[0].1, array![6, 5].into_dyn());
        assert_eq!(records[1].1, array![4, 9].into_dyn());

        assert!(matches!(
            images_2d().max_projection(2),
            Err(BlockingError::InvalidAxis {
                axis: 2,
                dimensionality: 2
            })
        ));
    }

    #[test]
    fn images_subtract_wraps() {
        let images: Images<u64, u8> = Images::new(vec![(0, array![[0, 5]].into_dyn())]);
        assert_eq!(
            images.subtract(1).into_records()[0].1,
            array![[255, 4]].into_dyn()
        );
        let images: Images<u64, u8> = Images::new(vec![(0, array![[0, 5]].into_dyn())]);
        let images = images
            .subtract_image(&array![[1, 10]].into_dyn())
            .unwrap();
        assert_eq!(images.into_records()[0].1, array![[255, 251]].into_dyn());
        let images: Images<u64, i8> = Images::new(vec![(0, array![[-128, 0]].into_dyn())]);
        assert_eq!(
            images.subtract(1).into_records()[0].1,
            array![[127, -1]].into_dyn()
        );
    }

    #[test]
    fn images_maxmin_projection_wraps() {
        let images: Images<u64, u8> = Images::new(vec![(0, array![[200, 100]].into_dyn())]);
        let images = images.maxmin_projection(1).unwrap();
        assert_eq!(images.into_records()[0].1, array![44].into_dyn());
        let images: Images<u64, u8> = Images::new(vec![(0, array![[200, 100]].into_dyn())]);
        let images = images.max_projection(1).unwrap();
        assert_eq!(images.into_records()[0].1, array![200].into_dyn());
    }

    #[test]
    fn images_projection_nan() {
        let images: Images<u32, f64> = Images::new(vec![(
            0,
            array![[1.0, f64::NAN, 3.0], [2.0, 5.0, 4.0]].into_dyn(),
        )]);
        let projected = images.clone().max_projection(1).unwrap().into_records();
        assert!(projected[0].1[[0]].is_nan());
        assert_eq!(projected[0].1[[1]], 5.0);
        let projected = images.clone().max_projection(0).unwrap().into_records();
        assert_eq!(projected[0].1[[0]], 2.0);
        assert!(projected[0].1[[1]].is_nan());
        let projected = images.maxmin_projection(1).unwrap().into_records();
        assert!(projected[0].1[[0]].is_nan());
        assert_eq!(projected[0].1[[1]], 7.0);
    }

    #[test]
    fn images_median_filter() {
        let images: Images<u32, u16> = Images::new(vec![
            (0, array![[1, 1, 1], [1, 50, 1], [1, 1, 1]].into_dyn()),
            (1, array![[4, 4, 4], [4, 4, 4], [4, 4, 4]].into_dyn()),
        ]);
        let filtered = images.median_filter(3).unwrap();
        assert_eq!(filtered.dims().unwrap().shape(), &[3, 3]);
        let records = filtered.into_records();
        assert_eq!(records[0].1, ndarray::ArrayD::from_elem(vec![3, 3], 1));
        assert_eq!(records[1].1, ndarray::ArrayD::from_elem(vec![3, 3], 4));
        assert!(matches!(
            images_2d().median_filter(0),
            Err(BlockingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn images_gaussian_filter() {
        let mut volume = ndarray::Array3::<f32>::zeros((5, 5, 2));
        volume[[2, 2, 0]] = 1.0;
        volume.index_axis_mut(Axis(2), 1).fill(3.0);
        let images: Images<u32, f32> = Images::new(vec![(0, volume.into_dyn())]);
        let filtered = images.gaussian_filter(1.0).unwrap();
        assert_eq!(filtered.dims().unwrap().shape(), &[5, 5, 2]);
        let volume = filtered.into_records().remove(0).1;
        let impulse = volume.index_axis(Axis(2), 0);
        assert!(impulse[[2, 2]] < 1.0);
        assert!(impulse[[2, 2]] > impulse[[2, 3]]);
        assert!((impulse[[1, 2]] - impulse[[3, 2]]).abs() < 1e-6);
        // planes are filtered independently
        assert!(volume
            .index_axis(Axis(2), 1)
            .iter()
            .all(|&x| (x - 3.0).abs() < 1e-5));

        assert!(images_2d().gaussian_filter(0.0).is_err());
        let line: Images<u32, f32> = Images::new(vec![(0, array![1.0, 2.0].into_dyn())]);
        assert!(matches!(
            line.gaussian_filter(1.0),
            Err(BlockingError::InvalidArgument(_))
        ));
        let images = images_2d().gaussian_filter(2.0).unwrap();
        assert_eq!(images.dims().unwrap().shape(), &[2, 2]);
    }

    #[test]
    fn images_with_dims_mismatch() {
        let dims = Dimensions::new(vec![1 << 31, 1 << 31, 3]).unwrap();
        let mut images: Images<u32, u64> =
            Images::with_dims(vec![(0, array![[1, 2]].into_dyn())], dims);
        assert!(matches!(
            images.metadata(),
            Err(BlockingError::RecordShapeMismatch(..))
        ));
        assert!(matches!(
            images.to_blocks(BlockSizeSpec::Bytes(1024), 0usize),
            Err(BlockingError::RecordShapeMismatch(..))
        ));
    }

    #[test]
    fn images_subsample() {
        let array = ndarray::Array::from_shape_vec((5, 4), (0..20).collect())
            .unwrap()
            .into_dyn();
        let images: Images<u8, i32> = Images::new(vec![(0, array)]);
        let subsampled = images.clone().subsample(2).unwrap();
        assert_eq!(subsampled.dims().unwrap().shape(), &[3, 2]);
        assert_eq!(
            subsampled.into_records()[0].1,
            array![[0, 2], [8, 10], [16, 18]].into_dyn()
        );
        let subsampled = images.clone().subsample_per_axis(&[1, 3]).unwrap();
        assert_eq!(subsampled.dims().unwrap().shape(), &[5, 2]);
        assert!(images.clone().subsample(0).is_err());
        assert!(images.subsample_per_axis(&[2]).is_err());
    }

    #[test]
    fn images_planes() {
        let array = ndarray::Array::from_shape_vec((2, 2, 4), (0..16).collect())
            .unwrap()
            .into_dyn();
        let images: Images<u8, i32> = Images::new(vec![(0, array)]);

        let selected = images.clone().planes(1, 2, true).unwrap();
        assert_eq!(selected.dims().unwrap().shape(), &[2, 2, 2]);
        assert_eq!(
            selected.into_records()[0].1,
            array![[[1, 2], [5, 6]], [[9, 10], [13, 14]]].into_dyn()
        );

        let selected = images.clone().planes(0, 2, false).unwrap();
        assert_eq!(selected.dims().unwrap().shape(), &[2, 2]);
        assert_eq!(
            selected.into_records()[0].1,
            array![[1, 5], [9, 13]].into_dyn()
        );

        assert!(images.clone().planes(2, 2, false).is_err());
        assert!(images.clone().planes(2, 4, true).is_err());
        assert!(images_2d().planes(0, 1, true).is_err());
    }
}
