//! Spatial filters of two-dimensional images.
//!
//! Images are extended beyond their boundary by reflection about the edge, `d c b a | a b c d | d c b a`.
//! [`Images::gaussian_filter`](crate::Images::gaussian_filter) and [`Images::median_filter`](crate::Images::median_filter) apply these filters to whole images, or plane by plane to volumes.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView2, Axis, Zip};
use num::ToPrimitive;

use crate::{
    data_type::{is_nan, DataType, Element, NumericElement},
    errors::BlockingError,
};

/// The gaussian kernel is truncated at this many standard deviations.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Map an index outside of `0..len` back inside by reflection about the edges.
fn reflect_index(index: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let index = index.rem_euclid(period) as usize;
    if index < len {
        index
    } else {
        2 * len - 1 - index
    }
}

/// Order elements with NaN after every other value.
fn cmp_nan_last<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b)
        .unwrap_or_else(|| is_nan(a).cmp(&is_nan(b)))
}

/// Return the normalised weights of a gaussian kernel with standard deviation `sigma`.
///
/// The kernel has a radius of `4 * sigma` rounded to the nearest integer.
///
/// # Errors
/// Returns [`BlockingError::InvalidArgument`] if `sigma` is not positive and finite.
pub fn gaussian_kernel(sigma: f64) -> Result<Vec<f64>, BlockingError> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(BlockingError::InvalidArgument(format!(
            "gaussian filter sigma must be positive and finite, got {sigma}"
        )));
    }
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|weight| weight / sum).collect())
}

/// Correlate every lane of `input` along `axis` with `weights`.
fn correlate_axis(input: &Array2<f64>, weights: &[f64], axis: Axis) -> Array2<f64> {
    let radius = (weights.len() / 2) as isize;
    let mut output = Array2::zeros(input.raw_dim());
    Zip::from(output.lanes_mut(axis))
        .and(input.lanes(axis))
        .for_each(|mut output, input| {
            let len = input.len();
            for (i, output) in output.iter_mut().enumerate() {
                *output = weights
                    .iter()
                    .enumerate()
                    .map(|(j, weight)| {
                        weight * input[reflect_index(i as isize + j as isize - radius, len)]
                    })
                    .sum();
            }
        });
    output
}

fn from_f64<T: NumericElement>(value: f64) -> T {
    let value = match T::DATA_TYPE {
        DataType::Float32 | DataType::Float64 => value,
        _ => value.round(),
    };
    num::cast(value).unwrap_or_default()
}

/// Smooth `image` with a gaussian filter of standard deviation `sigma`.
///
/// The filter is applied in `f64` as a separable correlation along each axis.
/// Integer results are rounded to the nearest value.
///
/// # Errors
/// Returns [`BlockingError::InvalidArgument`] if `sigma` is not positive and finite.
pub fn gaussian_filter<T: NumericElement>(
    image: ArrayView2<'_, T>,
    sigma: f64,
) -> Result<Array2<T>, BlockingError> {
    let weights = gaussian_kernel(sigma)?;
    let mut values = image.mapv(|x| x.to_f64().unwrap_or(f64::NAN));
    for axis in [Axis(0), Axis(1)] {
        values = correlate_axis(&values, &weights, axis);
    }
    Ok(values.mapv(from_f64))
}

/// Smooth `image` with a median filter over a `size` by `size` window.
///
/// The window of element `(i, j)` starts at `(i - size / 2, j - size / 2)`.
/// For an even number of elements the upper median is selected.
/// NaN sorts after every other value.
///
/// # Errors
/// Returns [`BlockingError::InvalidArgument`] if `size` is zero.
pub fn median_filter<T: Element>(
    image: ArrayView2<'_, T>,
    size: usize,
) -> Result<Array2<T>, BlockingError> {
    if size == 0 {
        return Err(BlockingError::InvalidArgument(
            "median filter size must be positive".to_string(),
        ));
    }
    let (rows, cols) = image.dim();
    let offset = (size / 2) as isize;
    let rank = size * size / 2;
    let mut window = Vec::with_capacity(size * size);
    Ok(Array2::from_shape_fn((rows, cols), |(row, col)| {
        window.clear();
        for i in 0..size {
            let row = reflect_index(row as isize + i as isize - offset, rows);
            for j in 0..size {
                let col = reflect_index(col as isize + j as isize - offset, cols);
                window.push(image[[row, col]]);
            }
        }
        *window.select_nth_unstable_by(rank, cmp_nan_last).1
    }))
}
