use std::iter::FusedIterator;

use itertools::izip;

use crate::{array::ArrayIndices, array_subset::ArraySubset};

/// Iterates over element indices in an array subset.
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
pub struct IndicesIterator {
    subset_rev: ArraySubset,
    index: usize,
    num_elements: usize,
}

impl IndicesIterator {
    /// Create a new indices iterator.
    #[must_use]
    pub fn new(mut subset: ArraySubset) -> Self {
        let num_elements = subset.shape.iter().product();
        subset.start.reverse();
        subset.shape.reverse();
        Self {
            subset_rev: subset,
            index: 0,
            num_elements,
        }
    }
}

impl Iterator for IndicesIterator {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.num_elements {
            return None;
        }
        let mut current = self.index;
        let mut indices = vec![0; self.subset_rev.dimensionality()];
        for (out, &subset_start, &subset_size) in izip!(
            indices.iter_mut().rev(),
            self.subset_rev.start.iter(),
            self.subset_rev.shape.iter(),
        ) {
            *out = current % subset_size + subset_start;
            current /= subset_size;
        }
        self.index += 1;
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_elements - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIterator {}

impl FusedIterator for IndicesIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_iterator() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 5..7]);
        let indices: Vec<_> = subset.indices().collect();
        assert_eq!(indices, vec![vec![1, 5], vec![1, 6], vec![2, 5], vec![2, 6]]);
        assert_eq!(subset.indices().len(), 4);
    }

    #[test]
    fn indices_iterator_empty() {
        let subset = ArraySubset::new_with_ranges(&[0..0, 0..3]);
        assert_eq!(subset.indices().next(), None);
    }
}
