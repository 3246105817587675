//! Block keys.
//!
//! A [`SpatialKey`] locates a block in the block grid.
//! A [`PartitioningKey`] pairs a spatial key with the key of the image a fragment was cut from.

use std::cmp::Ordering;

use derive_more::{Deref, Display, From};
use serde::{Deserialize, Serialize};

use crate::array::ArrayIndices;

/// A trait for image keys.
///
/// Image keys order the images within a block.
pub trait ImageKey: Ord + core::hash::Hash + Clone + core::fmt::Debug + Send + Sync + 'static {}

impl<K> ImageKey for K where K: Ord + core::hash::Hash + Clone + core::fmt::Debug + Send + Sync + 'static {}

/// The position of a block in the block grid, one index per axis.
///
/// Natural ordering is lexicographic in axis order.
/// Use [`SpatialKey::cmp_storage_order`] for the global block enumeration order.
#[derive(
    Serialize, Deserialize, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deref, From,
)]
#[display("{_0:?}")]
pub struct SpatialKey(ArrayIndices);

impl SpatialKey {
    /// Create a new spatial key from block indices.
    #[must_use]
    pub fn new(indices: ArrayIndices) -> Self {
        Self(indices)
    }

    /// Return the block indices.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Return the dimensionality of the key.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.0.len()
    }

    /// Compare two keys in storage order.
    ///
    /// Keys are compared on their reversed axis tuple, so the first axis varies fastest.
    #[must_use]
    pub fn cmp_storage_order(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl<const N: usize> From<[usize; N]> for SpatialKey {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

/// A key identifying a fragment of one image within one block.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PartitioningKey<K> {
    spatial_key: SpatialKey,
    image_key: K,
}

impl<K: ImageKey> PartitioningKey<K> {
    /// Create a new partitioning key.
    #[must_use]
    pub fn new(spatial_key: SpatialKey, image_key: K) -> Self {
        Self {
            spatial_key,
            image_key,
        }
    }

    /// Return the spatial key.
    #[must_use]
    pub fn spatial_key(&self) -> &SpatialKey {
        &self.spatial_key
    }

    /// Return the image key.
    #[must_use]
    pub fn image_key(&self) -> &K {
        &self.image_key
    }

    /// Convert into the image key.
    #[must_use]
    pub fn into_image_key(self) -> K {
        self.image_key
    }
}

impl<K: ImageKey> PartialOrd for PartitioningKey<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: ImageKey> Ord for PartitioningKey<K> {
    /// Storage order of the spatial key, then image key order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.spatial_key
            .cmp_storage_order(&other.spatial_key)
            .then_with(|| self.image_key.cmp(&other.image_key))
    }
}
