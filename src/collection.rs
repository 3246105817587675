//! A partitioned record collection.
//!
//! A [`Collection`] holds records in partitions.
//! Per-record transforms run in parallel over partitions with [`rayon`].
//! [`Collection::group_by_key`] is an all-to-all exchange that co-locates every record with the same key in one partition.

use std::{
    cmp::Ordering,
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
};

use rayon::prelude::*;

use crate::config::global_config;

/// A collection of records held in partitions.
#[derive(Clone, Debug)]
pub struct Collection<R> {
    partitions: Vec<Vec<R>>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self {
            partitions: vec![Vec::new()],
        }
    }
}

/// Distribute `records` over `num_partitions` contiguous partitions.
///
/// The first `records.len() % num_partitions` partitions hold one more record than the rest.
fn partition_records<R>(records: Vec<R>, num_partitions: usize) -> Vec<Vec<R>> {
    let num_partitions = num_partitions.max(1);
    let base = records.len() / num_partitions;
    let remainder = records.len() % num_partitions;
    let mut records = records.into_iter();
    (0..num_partitions)
        .map(|i| {
            records
                .by_ref()
                .take(base + usize::from(i < remainder))
                .collect()
        })
        .collect()
}

fn partition_of<Kk: Hash>(key: &Kk, num_partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    usize::try_from(hasher.finish() % num_partitions as u64).unwrap_or_default()
}

impl<R> Collection<R> {
    /// Create a new collection from `records` distributed over `num_partitions` partitions.
    ///
    /// A `num_partitions` of zero is treated as one.
    #[must_use]
    pub fn from_records(records: Vec<R>, num_partitions: usize) -> Self {
        Self {
            partitions: partition_records(records, num_partitions),
        }
    }

    /// Create a new collection from `records` distributed over the [number of partitions](crate::config::Config#number-of-partitions) of the global configuration.
    #[must_use]
    pub fn from_records_default(records: Vec<R>) -> Self {
        let num_partitions = global_config().num_partitions();
        Self::from_records(records, num_partitions)
    }

    /// Create a new collection from existing partitions.
    #[must_use]
    pub fn from_partitions(partitions: Vec<Vec<R>>) -> Self {
        if partitions.is_empty() {
            Self::default()
        } else {
            Self { partitions }
        }
    }

    /// Return the number of partitions.
    #[must_use]
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Return the partitions.
    #[must_use]
    pub fn partitions(&self) -> &[Vec<R>] {
        &self.partitions
    }

    /// Return the number of records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    /// Returns true if the collection has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Vec::is_empty)
    }

    /// Return the first record.
    #[must_use]
    pub fn first(&self) -> Option<&R> {
        self.iter().next()
    }

    /// Iterate over the records in partition order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.partitions.iter().flatten()
    }

    /// Convert into records in partition order.
    #[must_use]
    pub fn into_records(self) -> Vec<R> {
        self.partitions.into_iter().flatten().collect()
    }

    /// Append a record to the last partition.
    pub fn push(&mut self, record: R) {
        match self.partitions.last_mut() {
            Some(partition) => partition.push(record),
            None => self.partitions.push(vec![record]),
        }
    }

    /// Append records to the last partition.
    pub fn extend(&mut self, records: impl IntoIterator<Item = R>) {
        for record in records {
            self.push(record);
        }
    }
}

impl<R: Send> Collection<R> {
    /// Keep the records for which `predicate` returns true.
    #[must_use]
    pub fn filter(self, predicate: impl Fn(&R) -> bool + Sync + Send) -> Self {
        let partitions = self
            .partitions
            .into_par_iter()
            .map(|partition| partition.into_iter().filter(|r| predicate(r)).collect())
            .collect();
        Self { partitions }
    }

    /// Transform every record with `f`.
    #[must_use]
    pub fn map<S: Send>(self, f: impl Fn(R) -> S + Sync + Send) -> Collection<S> {
        let partitions = self
            .partitions
            .into_par_iter()
            .map(|partition| partition.into_iter().map(&f).collect())
            .collect();
        Collection { partitions }
    }

    /// Transform every record with the fallible `f`.
    ///
    /// # Errors
    /// Returns the first error returned by `f`.
    pub fn try_map<S: Send, E: Send>(
        self,
        f: impl Fn(R) -> Result<S, E> + Sync + Send,
    ) -> Result<Collection<S>, E> {
        let partitions = self
            .partitions
            .into_par_iter()
            .map(|partition| partition.into_iter().map(&f).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Collection { partitions })
    }

    /// Sort every record with `compare`, then redistribute the sorted records over the same number of partitions.
    ///
    /// Partition `i` holds records that sort before those of partition `i + 1`.
    #[must_use]
    pub fn sort_by(self, compare: impl Fn(&R, &R) -> Ordering + Sync) -> Self {
        let num_partitions = self.num_partitions();
        let mut records = self.into_records();
        records.par_sort_by(compare);
        Self::from_records(records, num_partitions)
    }
}

impl<R: Sync> Collection<R> {
    /// Transform every record into zero or more records with `f`.
    #[must_use]
    pub fn flat_map<S: Send, I: IntoIterator<Item = S>>(
        &self,
        f: impl Fn(&R) -> I + Sync + Send,
    ) -> Collection<S> {
        let partitions = self
            .partitions
            .par_iter()
            .map(|partition| partition.iter().flat_map(&f).collect())
            .collect();
        Collection { partitions }
    }

    /// Transform every record into zero or more records with the fallible `f`.
    ///
    /// # Errors
    /// Returns the first error returned by `f`.
    pub fn try_flat_map<S: Send, E: Send, I: IntoIterator<Item = S>>(
        &self,
        f: impl Fn(&R) -> Result<I, E> + Sync + Send,
    ) -> Result<Collection<S>, E> {
        let partitions = self
            .partitions
            .par_iter()
            .map(|partition| {
                let mut output = Vec::new();
                for record in partition {
                    output.extend(f(record)?);
                }
                Ok::<_, E>(output)
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Collection { partitions })
    }
}

impl<Kk, V> Collection<(Kk, V)>
where
    Kk: Hash + Eq + Clone + Send,
    V: Send,
{
    /// Group records by key into `num_partitions` partitions.
    ///
    /// Every record is routed to a partition by a deterministic hash of its key, so all values of a key end up in one group.
    /// Groups within a partition are in the order their key was first seen, and values within a group keep their relative order.
    #[must_use]
    pub fn group_by_key(self, num_partitions: usize) -> Collection<(Kk, Vec<V>)> {
        let num_partitions = num_partitions.max(1);
        let routed: Vec<Vec<Vec<(Kk, V)>>> = self
            .partitions
            .into_par_iter()
            .map(|partition| {
                let mut buckets: Vec<Vec<(Kk, V)>> =
                    (0..num_partitions).map(|_| Vec::new()).collect();
                for (key, value) in partition {
                    buckets[partition_of(&key, num_partitions)].push((key, value));
                }
                buckets
            })
            .collect();

        let mut exchanged: Vec<Vec<(Kk, V)>> = (0..num_partitions).map(|_| Vec::new()).collect();
        for buckets in routed {
            for (target, bucket) in std::iter::zip(exchanged.iter_mut(), buckets) {
                target.extend(bucket);
            }
        }
        tracing::debug!(
            "exchanged records into partitions of sizes {:?}",
            exchanged.iter().map(Vec::len).collect::<Vec<_>>()
        );

        let partitions = exchanged
            .into_par_iter()
            .map(|partition| {
                let mut index: HashMap<Kk, usize> = HashMap::new();
                let mut groups: Vec<(Kk, Vec<V>)> = Vec::new();
                for (key, value) in partition {
                    if let Some(&i) = index.get(&key) {
                        groups[i].1.push(value);
                    } else {
                        index.insert(key.clone(), groups.len());
                        groups.push((key, vec![value]));
                    }
                }
                groups
            })
            .collect();
        Collection { partitions }
    }
}
