//! Block size and padding configuration.
//!
//! A [`BlockSizeSpec`] selects how images are split into blocks:
//!  - a target average block size in bytes, given as an integer or a memory size string such as `"150M"`,
//!  - an explicit number of splits per axis, or
//!  - a preconfigured [`BlockingStrategy`].
//!
//! Memory size strings use binary multiples (`k` = 1024) and are case-insensitive, with an optional trailing `b` or `ib`.
//!
//! A [`Padding`] overlaps neighbouring blocks by a halo of elements.

use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    array_subset::IncompatibleDimensionalityError, config::global_config,
    geometry::GeometryError, strategy::BlockingStrategy,
};

/// An invalid block size specification error.
#[derive(Clone, Debug, Error, From)]
#[error("invalid block size specification {0}")]
pub struct TypeSpecError(String);

/// A block size specification.
#[derive(Clone, Debug, From)]
pub enum BlockSizeSpec {
    /// A target average block size in bytes.
    Bytes(u64),
    /// An explicit number of splits per axis.
    Splits(Vec<usize>),
    /// A preconfigured blocking strategy.
    Strategy(BlockingStrategy),
}

impl Default for BlockSizeSpec {
    /// The [default block size](crate::config::Config#default-block-size), `150M` unless reconfigured.
    fn default() -> Self {
        Self::Bytes(global_config().default_block_size())
    }
}

impl BlockSizeSpec {
    /// Convert into a [`BlockingStrategy`] with `padding`.
    ///
    /// `padding` is ignored if this is a [`BlockSizeSpec::Strategy`].
    #[must_use]
    pub fn into_strategy(self, padding: Padding) -> BlockingStrategy {
        match self {
            Self::Bytes(block_size) => BlockingStrategy::from_block_size(block_size, padding),
            Self::Splits(splits) => BlockingStrategy::from_splits(splits, padding),
            Self::Strategy(strategy) => strategy,
        }
    }
}

impl std::str::FromStr for BlockSizeSpec {
    type Err = TypeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::Bytes(parse_memory_size(s)?))
    }
}

impl From<&[usize]> for BlockSizeSpec {
    fn from(splits: &[usize]) -> Self {
        Self::Splits(splits.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for BlockSizeSpec {
    fn from(splits: [usize; N]) -> Self {
        Self::Splits(splits.to_vec())
    }
}

impl TryFrom<&str> for BlockSizeSpec {
    type Error = TypeSpecError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<BlockSizeConfiguration> for BlockSizeSpec {
    type Error = TypeSpecError;

    fn try_from(configuration: BlockSizeConfiguration) -> Result<Self, Self::Error> {
        match configuration {
            BlockSizeConfiguration::Bytes(bytes) => Ok(Self::Bytes(bytes)),
            BlockSizeConfiguration::MemorySize(memory_size) => memory_size.parse(),
            BlockSizeConfiguration::Splits(splits) => Ok(Self::Splits(splits)),
        }
    }
}

impl TryFrom<&serde_json::Value> for BlockSizeSpec {
    type Error = TypeSpecError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let configuration: BlockSizeConfiguration = serde_json::from_value(value.clone())
            .map_err(|_| TypeSpecError(value.to_string()))?;
        configuration.try_into()
    }
}

/// The serialised form of a block size specification.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(untagged)]
pub enum BlockSizeConfiguration {
    /// A target average block size in bytes.
    Bytes(u64),
    /// A target average block size as a memory size string (e.g. `"150M"`).
    MemorySize(String),
    /// An explicit number of splits per axis.
    Splits(Vec<usize>),
}

impl core::fmt::Display for BlockSizeConfiguration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", serde_json::to_string(self).unwrap_or_default())
    }
}

/// Parse a memory size string (e.g. `"150M"`, `"64k"`, `"2GiB"`, `"1024"`) into bytes.
///
/// Suffixes `k`, `m`, `g`, and `t` are binary multiples and are case-insensitive.
/// A trailing `b` or `ib` is optional.
///
/// # Errors
/// Returns a [`TypeSpecError`] if `s` is not a valid memory size or the size overflows [`u64`].
pub fn parse_memory_size(s: &str) -> Result<u64, TypeSpecError> {
    let err = || TypeSpecError(s.to_string());
    let lower = s.trim().to_ascii_lowercase();
    let unit = lower
        .strip_suffix("ib")
        .or_else(|| lower.strip_suffix('b'))
        .unwrap_or(&lower);
    let (quantity, multiplier) = match unit.chars().last() {
        Some('k') => (&unit[..unit.len() - 1], 1u64 << 10),
        Some('m') => (&unit[..unit.len() - 1], 1u64 << 20),
        Some('g') => (&unit[..unit.len() - 1], 1u64 << 30),
        Some('t') => (&unit[..unit.len() - 1], 1u64 << 40),
        Some(c) if c.is_ascii_digit() => (unit, 1),
        _ => return Err(err()),
    };
    if quantity.is_empty() || !quantity.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    quantity
        .parse::<u64>()
        .ok()
        .and_then(|quantity| quantity.checked_mul(multiplier))
        .ok_or_else(err)
}

/// Padding applied to both sides of every block axis.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, From)]
#[serde(untagged)]
pub enum Padding {
    /// The same padding on every axis.
    Uniform(usize),
    /// Padding per axis.
    PerAxis(Vec<usize>),
}

impl Default for Padding {
    fn default() -> Self {
        Self::Uniform(0)
    }
}

impl From<&[usize]> for Padding {
    fn from(padding: &[usize]) -> Self {
        Self::PerAxis(padding.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Padding {
    fn from(padding: [usize; N]) -> Self {
        Self::PerAxis(padding.to_vec())
    }
}

impl Padding {
    /// Returns true if there is no padding on any axis.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Uniform(padding) => *padding == 0,
            Self::PerAxis(padding) => padding.iter().all(|&padding| padding == 0),
        }
    }

    /// Return the padding of every axis of an image with `dimensionality` axes.
    ///
    /// # Errors
    /// Returns [`GeometryError::IncompatibleDimensionality`] if per axis padding does not match `dimensionality`.
    pub fn for_dimensionality(&self, dimensionality: usize) -> Result<Vec<usize>, GeometryError> {
        match self {
            Self::Uniform(padding) => Ok(vec![*padding; dimensionality]),
            Self::PerAxis(padding) => {
                if padding.len() == dimensionality {
                    Ok(padding.clone())
                } else {
                    Err(IncompatibleDimensionalityError::new(padding.len(), dimensionality).into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_size() {
        assert_eq!(parse_memory_size("150M").unwrap(), 150 * 1024 * 1024);
        assert_eq!(parse_memory_size("150m").unwrap(), 150 * 1024 * 1024);
        assert_eq!(parse_memory_size("64k").unwrap(), 65536);
        assert_eq!(parse_memory_size("64KB").unwrap(), 65536);
        assert_eq!(parse_memory_size("2GiB").unwrap(), 2u64 * 1024 * 1024 * 1024);
        assert_eq!(parse_memory_size("1t").unwrap(), 1u64 << 40);
        assert_eq!(parse_memory_size("1024").unwrap(), 1024);
        assert_eq!(parse_memory_size("1024b").unwrap(), 1024);
        assert_eq!(parse_memory_size(" 8k ").unwrap(), 8192);
    }

    #[test]
    fn memory_size_invalid() {
        for s in ["", "M", "abc", "1.5M", "-1k", "12x", "k10", "99999999999999999999t"] {
            assert!(parse_memory_size(s).is_err(), "{s}");
        }
    }

    #[test]
    fn block_size_spec_from() {
        assert!(matches!(
            "64k".parse::<BlockSizeSpec>().unwrap(),
            BlockSizeSpec::Bytes(65536)
        ));
        assert!(matches!(BlockSizeSpec::from(100u64), BlockSizeSpec::Bytes(100)));
        assert!(matches!(
            BlockSizeSpec::from([2, 3]),
            BlockSizeSpec::Splits(splits) if splits == vec![2, 3]
        ));
        assert!(matches!(
            BlockSizeSpec::from(vec![4]),
            BlockSizeSpec::Splits(splits) if splits == vec![4]
        ));
        assert!(BlockSizeSpec::try_from("big").is_err());
    }

    #[test]
    fn block_size_spec_default() {
        assert!(matches!(
            BlockSizeSpec::default(),
            BlockSizeSpec::Bytes(bytes) if bytes == global_config().default_block_size()
        ));
    }

    #[test]
    fn block_size_spec_json() {
        let spec = BlockSizeSpec::try_from(&serde_json::json!("150M")).unwrap();
        assert!(matches!(spec, BlockSizeSpec::Bytes(157_286_400)));
        let spec = BlockSizeSpec::try_from(&serde_json::json!(4096)).unwrap();
        assert!(matches!(spec, BlockSizeSpec::Bytes(4096)));
        let spec = BlockSizeSpec::try_from(&serde_json::json!([2, 2])).unwrap();
        assert!(matches!(spec, BlockSizeSpec::Splits(splits) if splits == vec![2, 2]));
        assert!(BlockSizeSpec::try_from(&serde_json::json!({"splits": [2, 2]})).is_err());
        assert!(BlockSizeSpec::try_from(&serde_json::json!("lots")).is_err());
    }

    #[test]
    fn block_size_configuration_display() {
        let configuration = BlockSizeConfiguration::Splits(vec![2, 3]);
        assert_eq!(configuration.to_string(), "[2,3]");
        let configuration = BlockSizeConfiguration::MemorySize("150M".to_string());
        assert_eq!(configuration.to_string(), r#""150M""#);
    }

    #[test]
    fn padding() {
        assert!(Padding::default().is_zero());
        assert!(Padding::from([0, 0]).is_zero());
        assert!(!Padding::from(1usize).is_zero());
        assert_eq!(Padding::from(2usize).for_dimensionality(3).unwrap(), vec![2, 2, 2]);
        assert_eq!(Padding::from([1, 0]).for_dimensionality(2).unwrap(), vec![1, 0]);
        assert!(Padding::from([1, 0]).for_dimensionality(3).is_err());
        let padding: Padding = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(padding, Padding::PerAxis(vec![1, 2]));
    }
}
