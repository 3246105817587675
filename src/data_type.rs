//! Element data types.
//!
//! Every image in a collection shares one [`DataType`].
//! The data type of a collection is fixed by its Rust element type through the [`Element`] trait.

use derive_more::From;
use thiserror::Error;

/// A data type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
#[rustfmt::skip]
pub enum DataType {
    /// `bool` Boolean.
    Bool,
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point: sign bit, 8 bits exponent, 23 bits mantissa.
    Float32,
    /// `float64` IEEE 754 double-precision floating point: sign bit, 11 bits exponent, 52 bits mantissa.
    Float64,
}

/// An unsupported data type error.
#[derive(Debug, Error, From)]
#[error("unsupported data type {0}")]
pub struct UnsupportedDataTypeError(String);

impl DataType {
    /// Returns the name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = UnsupportedDataTypeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "bool" => Ok(Self::Bool),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(name.to_string().into()),
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl serde::Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for DataType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let name = String::deserialize(d)?;
        name.parse()
            .map_err(|err: UnsupportedDataTypeError| serde::de::Error::custom(err.to_string()))
    }
}

/// A trait representing an image element type.
pub trait Element:
    Copy + Default + PartialOrd + core::fmt::Debug + Send + Sync + 'static
{
    /// The data type of the element.
    const DATA_TYPE: DataType;
}

macro_rules! impl_element {
    ( $t:ty, $data_type:expr ) => {
        impl Element for $t {
            const DATA_TYPE: DataType = $data_type;
        }
    };
}

impl_element!(bool, DataType::Bool);
impl_element!(i8, DataType::Int8);
impl_element!(i16, DataType::Int16);
impl_element!(i32, DataType::Int32);
impl_element!(i64, DataType::Int64);
impl_element!(u8, DataType::UInt8);
impl_element!(u16, DataType::UInt16);
impl_element!(u32, DataType::UInt32);
impl_element!(u64, DataType::UInt64);
impl_element!(f32, DataType::Float32);
impl_element!(f64, DataType::Float64);

/// Returns true if `value` is unordered with itself, which is only the case for a floating point NaN.
pub(crate) fn is_nan<T: PartialOrd>(value: &T) -> bool {
    value.partial_cmp(value).is_none()
}

/// Arithmetic on numeric elements that keeps the element type.
///
/// Integer arithmetic wraps around at the bounds of the type.
/// Floating point arithmetic follows IEEE 754.
pub trait NumericElement: Element + num::NumCast {
    /// Add `rhs`, wrapping around at the bounds of an integer type.
    #[must_use]
    fn wrapping_add(self, rhs: Self) -> Self;

    /// Subtract `rhs`, wrapping around at the bounds of an integer type.
    #[must_use]
    fn wrapping_sub(self, rhs: Self) -> Self;
}

macro_rules! impl_numeric_element_int {
    ( $($t:ty),* ) => {
        $(
            impl NumericElement for $t {
                fn wrapping_add(self, rhs: Self) -> Self {
                    num::traits::WrappingAdd::wrapping_add(&self, &rhs)
                }

                fn wrapping_sub(self, rhs: Self) -> Self {
                    num::traits::WrappingSub::wrapping_sub(&self, &rhs)
                }
            }
        )*
    };
}

macro_rules! impl_numeric_element_float {
    ( $($t:ty),* ) => {
        $(
            impl NumericElement for $t {
                fn wrapping_add(self, rhs: Self) -> Self {
                    self + rhs
                }

                fn wrapping_sub(self, rhs: Self) -> Self {
                    self - rhs
                }
            }
        )*
    };
}

impl_numeric_element_int!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_numeric_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_size() {
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::UInt16.size(), 2);
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::Float64.size(), 8);
        assert_eq!(<f64 as Element>::DATA_TYPE.size(), std::mem::size_of::<f64>());
        assert_eq!(<i16 as Element>::DATA_TYPE.size(), std::mem::size_of::<i16>());
    }

    #[test]
    fn data_type_name() {
        assert_eq!(DataType::UInt8.to_string(), "uint8");
        assert_eq!("float64".parse::<DataType>().unwrap(), DataType::Float64);
        assert!("complex64".parse::<DataType>().is_err());
    }

    #[test]
    fn data_type_serde() {
        let json = serde_json::to_string(&DataType::Int32).unwrap();
        assert_eq!(json, r#""int32""#);
        assert_eq!(
            serde_json::from_str::<DataType>(&json).unwrap(),
            DataType::Int32
        );
        assert!(serde_json::from_str::<DataType>(r#""r16""#).is_err());
    }

    #[test]
    fn numeric_element_wrapping() {
        assert_eq!(NumericElement::wrapping_sub(0u8, 1), 255);
        assert_eq!(NumericElement::wrapping_add(200u8, 100), 44);
        assert_eq!(NumericElement::wrapping_add(i16::MAX, 1), i16::MIN);
        assert_eq!(NumericElement::wrapping_sub(0u64, 2), u64::MAX - 1);
        assert_eq!(NumericElement::wrapping_sub(0.5f32, 1.0), -0.5);
        assert!(NumericElement::wrapping_add(f64::NAN, 1.0).is_nan());
    }
}
