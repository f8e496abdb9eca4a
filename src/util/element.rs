//! Sample element types - the fixed numeric type of a dataset payload.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Numeric element type of a dataset, chosen when the dataset is declared.
///
/// Every type has a fixed size and a little-endian binary representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ElementType {
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 10,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 11,
}

impl ElementType {
    /// Size in bytes of a single element.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Uint64 | Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Stable name of this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Int8 => "int8",
            Self::Uint16 => "uint16",
            Self::Int16 => "int16",
            Self::Uint32 => "uint32",
            Self::Int32 => "int32",
            Self::Uint64 => "uint64",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Convert from the on-disk tag.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Uint8),
            2 => Some(Self::Int8),
            3 => Some(Self::Uint16),
            4 => Some(Self::Int16),
            5 => Some(Self::Uint32),
            6 => Some(Self::Int32),
            7 => Some(Self::Uint64),
            8 => Some(Self::Int64),
            10 => Some(Self::Float32),
            11 => Some(Self::Float64),
            _ => None,
        }
    }

    /// Returns true for floating point types.
    #[inline]
    pub const fn is_real(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Decode one little-endian element into an `f64`.
    ///
    /// `bytes` must be exactly [`num_bytes`](Self::num_bytes) long.
    /// 64-bit integers beyond 2^53 lose precision.
    pub fn decode_f64(self, bytes: &[u8]) -> f64 {
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        match self {
            Self::Uint8 => bytes[0] as f64,
            Self::Int8 => bytes[0] as i8 as f64,
            Self::Uint16 => u16::from_le_bytes([buf[0], buf[1]]) as f64,
            Self::Int16 => i16::from_le_bytes([buf[0], buf[1]]) as f64,
            Self::Uint32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            Self::Int32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            Self::Float32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            Self::Uint64 => u64::from_le_bytes(buf) as f64,
            Self::Int64 => i64::from_le_bytes(buf) as f64,
            Self::Float64 => f64::from_le_bytes(buf),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trait for Rust types that can back a dataset payload.
pub trait SamplePod: Pod + Zeroable + Copy + Default + PartialEq {
    /// The corresponding element type.
    const ELEMENT_TYPE: ElementType;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl SamplePod for u8 {
    const ELEMENT_TYPE: ElementType = ElementType::Uint8;
}

impl SamplePod for i8 {
    const ELEMENT_TYPE: ElementType = ElementType::Int8;
}

impl SamplePod for u16 {
    const ELEMENT_TYPE: ElementType = ElementType::Uint16;
}

impl SamplePod for i16 {
    const ELEMENT_TYPE: ElementType = ElementType::Int16;
}

impl SamplePod for u32 {
    const ELEMENT_TYPE: ElementType = ElementType::Uint32;
}

impl SamplePod for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::Int32;
}

impl SamplePod for u64 {
    const ELEMENT_TYPE: ElementType = ElementType::Uint64;
}

impl SamplePod for i64 {
    const ELEMENT_TYPE: ElementType = ElementType::Int64;
}

impl SamplePod for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::Float32;
}

impl SamplePod for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::Float64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(ElementType::Uint8.num_bytes(), 1);
        assert_eq!(ElementType::Int16.num_bytes(), 2);
        assert_eq!(ElementType::Float32.num_bytes(), 4);
        assert_eq!(ElementType::Float64.num_bytes(), 8);
        assert_eq!(<f32 as SamplePod>::SIZE, 4);
    }

    #[test]
    fn test_element_tags() {
        for tag in 0..=255u8 {
            if let Some(ty) = ElementType::from_u8(tag) {
                assert_eq!(ty as u8, tag);
            }
        }
        assert_eq!(ElementType::from_u8(9), None);
        assert!(ElementType::Float32.is_real());
        assert!(!ElementType::Int32.is_real());
    }

    #[test]
    fn test_decode_f64() {
        assert_eq!(ElementType::Int16.decode_f64(&(-3i16).to_le_bytes()), -3.0);
        assert_eq!(ElementType::Float32.decode_f64(&0.5f32.to_le_bytes()), 0.5);
        assert_eq!(ElementType::Float64.decode_f64(&0.01f64.to_le_bytes()), 0.01);
        assert_eq!(ElementType::Uint64.decode_f64(&7u64.to_le_bytes()), 7.0);
    }
}
