//! Type catalog for datastore resources
//!
//! Every resource carries one [`ResourceType`]. Scalars have a canonical,
//! architecture-independent width and are stored little-endian; strings
//! take their slot width from the registration call.

use crate::core::error::DatastoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-chosen resource identifier, used directly as the index offset
pub type ResourceId = i32;

/// Offset of one instance within a resource
pub type InstanceId = i32;

/// Kind of value held by every instance of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Bool,
    Uint8,
    Uint32,
    Int8,
    Int32,
    Float,
    Double,
    String,
}

impl ResourceType {
    /// Every catalog member, in catalog order
    pub const ALL: [ResourceType; 8] = [
        ResourceType::Bool,
        ResourceType::Uint8,
        ResourceType::Uint32,
        ResourceType::Int8,
        ResourceType::Int32,
        ResourceType::Float,
        ResourceType::Double,
        ResourceType::String,
    ];

    /// Canonical per-instance width in bytes, `None` for strings
    pub const fn width(self) -> Option<usize> {
        match self {
            ResourceType::Bool | ResourceType::Uint8 | ResourceType::Int8 => Some(1),
            ResourceType::Uint32 | ResourceType::Int32 | ResourceType::Float => Some(4),
            ResourceType::Double => Some(8),
            ResourceType::String => None,
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ResourceType::Uint8 | ResourceType::Uint32 | ResourceType::Int8 | ResourceType::Int32
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            ResourceType::Bool => "bool",
            ResourceType::Uint8 => "uint8",
            ResourceType::Uint32 => "uint32",
            ResourceType::Int8 => "int8",
            ResourceType::Int32 => "int32",
            ResourceType::Float => "float",
            ResourceType::Double => "double",
            ResourceType::String => "string",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Catalog lookup by raw type code (catalog order, starting at zero)
impl TryFrom<i32> for ResourceType {
    type Error = DatastoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| ResourceType::ALL.get(idx).copied())
            .ok_or_else(|| DatastoreError::InvalidType(format!("type code {} is not in the catalog", code)))
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width value types that can be stored in a resource
///
/// Implemented for `bool`, `u8`, `u32`, `i8`, `i32`, `f32` and `f64`; the
/// trait is sealed so the catalog stays closed.
pub trait Scalar: Copy + Send + Sync + fmt::Debug + PartialEq + 'static + sealed::Sealed {
    const TYPE: ResourceType;
    const WIDTH: usize;

    /// Encode into the first `WIDTH` bytes of `out`
    fn write_bytes(self, out: &mut [u8]);

    /// Decode from the first `WIDTH` bytes of `bytes`
    fn read_bytes(bytes: &[u8]) -> Self;

    fn into_value(self) -> Value;
}

impl sealed::Sealed for bool {}

impl Scalar for bool {
    const TYPE: ResourceType = ResourceType::Bool;
    const WIDTH: usize = 1;

    fn write_bytes(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Scalar for $ty {
                const TYPE: ResourceType = ResourceType::$variant;
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn write_bytes(self, out: &mut [u8]) {
                    out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
                }

                fn read_bytes(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$ty>::from_le_bytes(raw)
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_scalar!(
    u8 => Uint8,
    u32 => Uint32,
    i8 => Int8,
    i32 => Int32,
    f32 => Float,
    f64 => Double,
);

/// A decoded instance value of any catalog type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Uint8(u8),
    Uint32(u32),
    Int8(i8),
    Int32(i32),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Value::Bool(_) => ResourceType::Bool,
            Value::Uint8(_) => ResourceType::Uint8,
            Value::Uint32(_) => ResourceType::Uint32,
            Value::Int8(_) => ResourceType::Int8,
            Value::Int32(_) => ResourceType::Int32,
            Value::Float(_) => ResourceType::Float,
            Value::Double(_) => ResourceType::Double,
            Value::String(_) => ResourceType::String,
        }
    }
}

/// Textual rendering used by diagnostics: `true`/`false`, decimal integers,
/// shortest round-trip floats, strings verbatim
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Uint8(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_widths() {
        assert_eq!(ResourceType::Bool.width(), Some(1));
        assert_eq!(ResourceType::Uint8.width(), Some(1));
        assert_eq!(ResourceType::Uint32.width(), Some(4));
        assert_eq!(ResourceType::Int8.width(), Some(1));
        assert_eq!(ResourceType::Int32.width(), Some(4));
        assert_eq!(ResourceType::Float.width(), Some(4));
        assert_eq!(ResourceType::Double.width(), Some(8));
        assert_eq!(ResourceType::String.width(), None);
    }

    #[test]
    fn test_scalar_width_matches_catalog() {
        assert_eq!(Some(<bool as Scalar>::WIDTH), bool::TYPE.width());
        assert_eq!(Some(<u8 as Scalar>::WIDTH), u8::TYPE.width());
        assert_eq!(Some(<u32 as Scalar>::WIDTH), u32::TYPE.width());
        assert_eq!(Some(<i8 as Scalar>::WIDTH), i8::TYPE.width());
        assert_eq!(Some(<i32 as Scalar>::WIDTH), i32::TYPE.width());
        assert_eq!(Some(<f32 as Scalar>::WIDTH), f32::TYPE.width());
        assert_eq!(Some(<f64 as Scalar>::WIDTH), f64::TYPE.width());
    }

    #[test]
    fn test_little_endian_encoding() {
        let mut buf = [0u8; 4];
        0x0102_0304u32.write_bytes(&mut buf);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(u32::read_bytes(&buf), 0x0102_0304);

        let mut buf = [0u8; 1];
        (-2i8).write_bytes(&mut buf);
        assert_eq!(buf, [0xfe]);
        assert_eq!(i8::read_bytes(&buf), -2);
    }

    #[test]
    fn test_bool_nonzero_is_true() {
        assert!(bool::read_bytes(&[0x7f]));
        assert!(!bool::read_bytes(&[0]));
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(ResourceType::try_from(0).unwrap(), ResourceType::Bool);
        assert_eq!(ResourceType::try_from(7).unwrap(), ResourceType::String);
        assert!(ResourceType::try_from(8).is_err());
        assert!(ResourceType::try_from(-1).is_err());
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int8(-128).to_string(), "-128");
        assert_eq!(Value::Uint32(u32::MAX).to_string(), "4294967295");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Double(0.1).to_string(), "0.1");
        assert_eq!(Value::String("abc".into()).to_string(), "abc");
    }

    #[test]
    fn test_serde_names() {
        let ty: ResourceType = serde_json::from_str("\"uint32\"").unwrap();
        assert_eq!(ty, ResourceType::Uint32);
        assert_eq!(serde_json::to_string(&ResourceType::Double).unwrap(), "\"double\"");
    }
}
