//! Core data structures for MAT-file format components.
//!
//! This module defines the fundamental on-disk vocabulary used throughout the
//! library:
//! - Byte order and the file header
//! - Element tags and data type codes
//! - Array class codes

use super::error::{MatError, Result};

/// Byte order of a MAT-file, detected from the header's endian marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// The byte order of the running process.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    /// The two marker bytes as they appear in a file written in this order.
    ///
    /// The marker is the 16-bit value `0x4D49` ("MI") stored in file order,
    /// so little-endian files carry `IM` and big-endian files carry `MI`.
    pub fn marker(self) -> [u8; 2] {
        match self {
            Endian::Little => *b"IM",
            Endian::Big => *b"MI",
        }
    }

    /// Detects the byte order from the two marker bytes at offset 126.
    pub fn from_marker(marker: [u8; 2]) -> Result<Self> {
        match &marker {
            b"IM" => Ok(Endian::Little),
            b"MI" => Ok(Endian::Big),
            _ => Err(MatError::InvalidFormat(format!(
                "Unknown endian marker {:02x?}",
                marker
            ))),
        }
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Endian::Little => write!(f, "little-endian"),
            Endian::Big => write!(f, "big-endian"),
        }
    }
}

/// Parsed 128-byte MAT-file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatHeader {
    /// Human readable description text, trimmed of spaces, tabs, newlines and NULs.
    pub description: String,
    /// Offset of subsystem data. Carried through but not interpreted.
    pub subsystem_offset: u64,
    pub version_major: u8,
    pub version_minor: u8,
    pub byte_order: Endian,
}

impl MatHeader {
    /// Version formatted as `major.minor`, e.g. `1.0`.
    pub fn version(&self) -> String {
        format!("{}.{}", self.version_major, self.version_minor)
    }
}

/// Element tag: a data type code and the exact, unpadded payload length.
///
/// `embedded` is set when the tag used the small-element form, where the
/// payload (at most 4 bytes) lives in the second half of the tag itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub wire_type: u32,
    pub byte_count: u32,
    pub embedded: bool,
}

/// Element data type codes (`mi*`) as stored in a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Single = 7,
    Double = 9,
    Int64 = 12,
    UInt64 = 13,
    Matrix = 14,
    Compressed = 15,
    Utf8 = 16,
    Utf16 = 17,
    Utf32 = 18,
}

impl WireType {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether payloads of this type are encoded text.
    pub fn is_text(self) -> bool {
        matches!(self, WireType::Utf8 | WireType::Utf16 | WireType::Utf32)
    }
}

impl TryFrom<u32> for WireType {
    type Error = MatError;
    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::Int8),
            2 => Ok(Self::UInt8),
            3 => Ok(Self::Int16),
            4 => Ok(Self::UInt16),
            5 => Ok(Self::Int32),
            6 => Ok(Self::UInt32),
            7 => Ok(Self::Single),
            9 => Ok(Self::Double),
            12 => Ok(Self::Int64),
            13 => Ok(Self::UInt64),
            14 => Ok(Self::Matrix),
            15 => Ok(Self::Compressed),
            16 => Ok(Self::Utf8),
            17 => Ok(Self::Utf16),
            18 => Ok(Self::Utf32),
            _ => Err(MatError::UnsupportedWireType(value)),
        }
    }
}

/// Array class codes (`mx*_CLASS`) carried in the array flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayClass {
    Cell = 1,
    Struct = 2,
    Object = 3,
    Char = 4,
    Sparse = 5,
    Double = 6,
    Single = 7,
    Int8 = 8,
    UInt8 = 9,
    Int16 = 10,
    UInt16 = 11,
    Int32 = 12,
    UInt32 = 13,
}

impl ArrayClass {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this class holds a dense numeric array.
    pub fn is_numeric(self) -> bool {
        (self as u8) >= ArrayClass::Double as u8
    }
}

impl TryFrom<u8> for ArrayClass {
    type Error = MatError;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Cell),
            2 => Ok(Self::Struct),
            3 => Ok(Self::Object),
            4 => Ok(Self::Char),
            5 => Ok(Self::Sparse),
            6 => Ok(Self::Double),
            7 => Ok(Self::Single),
            8 => Ok(Self::Int8),
            9 => Ok(Self::UInt8),
            10 => Ok(Self::Int16),
            11 => Ok(Self::UInt16),
            12 => Ok(Self::Int32),
            13 => Ok(Self::UInt32),
            _ => Err(MatError::UnsupportedClassCode(value)),
        }
    }
}

impl std::fmt::Display for ArrayClass {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ArrayClass::Cell => "cell",
            ArrayClass::Struct => "struct",
            ArrayClass::Object => "object",
            ArrayClass::Char => "char",
            ArrayClass::Sparse => "sparse",
            ArrayClass::Double => "double",
            ArrayClass::Single => "single",
            ArrayClass::Int8 => "int8",
            ArrayClass::UInt8 => "uint8",
            ArrayClass::Int16 => "int16",
            ArrayClass::UInt16 => "uint16",
            ArrayClass::Int32 => "int32",
            ArrayClass::UInt32 => "uint32",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endian_marker_round_trips() {
        for endian in [Endian::Little, Endian::Big] {
            assert_eq!(Endian::from_marker(endian.marker()).unwrap(), endian);
        }
        assert!(Endian::from_marker(*b"XX").is_err());
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(matches!(WireType::try_from(8), Err(MatError::UnsupportedWireType(8))));
        assert!(matches!(ArrayClass::try_from(14), Err(MatError::UnsupportedClassCode(14))));
        assert!(ArrayClass::UInt32.is_numeric());
        assert!(!ArrayClass::Sparse.is_numeric());
    }
}
