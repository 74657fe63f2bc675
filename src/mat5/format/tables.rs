//! Static type mappings and byte-order-aware primitive conversion.
//!
//! A [`CodecTable`] is built once per file from the detected byte order and
//! then shared, read-only, by every element read or written for that file
//! (including the sub-reader of a compressed variable).

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use num_complex::{Complex32, Complex64};

use crate::mat5::codec::text::TextCodec;
use crate::mat5::types::models::{ArrayClass, Endian, WireType};
use crate::mat5::types::value::{NumericData, NumericKind};

/// Per-file codec table: byte order plus the text codecs for each text type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecTable {
    endian: Endian,
    utf8: TextCodec,
    utf16: TextCodec,
    utf32: TextCodec,
    uint16_codec: TextCodec,
}

impl CodecTable {
    /// Table for a file in `endian` order. 16-bit character buffers default
    /// to UTF-16 in the same order.
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            utf8: TextCodec::utf8(),
            utf16: TextCodec::utf16(endian),
            utf32: TextCodec::Utf32(endian),
            uint16_codec: TextCodec::utf16(endian),
        }
    }

    /// Replaces the codec used for character data stored as `uint16`.
    pub fn with_uint16_codec(mut self, codec: TextCodec) -> Self {
        self.uint16_codec = codec;
        self
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn uint16_codec(&self) -> TextCodec {
        self.uint16_codec
    }

    /// Codec for a text data type, `None` for non-text types.
    pub fn text_codec(&self, wire_type: WireType) -> Option<TextCodec> {
        match wire_type {
            WireType::Utf8 => Some(self.utf8),
            WireType::Utf16 => Some(self.utf16),
            WireType::Utf32 => Some(self.utf32),
            _ => None,
        }
    }
}

/// Native element type of a numeric data type.
pub fn numeric_kind(wire_type: WireType) -> Option<NumericKind> {
    match wire_type {
        WireType::Int8 => Some(NumericKind::Int8),
        WireType::UInt8 => Some(NumericKind::UInt8),
        WireType::Int16 => Some(NumericKind::Int16),
        WireType::UInt16 => Some(NumericKind::UInt16),
        WireType::Int32 => Some(NumericKind::Int32),
        WireType::UInt32 => Some(NumericKind::UInt32),
        WireType::Single => Some(NumericKind::Single),
        WireType::Double => Some(NumericKind::Double),
        WireType::Int64 => Some(NumericKind::Int64),
        WireType::UInt64 => Some(NumericKind::UInt64),
        WireType::Matrix
        | WireType::Compressed
        | WireType::Utf8
        | WireType::Utf16
        | WireType::Utf32 => None,
    }
}

/// Data type used to store values of `kind`.
pub fn wire_type(kind: NumericKind) -> WireType {
    match kind {
        NumericKind::Int8 => WireType::Int8,
        NumericKind::UInt8 => WireType::UInt8,
        NumericKind::Int16 => WireType::Int16,
        NumericKind::UInt16 => WireType::UInt16,
        NumericKind::Int32 => WireType::Int32,
        NumericKind::UInt32 => WireType::UInt32,
        NumericKind::Int64 => WireType::Int64,
        NumericKind::UInt64 => WireType::UInt64,
        NumericKind::Single => WireType::Single,
        NumericKind::Double => WireType::Double,
    }
}

/// Native element type of a numeric array class.
pub fn class_kind(class: ArrayClass) -> Option<NumericKind> {
    match class {
        ArrayClass::Double => Some(NumericKind::Double),
        ArrayClass::Single => Some(NumericKind::Single),
        ArrayClass::Int8 => Some(NumericKind::Int8),
        ArrayClass::UInt8 => Some(NumericKind::UInt8),
        ArrayClass::Int16 => Some(NumericKind::Int16),
        ArrayClass::UInt16 => Some(NumericKind::UInt16),
        ArrayClass::Int32 => Some(NumericKind::Int32),
        ArrayClass::UInt32 => Some(NumericKind::UInt32),
        _ => None,
    }
}

/// Array class for values of `kind`, `None` when the kind has no class of
/// its own and must be widened before writing.
pub fn kind_class(kind: NumericKind) -> Option<ArrayClass> {
    match kind {
        NumericKind::Int8 => Some(ArrayClass::Int8),
        NumericKind::UInt8 => Some(ArrayClass::UInt8),
        NumericKind::Int16 => Some(ArrayClass::Int16),
        NumericKind::UInt16 => Some(ArrayClass::UInt16),
        NumericKind::Int32 => Some(ArrayClass::Int32),
        NumericKind::UInt32 => Some(ArrayClass::UInt32),
        NumericKind::Single => Some(ArrayClass::Single),
        NumericKind::Double => Some(ArrayClass::Double),
        NumericKind::Int64 | NumericKind::UInt64 => None,
    }
}

/// Slices `bytes` into values of `kind`. Trailing bytes that do not fill a
/// whole value are ignored.
pub fn decode_numeric(kind: NumericKind, bytes: &[u8], endian: Endian) -> NumericData {
    match endian {
        Endian::Little => decode_with::<LittleEndian>(kind, bytes),
        Endian::Big => decode_with::<BigEndian>(kind, bytes),
    }
}

fn decode_with<B: ByteOrder>(kind: NumericKind, bytes: &[u8]) -> NumericData {
    let count = bytes.len() / kind.width();
    let bytes = &bytes[..count * kind.width()];
    macro_rules! read_into {
        ($variant:ident, $ty:ty, $read:ident) => {{
            let mut values = vec![<$ty>::default(); count];
            B::$read(bytes, &mut values);
            NumericData::$variant(values)
        }};
    }
    match kind {
        NumericKind::Int8 => NumericData::Int8(bytes.iter().map(|&b| b as i8).collect()),
        NumericKind::UInt8 => NumericData::UInt8(bytes.to_vec()),
        NumericKind::Int16 => read_into!(Int16, i16, read_i16_into),
        NumericKind::UInt16 => read_into!(UInt16, u16, read_u16_into),
        NumericKind::Int32 => read_into!(Int32, i32, read_i32_into),
        NumericKind::UInt32 => read_into!(UInt32, u32, read_u32_into),
        NumericKind::Int64 => read_into!(Int64, i64, read_i64_into),
        NumericKind::UInt64 => read_into!(UInt64, u64, read_u64_into),
        NumericKind::Single => read_into!(Single, f32, read_f32_into),
        NumericKind::Double => read_into!(Double, f64, read_f64_into),
    }
}

/// Serializes a real, non-logical buffer. Returns `None` for logical and
/// complex buffers, which callers convert or split first.
pub fn encode_numeric(data: &NumericData, endian: Endian) -> Option<(WireType, Vec<u8>)> {
    let kind = data.kind()?;
    let bytes = match endian {
        Endian::Little => encode_with::<LittleEndian>(data),
        Endian::Big => encode_with::<BigEndian>(data),
    };
    Some((wire_type(kind), bytes))
}

fn encode_with<B: ByteOrder>(data: &NumericData) -> Vec<u8> {
    macro_rules! write_from {
        ($values:expr, $width:expr, $write:ident) => {{
            let mut out = vec![0u8; $values.len() * $width];
            B::$write($values, &mut out);
            out
        }};
    }
    match data {
        NumericData::Int8(v) => v.iter().map(|&x| x as u8).collect(),
        NumericData::UInt8(v) => v.clone(),
        NumericData::Int16(v) => write_from!(v, 2, write_i16_into),
        NumericData::UInt16(v) => write_from!(v, 2, write_u16_into),
        NumericData::Int32(v) => write_from!(v, 4, write_i32_into),
        NumericData::UInt32(v) => write_from!(v, 4, write_u32_into),
        NumericData::Int64(v) => write_from!(v, 8, write_i64_into),
        NumericData::UInt64(v) => write_from!(v, 8, write_u64_into),
        NumericData::Single(v) => write_from!(v, 4, write_f32_into),
        NumericData::Double(v) => write_from!(v, 8, write_f64_into),
        NumericData::Logical(_) | NumericData::ComplexSingle(_) | NumericData::ComplexDouble(_) => {
            Vec::new()
        }
    }
}

/// Combines separately stored real and imaginary payloads straight from the
/// stream bytes. Two single-precision parts give complex single; any other
/// pairing widens to complex double.
pub fn combine_complex(
    re: (NumericKind, &[u8]),
    im: (NumericKind, &[u8]),
    endian: Endian,
) -> NumericData {
    let (re_kind, re_bytes) = re;
    let (im_kind, im_bytes) = im;
    let re_values = re_bytes.chunks_exact(re_kind.width());
    let im_values = im_bytes.chunks_exact(im_kind.width());
    if re_kind == NumericKind::Single && im_kind == NumericKind::Single {
        return NumericData::ComplexSingle(
            re_values
                .zip(im_values)
                .map(|(r, i)| {
                    Complex32::new(
                        f32::from_bits(crate::mat5::utils::read_u32(r, endian)),
                        f32::from_bits(crate::mat5::utils::read_u32(i, endian)),
                    )
                })
                .collect(),
        );
    }
    NumericData::ComplexDouble(
        re_values
            .zip(im_values)
            .map(|(r, i)| Complex64::new(scalar_f64(re_kind, r, endian), scalar_f64(im_kind, i, endian)))
            .collect(),
    )
}

/// Reads one value of `kind` from `chunk` and widens it to `f64`.
pub fn scalar_f64(kind: NumericKind, chunk: &[u8], endian: Endian) -> f64 {
    match endian {
        Endian::Little => scalar_with::<LittleEndian>(kind, chunk),
        Endian::Big => scalar_with::<BigEndian>(kind, chunk),
    }
}

fn scalar_with<B: ByteOrder>(kind: NumericKind, chunk: &[u8]) -> f64 {
    match kind {
        NumericKind::Int8 => chunk[0] as i8 as f64,
        NumericKind::UInt8 => chunk[0] as f64,
        NumericKind::Int16 => B::read_i16(chunk) as f64,
        NumericKind::UInt16 => B::read_u16(chunk) as f64,
        NumericKind::Int32 => B::read_i32(chunk) as f64,
        NumericKind::UInt32 => B::read_u32(chunk) as f64,
        NumericKind::Int64 => B::read_i64(chunk) as f64,
        NumericKind::UInt64 => B::read_u64(chunk) as f64,
        NumericKind::Single => B::read_f32(chunk) as f64,
        NumericKind::Double => B::read_f64(chunk),
    }
}
