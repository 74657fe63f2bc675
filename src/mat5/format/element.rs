//! Primitive tag and element reading.
//!
//! # Element Layout
//! ```text
//! Regular:   [4 bytes] data type  [4 bytes] byte count  [payload] [0-7 pad bytes]
//! Embedded:  [2 bytes] byte count [2 bytes] data type   [payload, <= 4 bytes, zero filled]
//! ```
//! In the embedded form both 16-bit halves are packed into the first 32-bit
//! word (count in the high half), so a non-zero high half identifies it.
//! Matrix elements are never embedded.

use log::{trace, warn};

use crate::mat5::codec::compression;
use crate::mat5::types::error::{MatError, Result};
use crate::mat5::types::models::{Tag, WireType};
use crate::mat5::types::value::{NumericData, Variable};
use crate::mat5::utils;

use super::decode;
use super::tables::{self, CodecTable};

/// Default limit on cell/struct/object nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Decoding switches that apply to a whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSettings {
    /// Cast numeric data to the type of its declared array class.
    pub mat_dtype: bool,
    /// Maximum nesting of matrix elements (including compressed wrappers).
    pub max_depth: usize,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            mat_dtype: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A decoded element payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Numeric(NumericData),
    Text(String),
    Matrix(Variable),
}

/// A tag together with its payload, borrowed from the stream buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawElement<'a> {
    pub tag: Tag,
    pub payload: &'a [u8],
}

impl RawElement<'_> {
    pub fn wire_type(&self) -> Result<WireType> {
        WireType::try_from(self.tag.wire_type)
    }
}

/// Cursor over an in-memory element stream.
///
/// The top-level file reader hands one complete top-level element at a time
/// to a reader; nested matrices and compressed variables get their own
/// sub-readers bounded to exactly their payload.
#[derive(Debug)]
pub struct ElementReader<'a> {
    buf: &'a [u8],
    pos: usize,
    table: &'a CodecTable,
    settings: DecodeSettings,
    depth: usize,
}

impl<'a> ElementReader<'a> {
    pub fn new(buf: &'a [u8], table: &'a CodecTable) -> Self {
        Self::with_settings(buf, table, DecodeSettings::default())
    }

    pub fn with_settings(buf: &'a [u8], table: &'a CodecTable, settings: DecodeSettings) -> Self {
        Self {
            buf,
            pos: 0,
            table,
            settings,
            depth: 0,
        }
    }

    pub fn table(&self) -> &'a CodecTable {
        self.table
    }

    pub fn settings(&self) -> DecodeSettings {
        self.settings
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Takes the next `len` bytes, failing if the stream is shorter.
    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(MatError::TruncatedStream {
                context,
                expected: len as u64,
                available: self.remaining() as u64,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// A reader over `buf` one nesting level deeper, sharing the same tables.
    fn nested<'b>(&self, buf: &'b [u8]) -> Result<ElementReader<'b>>
    where
        'a: 'b,
    {
        let depth = self.depth + 1;
        if depth > self.settings.max_depth {
            return Err(MatError::RecursionLimit(self.settings.max_depth));
        }
        Ok(ElementReader {
            buf,
            pos: 0,
            table: self.table,
            settings: self.settings,
            depth,
        })
    }

    /// Reads an 8-byte tag in either form.
    ///
    /// The whole 8 bytes are consumed. For an embedded tag the payload is
    /// the tag's second half and is picked up by [`ElementReader::read_raw`].
    pub fn read_tag(&mut self) -> Result<Tag> {
        let raw = self.take(8, "element tag")?;
        let endian = self.table.endian();
        let first = utils::read_u32(&raw[0..4], endian);
        let upper = first >> 16;
        let tag = if upper != 0 {
            if upper > 4 {
                return Err(MatError::MalformedTag(format!(
                    "embedded element declares {} bytes; at most 4 are allowed",
                    upper
                )));
            }
            Tag {
                wire_type: first & 0xFFFF,
                byte_count: upper,
                embedded: true,
            }
        } else {
            Tag {
                wire_type: first,
                byte_count: utils::read_u32(&raw[4..8], endian),
                embedded: false,
            }
        };
        trace!(
            "Tag at {}: type={}, bytes={}, embedded={}",
            self.pos - 8,
            tag.wire_type,
            tag.byte_count,
            tag.embedded
        );
        Ok(tag)
    }

    /// Reads the payload belonging to `tag`, which must be the tag just read.
    fn read_payload(&mut self, tag: Tag) -> Result<&'a [u8]> {
        let len = tag.byte_count as usize;
        if tag.embedded {
            let start = self.pos - 4;
            return Ok(&self.buf[start..start + len]);
        }
        let payload = self.take(len, "element payload")?;
        let pad = utils::padding(len).min(self.remaining());
        self.pos += pad;
        Ok(payload)
    }

    /// Reads one non-matrix element without copying its payload.
    pub fn read_raw(&mut self) -> Result<RawElement<'a>> {
        let tag = self.read_tag()?;
        if tag.wire_type == WireType::Matrix.code() {
            return Err(MatError::InvalidFormat(
                "a matrix element cannot be read as raw data".to_string(),
            ));
        }
        let payload = self.read_payload(tag)?;
        Ok(RawElement { tag, payload })
    }

    /// Reads and decodes one element into owned storage.
    pub fn read_element(&mut self) -> Result<Element> {
        let tag = self.read_tag()?;
        if tag.wire_type == WireType::Matrix.code() {
            return self.read_matrix_body(tag).map(Element::Matrix);
        }
        let payload = self.read_payload(tag)?;
        self.decode_payload(RawElement { tag, payload })
    }

    /// Decodes a raw element's payload as text or numbers.
    pub fn decode_payload(&self, raw: RawElement<'_>) -> Result<Element> {
        let wire_type = raw.wire_type()?;
        if wire_type.is_text() {
            let codec = self.table.text_codec(wire_type).ok_or_else(|| {
                MatError::UnsupportedTextCodec(format!("no codec for data type {}", raw.tag.wire_type))
            })?;
            return codec.decode(raw.payload).map(Element::Text);
        }
        let kind = tables::numeric_kind(wire_type)
            .ok_or(MatError::UnsupportedWireType(raw.tag.wire_type))?;
        if raw.payload.len() % kind.width() != 0 {
            warn!(
                "Element of type {:?} has {} bytes, not a multiple of {}; dropping the remainder",
                wire_type,
                raw.payload.len(),
                kind.width()
            );
        }
        Ok(Element::Numeric(tables::decode_numeric(
            kind,
            raw.payload,
            self.table.endian(),
        )))
    }

    /// Reads an element that must be numeric.
    pub fn read_numeric(&mut self, context: &'static str) -> Result<NumericData> {
        match self.read_element()? {
            Element::Numeric(data) => Ok(data),
            Element::Text(_) => Err(MatError::InvalidFormat(format!(
                "{} must be numeric, found text",
                context
            ))),
            Element::Matrix(_) => Err(MatError::InvalidFormat(format!(
                "{} must be numeric, found a matrix",
                context
            ))),
        }
    }

    /// Reads an element holding a name: text or an 8-bit buffer.
    /// Trailing NUL padding is trimmed.
    pub fn read_string(&mut self, context: &'static str) -> Result<String> {
        let bytes = self.read_name_bytes(context)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.trim_end_matches('\0').to_string())
    }

    /// Raw bytes of a name-like element.
    pub fn read_name_bytes(&mut self, context: &'static str) -> Result<Vec<u8>> {
        match self.read_element()? {
            Element::Text(text) => Ok(text.into_bytes()),
            Element::Numeric(data) => data.to_bytes().ok_or_else(|| {
                MatError::InvalidFormat(format!("{} must be stored as 8-bit characters", context))
            }),
            Element::Matrix(_) => Err(MatError::InvalidFormat(format!(
                "{} must be character data, found a matrix",
                context
            ))),
        }
    }

    /// Reads an element that must be a matrix (as inside cells and structs).
    pub fn read_matrix_element(&mut self) -> Result<Variable> {
        let tag = self.read_tag()?;
        if tag.wire_type != WireType::Matrix.code() {
            return Err(MatError::NotAMatrix(tag.wire_type));
        }
        self.read_matrix_body(tag)
    }

    fn read_matrix_body(&mut self, tag: Tag) -> Result<Variable> {
        if tag.embedded {
            return Err(MatError::MalformedTag(
                "matrix element stored in embedded form".to_string(),
            ));
        }
        let body = self.take(tag.byte_count as usize, "matrix element")?;
        let mut nested = self.nested(body)?;
        let variable = decode::read_matrix(&mut nested, tag.byte_count as usize)?;
        if !nested.is_at_end() {
            trace!(
                "Ignoring {} unread bytes at the end of matrix '{}'",
                nested.remaining(),
                variable.name
            );
        }
        Ok(variable)
    }

    /// Reads one top-level variable: a matrix element, or a compressed
    /// element wrapping one.
    pub fn read_variable(&mut self) -> Result<Variable> {
        let tag = self.read_tag()?;
        if tag.embedded {
            return Err(MatError::MalformedTag(
                "top-level element stored in embedded form".to_string(),
            ));
        }
        if tag.wire_type == WireType::Compressed.code() {
            let payload = self.take(tag.byte_count as usize, "compressed variable")?;
            let inflated =
                compression::decompress_payload(payload, compression::MAX_INFLATED_LEN)?;
            let mut inner = self.nested(&inflated)?;
            let variable = inner.read_variable()?;
            if !inner.is_at_end() {
                warn!(
                    "Compressed block holds {} bytes after variable '{}'; ignoring them",
                    inner.remaining(),
                    variable.name
                );
            }
            return Ok(variable);
        }
        if tag.wire_type != WireType::Matrix.code() {
            return Err(MatError::NotAMatrix(tag.wire_type));
        }
        self.read_matrix_body(tag)
    }
}
