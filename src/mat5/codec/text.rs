//! Text codecs for character data.
//!
//! MAT-files carry characters either as encoded text elements (miUTF8,
//! miUTF16, miUTF32) or as plain integer buffers. `encoding_rs` covers UTF-8,
//! UTF-16 and the single-byte legacy encodings; UTF-32 and strict ASCII are
//! handled here because `encoding_rs` does not provide them.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::mat5::types::error::{MatError, Result};
use crate::mat5::types::models::Endian;

/// A character codec usable for decoding and (for some variants) encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCodec {
    Encoding(&'static Encoding),
    Utf32(Endian),
    Ascii,
}

impl TextCodec {
    /// UTF-16 in the given byte order.
    pub fn utf16(endian: Endian) -> Self {
        match endian {
            Endian::Little => TextCodec::Encoding(UTF_16LE),
            Endian::Big => TextCodec::Encoding(UTF_16BE),
        }
    }

    pub fn utf8() -> Self {
        TextCodec::Encoding(UTF_8)
    }

    /// Resolves a codec label.
    ///
    /// `ascii` and the UTF-32 labels are handled locally; every other label
    /// goes through the WHATWG label table of `encoding_rs`. Labels without a
    /// byte order (`utf-16`, `utf-32`) take `endian`.
    pub fn for_label(label: &str, endian: Endian) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "ascii" | "us-ascii" => return Ok(TextCodec::Ascii),
            "utf-16" | "utf16" => return Ok(TextCodec::utf16(endian)),
            "utf-32" | "utf32" => return Ok(TextCodec::Utf32(endian)),
            "utf-32le" => return Ok(TextCodec::Utf32(Endian::Little)),
            "utf-32be" => return Ok(TextCodec::Utf32(Endian::Big)),
            _ => {}
        }
        Encoding::for_label(normalized.as_bytes())
            .map(TextCodec::Encoding)
            .ok_or_else(|| MatError::UnsupportedTextCodec(label.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextCodec::Encoding(encoding) => encoding.name(),
            TextCodec::Utf32(Endian::Little) => "UTF-32LE",
            TextCodec::Utf32(Endian::Big) => "UTF-32BE",
            TextCodec::Ascii => "ASCII",
        }
    }

    /// Bytes per code unit: 2 for UTF-16, 4 for UTF-32, 1 otherwise.
    pub fn unit_width(&self) -> usize {
        match self {
            TextCodec::Encoding(e) if *e == UTF_16LE || *e == UTF_16BE => 2,
            TextCodec::Encoding(_) | TextCodec::Ascii => 1,
            TextCodec::Utf32(_) => 4,
        }
    }

    /// Decodes `bytes`, failing on malformed input instead of substituting
    /// replacement characters.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            TextCodec::Encoding(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned())
                .ok_or_else(|| MatError::InvalidText {
                    codec: encoding.name(),
                    reason: "malformed byte sequence".to_string(),
                }),
            TextCodec::Utf32(endian) => decode_utf32(bytes, *endian),
            TextCodec::Ascii => decode_ascii(bytes),
        }
    }

    /// Decodes 16-bit character units stored as a `uint16` buffer.
    ///
    /// Single-byte codecs narrow every unit to its low byte first; UTF-16
    /// codecs decode the units directly.
    pub fn decode_units(&self, units: &[u16]) -> Result<String> {
        match self.unit_width() {
            1 => {
                let bytes: Vec<u8> = units.iter().map(|&u| u as u8).collect();
                self.decode(&bytes)
            }
            2 => {
                let big = matches!(self, TextCodec::Encoding(e) if *e == UTF_16BE);
                let bytes: Vec<u8> = units
                    .iter()
                    .flat_map(|&u| if big { u.to_be_bytes() } else { u.to_le_bytes() })
                    .collect();
                self.decode(&bytes)
            }
            _ => Err(MatError::UnsupportedTextCodec(format!(
                "{} cannot decode 16-bit character data",
                self.name()
            ))),
        }
    }
}

fn decode_ascii(bytes: &[u8]) -> Result<String> {
    if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
        return Err(MatError::InvalidText {
            codec: "ASCII",
            reason: format!("byte {:#04x} at offset {} is not ASCII", bytes[pos], pos),
        });
    }
    Ok(bytes.iter().map(|&b| b as char).collect())
}

fn decode_utf32(bytes: &[u8], endian: Endian) -> Result<String> {
    if bytes.len() % 4 != 0 {
        return Err(MatError::InvalidText {
            codec: "UTF-32",
            reason: format!("length {} is not a multiple of 4", bytes.len()),
        });
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let word = crate::mat5::utils::read_u32(chunk, endian);
            char::from_u32(word).ok_or_else(|| MatError::InvalidText {
                codec: "UTF-32",
                reason: format!("{:#x} is not a Unicode scalar value", word),
            })
        })
        .collect()
}

/// Encodes characters as ASCII, rejecting anything outside 7-bit range.
pub fn encode_ascii(chars: &[char]) -> Result<Vec<u8>> {
    chars
        .iter()
        .map(|&c| {
            if c.is_ascii() {
                Ok(c as u8)
            } else {
                Err(MatError::UnsupportedTextCodec(format!(
                    "character {:?} cannot be stored as ASCII; enable unicode strings",
                    c
                )))
            }
        })
        .collect()
}

/// Encodes characters as UTF-8.
pub fn encode_utf8(chars: &[char]) -> Vec<u8> {
    let text: String = chars.iter().collect();
    let (bytes, _, _) = UTF_8.encode(&text);
    bytes.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve() {
        assert_eq!(TextCodec::for_label("utf-16", Endian::Big).unwrap(), TextCodec::Encoding(UTF_16BE));
        assert_eq!(TextCodec::for_label("latin1", Endian::Little).unwrap().unit_width(), 1);
        assert_eq!(TextCodec::for_label("UTF_32", Endian::Little).unwrap(), TextCodec::Utf32(Endian::Little));
        assert!(matches!(
            TextCodec::for_label("klingon", Endian::Little),
            Err(MatError::UnsupportedTextCodec(_))
        ));
    }

    #[test]
    fn utf32_decodes_both_orders() {
        assert_eq!(TextCodec::Utf32(Endian::Little).decode(&[0x41, 0, 0, 0]).unwrap(), "A");
        assert_eq!(TextCodec::Utf32(Endian::Big).decode(&[0, 0, 0x20, 0xAC]).unwrap(), "€");
        assert!(TextCodec::Utf32(Endian::Little).decode(&[0, 0xD8, 0, 0]).is_err());
    }

    #[test]
    fn uint16_units_narrow_for_single_byte_codecs() {
        let units = [0x68u16, 0x69];
        assert_eq!(TextCodec::Ascii.decode_units(&units).unwrap(), "hi");
        assert_eq!(TextCodec::utf16(Endian::Big).decode_units(&[0x20AC]).unwrap(), "€");
        assert_eq!(TextCodec::utf16(Endian::Little).decode_units(&[0x00E9]).unwrap(), "é");
    }

    #[test]
    fn ascii_is_strict() {
        assert!(decode_ascii(&[0x61, 0xE9]).is_err());
        assert!(encode_ascii(&['é']).is_err());
        assert_eq!(encode_utf8(&['é']), vec![0xC3, 0xA9]);
    }
}
