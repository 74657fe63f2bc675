//! The 128-byte file header.
//!
//! # Layout
//! ```text
//! [116 bytes] description text, space padded
//! [8 bytes]   subsystem data offset
//! [2 bytes]   version (0x0100)
//! [2 bytes]   endian marker: "IM" little endian, "MI" big endian
//! ```

use chrono::Local;
use log::{info, warn};

use crate::mat5::types::error::Result;
use crate::mat5::types::models::{Endian, MatHeader};
use crate::mat5::utils;

pub const HEADER_LEN: usize = 128;
pub const DESCRIPTION_LEN: usize = 116;
pub const VERSION: u16 = 0x0100;

/// Whether the first four bytes can start a level 5 file.
///
/// Level 4 files begin with a numeric type word, which always contains a
/// zero byte; a level 5 description starts with printable text.
pub fn looks_like_mat5(first: &[u8]) -> bool {
    first.len() >= 4 && !first[..4].contains(&0)
}

/// Parses a header block. `byte_order` overrides the endian marker.
pub fn parse(block: &[u8; HEADER_LEN], byte_order: Option<Endian>) -> Result<MatHeader> {
    let marker = [block[126], block[127]];
    let byte_order = match byte_order {
        Some(endian) => {
            if Endian::from_marker(marker).ok() != Some(endian) {
                warn!(
                    "Reading as {} despite endian marker {:02x?}",
                    endian, marker
                );
            }
            endian
        }
        None => Endian::from_marker(marker)?,
    };

    let description = String::from_utf8_lossy(&block[..DESCRIPTION_LEN])
        .trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\0'))
        .to_string();
    let subsystem_offset = utils::read_u64(&block[116..124], byte_order);
    let version = utils::read_u16(&block[124..126], byte_order);
    if version != VERSION {
        warn!("Unexpected header version {:#06x}", version);
    }

    let header = MatHeader {
        description,
        subsystem_offset,
        version_major: (version >> 8) as u8,
        version_minor: (version & 0xFF) as u8,
        byte_order,
    };
    info!(
        "MAT-file header: version {}, {}, '{}'",
        header.version(),
        header.byte_order,
        header.description
    );
    Ok(header)
}

/// Builds a header block with `description` (truncated to 116 bytes and
/// space padded) in the given byte order.
pub fn build(description: &str, byte_order: Endian) -> [u8; HEADER_LEN] {
    let mut block = [0u8; HEADER_LEN];
    block[..DESCRIPTION_LEN].fill(b' ');
    let text = description.as_bytes();
    let len = text.len().min(DESCRIPTION_LEN);
    block[..len].copy_from_slice(&text[..len]);
    // Subsystem offset stays zero.
    let version = match byte_order {
        Endian::Little => VERSION.to_le_bytes(),
        Endian::Big => VERSION.to_be_bytes(),
    };
    block[124..126].copy_from_slice(&version);
    block[126..128].copy_from_slice(&byte_order.marker());
    block
}

/// The conventional description: platform and creation time.
pub fn default_description() -> String {
    format!(
        "MATLAB 5.0 MAT-file Platform: {}, Created on: {}",
        std::env::consts::OS,
        Local::now().format("%a %b %e %H:%M:%S %Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mat5::types::error::MatError;

    #[test]
    fn build_then_parse_both_orders() {
        for endian in [Endian::Little, Endian::Big] {
            let block = build("MATLAB 5.0 MAT-file, test", endian);
            let header = parse(&block, None).unwrap();
            assert_eq!(header.byte_order, endian);
            assert_eq!(header.description, "MATLAB 5.0 MAT-file, test");
            assert_eq!(header.version(), "1.0");
            assert_eq!(header.subsystem_offset, 0);
        }
    }

    #[test]
    fn marker_bytes_follow_byte_order() {
        assert_eq!(&build("x", Endian::Little)[124..], b"\x00\x01IM");
        assert_eq!(&build("x", Endian::Big)[124..], b"\x01\x00MI");
    }

    #[test]
    fn unknown_marker_is_rejected() {
        let mut block = build("x", Endian::Little);
        block[126..].copy_from_slice(b"XX");
        assert!(matches!(parse(&block, None), Err(MatError::InvalidFormat(_))));
        assert_eq!(parse(&block, Some(Endian::Big)).unwrap().byte_order, Endian::Big);
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let block = build(&"d".repeat(200), Endian::Little);
        assert_eq!(parse(&block, None).unwrap().description.len(), DESCRIPTION_LEN);
    }

    #[test]
    fn level4_sniff() {
        assert!(looks_like_mat5(b"MATL"));
        assert!(!looks_like_mat5(&[0, 0, 0, 0]));
        assert!(!looks_like_mat5(&[10, 0, 0, 0]));
    }

    #[test]
    fn default_description_names_platform() {
        let text = default_description();
        assert!(text.starts_with("MATLAB 5.0 MAT-file Platform: "));
        assert!(text.contains("Created on: "));
    }
}
