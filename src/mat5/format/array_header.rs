//! Array header parsing: flags, dimensions and name of a matrix element.
//!
//! # Layout
//! ```text
//! [miUINT32 tag, 8 bytes]  flags word | nzmax
//!     flags word: bits 0-7 class code, bit 9 logical, bit 10 global, bit 11 complex
//! [miINT32 element]        dimensions
//! [miINT8 element]         array name
//! ```

use log::trace;

use crate::mat5::types::error::{MatError, Result};
use crate::mat5::types::models::ArrayClass;
use crate::mat5::utils;

use super::element::ElementReader;

pub const LOGICAL_BIT: u32 = 1 << 9;
pub const GLOBAL_BIT: u32 = 1 << 10;
pub const COMPLEX_BIT: u32 = 1 << 11;

/// Decoded array flags, dimensions and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayHeader {
    pub class: ArrayClass,
    pub is_logical: bool,
    pub is_global: bool,
    pub is_complex: bool,
    pub nzmax: u32,
    /// Dimensions, always at least two.
    pub dims: Vec<usize>,
    pub name: String,
    /// Set for a zero-length matrix element, which has no header at all.
    pub is_empty_matrix: bool,
}

impl ArrayHeader {
    /// The header standing in for a zero-length matrix element.
    pub fn empty_matrix() -> Self {
        Self {
            class: ArrayClass::Double,
            is_logical: false,
            is_global: false,
            is_complex: false,
            nzmax: 0,
            dims: vec![0, 0],
            name: String::new(),
            is_empty_matrix: true,
        }
    }

    /// Packs class and flag bits into the flags word.
    pub fn flags_word(class: ArrayClass, is_logical: bool, is_global: bool, is_complex: bool) -> u32 {
        let mut word = class.code() as u32;
        if is_logical {
            word |= LOGICAL_BIT;
        }
        if is_global {
            word |= GLOBAL_BIT;
        }
        if is_complex {
            word |= COMPLEX_BIT;
        }
        word
    }
}

/// Reads the header at the start of a matrix element's payload.
///
/// `byte_count` is the matrix element's declared length; zero means the
/// empty matrix and nothing further is read.
pub fn read_header(reader: &mut ElementReader<'_>, byte_count: usize) -> Result<ArrayHeader> {
    if byte_count == 0 {
        trace!("Zero-length matrix element, using the empty matrix");
        return Ok(ArrayHeader::empty_matrix());
    }

    let flags = reader.read_raw()?;
    if flags.payload.len() < 8 {
        return Err(MatError::InvalidFormat(format!(
            "array flags hold {} bytes, expected 8",
            flags.payload.len()
        )));
    }
    let endian = reader.table().endian();
    let flags_class = utils::read_u32(&flags.payload[0..4], endian);
    let nzmax = utils::read_u32(&flags.payload[4..8], endian);
    let class = ArrayClass::try_from((flags_class & 0xFF) as u8)?;

    let dims = reader.read_numeric("dimensions")?.to_indices("dimensions")?;
    let dims = utils::normalize_dims(dims);
    let name = reader.read_string("array name")?;

    let header = ArrayHeader {
        class,
        is_logical: flags_class & LOGICAL_BIT != 0,
        is_global: flags_class & GLOBAL_BIT != 0,
        is_complex: flags_class & COMPLEX_BIT != 0,
        nzmax,
        dims,
        name,
        is_empty_matrix: false,
    };
    trace!(
        "Array header: class={}, dims={:?}, name='{}', complex={}, logical={}, global={}",
        header.class,
        header.dims,
        header.name,
        header.is_complex,
        header.is_logical,
        header.is_global
    );
    Ok(header)
}
