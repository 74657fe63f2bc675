//! Low-level byte and shape helpers shared by the reader and the writer.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::types::error::{MatError, Result};
use super::types::models::Endian;

/// Number of zero bytes that follow a regular element payload so the next
/// tag starts on a 64-bit boundary.
pub fn padding(byte_count: usize) -> usize {
    (8 - byte_count % 8) % 8
}

/// Reads a `u32` from the first four bytes of `bytes` in the given order.
pub fn read_u32(bytes: &[u8], endian: Endian) -> u32 {
    match endian {
        Endian::Little => LittleEndian::read_u32(bytes),
        Endian::Big => BigEndian::read_u32(bytes),
    }
}

pub fn read_u16(bytes: &[u8], endian: Endian) -> u16 {
    match endian {
        Endian::Little => LittleEndian::read_u16(bytes),
        Endian::Big => BigEndian::read_u16(bytes),
    }
}

pub fn read_u64(bytes: &[u8], endian: Endian) -> u64 {
    match endian {
        Endian::Little => LittleEndian::read_u64(bytes),
        Endian::Big => BigEndian::read_u64(bytes),
    }
}

/// Appends a `u32` in the given order.
pub fn push_u32(out: &mut Vec<u8>, value: u32, endian: Endian) {
    let mut word = [0u8; 4];
    write_u32(&mut word, value, endian);
    out.extend_from_slice(&word);
}

/// Overwrites the first four bytes of `bytes` with `value`.
pub fn write_u32(bytes: &mut [u8], value: u32, endian: Endian) {
    match endian {
        Endian::Little => LittleEndian::write_u32(bytes, value),
        Endian::Big => BigEndian::write_u32(bytes, value),
    }
}

/// Promotes rank 0 and rank 1 shapes to two dimensions (`[] -> [1, 1]`,
/// `[n] -> [1, n]`).
pub fn normalize_dims(dims: Vec<usize>) -> Vec<usize> {
    match dims.len() {
        0 => vec![1, 1],
        1 => vec![1, dims[0]],
        _ => dims,
    }
}

/// Product of `dims`, failing instead of overflowing.
pub fn element_count(dims: &[usize]) -> Result<usize> {
    dims.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d).ok_or_else(|| {
            MatError::InvalidFormat(format!("dimensions {:?} overflow the element count", dims))
        })
    })
}

/// Column-major offset of an N-d subscript, or `None` when out of bounds.
pub fn column_major_offset(dims: &[usize], index: &[usize]) -> Option<usize> {
    if index.len() != dims.len() {
        return None;
    }
    let mut offset = 0;
    let mut stride = 1;
    for (&i, &d) in index.iter().zip(dims) {
        if i >= d {
            return None;
        }
        offset += i * stride;
        stride *= d;
    }
    Some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_aligns_to_eight() {
        for byte_count in 1..=8usize {
            let pad = padding(byte_count);
            assert!(pad <= 7);
            assert_eq!((byte_count + pad) % 8, 0, "byte_count={}", byte_count);
        }
        assert_eq!(padding(0), 0);
        assert_eq!(padding(5), 3);
    }

    #[test]
    fn column_major_offsets() {
        let dims = [2, 3];
        assert_eq!(column_major_offset(&dims, &[1, 0]), Some(1));
        assert_eq!(column_major_offset(&dims, &[0, 1]), Some(2));
        assert_eq!(column_major_offset(&dims, &[1, 2]), Some(5));
        assert_eq!(column_major_offset(&dims, &[2, 0]), None);
        assert_eq!(column_major_offset(&dims, &[0]), None);
    }

    #[test]
    fn element_count_detects_overflow() {
        assert_eq!(element_count(&[2, 3, 4]).unwrap(), 24);
        assert!(element_count(&[usize::MAX, 2]).is_err());
    }

    #[test]
    fn endian_words() {
        let mut out = Vec::new();
        push_u32(&mut out, 0x0102_0304, Endian::Big);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(read_u32(&out, Endian::Little), 0x0403_0201);
    }
}
