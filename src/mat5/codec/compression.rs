//! Zlib compression for miCOMPRESSED variables.
//!
//! Level 5 MAT-files written with compression wrap each top-level variable in
//! its own zlib stream. The inflated buffer holds exactly one miMATRIX element.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::trace;

use crate::mat5::types::error::{MatError, Result};

/// Largest inflated buffer: one tag, the longest payload a tag can declare,
/// and its padding.
pub const MAX_INFLATED_LEN: u64 = 16 + u32::MAX as u64;

/// Inflates a compressed variable payload.
///
/// # Errors
/// Returns `DecompressionError` if the payload is not a valid zlib stream or
/// inflates past `limit` bytes.
pub fn decompress_payload(payload: &[u8], limit: u64) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut decoder = ZlibDecoder::new(payload).take(limit.saturating_add(1));
    decoder.read_to_end(&mut output).map_err(|e| {
        MatError::DecompressionError(format!("Zlib decompression failed: {}", e))
    })?;
    if output.len() as u64 > limit {
        return Err(MatError::DecompressionError(format!(
            "inflated data exceeds {} bytes",
            limit
        )));
    }
    trace!(
        "Decompressed with Zlib: {} bytes -> {} bytes",
        payload.len(),
        output.len()
    );
    Ok(output)
}

/// Deflates a serialized variable with the default compression level.
pub fn compress_payload(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
    encoder.write_all(payload)?;
    let compressed = encoder.finish()?;
    trace!(
        "Compressed with Zlib: {} bytes -> {} bytes",
        payload.len(),
        compressed.len()
    );
    Ok(compressed)
}
