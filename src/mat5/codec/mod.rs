//! Codec layer for compression and text operations.
//!
//! This module provides the pure data transformations used by the element
//! reader and writer.
//!
//! # Submodules
//!
//! - [`compression`][]: Zlib inflate/deflate for miCOMPRESSED variables
//! - [`text`][]: Character codecs (UTF-8/16/32, ASCII, configurable 16-bit codec)

pub mod compression;
pub mod text;
