//! Core MAT-file level 5 module.
//!
//! # Module Organization
//!
//! - [`reader`] / [`writer`]: File-level entry points
//! - [`iter`]: Iteration over decoded variables
//! - [`format`]: Header, element and matrix encoding/decoding
//! - [`codec`]: Zlib and text codecs
//! - [`types`]: Errors, on-disk vocabulary and in-memory values

pub mod codec;
pub mod format;
pub mod iter;
pub mod reader;
pub mod types;
pub mod utils;
pub mod writer;

pub use reader::{MatReader, ReadOptions};
pub use types::error::{MatError, Result};
pub use writer::{MatWriter, WriteOptions};
