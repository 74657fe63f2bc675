//! Element-level format layer for level 5 MAT-files.
//!
//! This module sits between raw bytes and the high-level
//! [`MatReader`](crate::mat5::reader::MatReader) /
//! [`MatWriter`](crate::mat5::writer::MatWriter).
//!
//! # Module Organization
//!
//! - [`header`]: The 128-byte file header
//! - [`element`]: Tag reading and element payload decoding
//! - [`tables`]: Data type and class mappings, byte-order conversion
//! - [`array_header`]: Flags, dimensions and name of a matrix element
//! - [`decode`]: Per-class matrix body decoding
//! - [`encode`]: Element and matrix writing
//! - [`classify`]: Struct/object/cell choice for heterogeneous containers
//!
//! # Architecture
//!
//! ```text
//! File Structure:
//! ┌──────────────────────┐
//! │  Header (128 bytes)  │ ← header::parse() / header::build()
//! ├──────────────────────┤
//! │  miMATRIX            │ ← ElementReader::read_variable()
//! │  ┌────────────────┐  │
//! │  │ array header   │  │ ← array_header::read_header()
//! │  │ body           │  │ ← decode::read_matrix()
//! │  └────────────────┘  │
//! ├──────────────────────┤
//! │  miCOMPRESSED        │ ← zlib, then one miMATRIX inside
//! ├──────────────────────┤
//! │  ...                 │
//! └──────────────────────┘
//! ```

pub mod array_header;
pub mod classify;
pub mod decode;
pub mod element;
pub mod encode;
pub mod header;
pub mod tables;
