//! # mat5
//!
//! Reading and writing of MATLAB level 5 MAT-files.
//!
//! Supports numeric (including complex and logical), sparse, character, cell,
//! struct and object arrays in either byte order, with optional per-variable
//! zlib compression.
//!
//! **Note:** Level 4 and HDF5-based (v7.3) files are not supported.
pub mod mat5;

// Re-export the main types for convenience
pub use mat5::{
    MatError, MatReader, MatWriter, ReadOptions, Result, WriteOptions,
    format::classify::{ContainerKind, SlotKind, classify},
    format::element::ElementReader,
    format::encode::ElementWriter,
    iter::Variables,
    types::{
        models::{ArrayClass, Endian, MatHeader, WireType},
        value::{
            CellArray, CharArray, MatValue, NumericArray, NumericData, NumericKind, ObjectArray,
            Record, SparseMatrix, StructArray, Variable,
        },
    },
};
