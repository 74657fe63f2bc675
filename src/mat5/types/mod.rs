//! Foundational data structures, error types, and decoded value types.

pub mod error;
pub mod models;
pub mod value;
