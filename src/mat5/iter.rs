//! Iteration over the variables of a MAT-file.
//!
//! # Example
//! ```no_run
//! # use mat5::{MatReader, ReadOptions};
//! # let mut reader = MatReader::open("data.mat", ReadOptions::default()).unwrap();
//! for result in reader.variables() {
//!     let variable = result.unwrap();
//!     println!("{} ({})", variable.name, variable.value.kind_name());
//! }
//! ```

use std::io::Read;
use std::iter::FusedIterator;

use super::reader::MatReader;
use super::types::error::Result;
use super::types::value::Variable;

/// Iterator over the remaining top-level variables of a [`MatReader`].
///
/// Yields `Result<Variable>`. After the first error the iterator is
/// exhausted: the stream position is no longer on an element boundary.
///
/// Created by [`MatReader::variables()`](crate::MatReader::variables).
pub struct Variables<'a, R: Read> {
    reader: &'a mut MatReader<R>,
    done: bool,
}

impl<'a, R: Read> Variables<'a, R> {
    pub(super) fn new(reader: &'a mut MatReader<R>) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: Read> Iterator for Variables<'_, R> {
    type Item = Result<Variable>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_variable() {
            Ok(Some(variable)) => Some(Ok(variable)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for Variables<'_, R> {}
