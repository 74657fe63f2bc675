use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info};

use super::codec::compression;
use super::format::element::DEFAULT_MAX_DEPTH;
use super::format::encode::{ElementWriter, EncodeSettings};
use super::format::header;
use super::types::error::{MatError, Result};
use super::types::models::{Endian, WireType};
use super::types::value::MatValue;
use super::utils;

/// Options for writing a MAT-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub byte_order: Endian,
    /// Wrap every variable in its own zlib stream.
    pub compress: bool,
    /// Store characters as UTF-8 instead of ASCII.
    pub unicode_strings: bool,
    /// Variables written under these names get the global flag.
    pub global_vars: Vec<String>,
    /// Header text; a platform and timestamp line when unset.
    pub description: Option<String>,
    /// Maximum nesting of cell/struct/object values.
    pub max_depth: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            byte_order: Endian::native(),
            compress: false,
            unicode_strings: false,
            global_vars: Vec::new(),
            description: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Sequential writer for level 5 MAT-files.
///
/// The header is written on construction; every variable is then encoded
/// into its own buffer and appended.
///
/// # Example
/// ```no_run
/// # use mat5::{MatWriter, NumericArray, WriteOptions};
/// let mut writer = MatWriter::create("out.mat", WriteOptions::default()).unwrap();
/// writer.put_variable("x", &NumericArray::scalar(1.0).into()).unwrap();
/// writer.finish().unwrap();
/// ```
#[derive(Debug)]
pub struct MatWriter<W: Write> {
    inner: W,
    options: WriteOptions,
    written: usize,
}

impl MatWriter<BufWriter<File>> {
    /// Creates (or truncates) a MAT-file at the given path.
    pub fn create(path: impl AsRef<Path>, options: WriteOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Creating MAT-file: {}", path.display());
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), options)
    }
}

impl<W: Write> MatWriter<W> {
    /// Writes the header to `inner`.
    pub fn new(mut inner: W, options: WriteOptions) -> Result<Self> {
        let description = options
            .description
            .clone()
            .unwrap_or_else(header::default_description);
        inner.write_all(&header::build(&description, options.byte_order))?;
        info!(
            "Wrote MAT-file header ({}, compression {})",
            options.byte_order,
            if options.compress { "on" } else { "off" }
        );
        Ok(Self {
            inner,
            options,
            written: 0,
        })
    }

    /// Encodes and appends one variable. Its global flag comes from
    /// [`WriteOptions::global_vars`].
    pub fn put_variable(&mut self, name: &str, value: &MatValue) -> Result<()> {
        let is_global = self.options.global_vars.iter().any(|g| g == name);
        let settings = EncodeSettings {
            unicode_strings: self.options.unicode_strings,
            max_depth: self.options.max_depth,
        };
        let mut encoder = ElementWriter::with_settings(self.options.byte_order, settings);
        encoder.write_variable(name, value, is_global)?;
        let element = encoder.into_inner();

        if self.options.compress {
            let compressed = compression::compress_payload(&element)?;
            let length = u32::try_from(compressed.len()).map_err(|_| {
                MatError::InvalidFormat(format!(
                    "compressed variable '{}' exceeds the 4 GiB limit",
                    name
                ))
            })?;
            let mut tag = Vec::with_capacity(8);
            utils::push_u32(&mut tag, WireType::Compressed.code(), self.options.byte_order);
            utils::push_u32(&mut tag, length, self.options.byte_order);
            self.inner.write_all(&tag)?;
            self.inner.write_all(&compressed)?;
            debug!(
                "Wrote variable '{}': {} bytes compressed to {}",
                name,
                element.len(),
                compressed.len()
            );
        } else {
            self.inner.write_all(&element)?;
            debug!("Wrote variable '{}': {} bytes", name, element.len());
        }
        self.written += 1;
        Ok(())
    }

    /// Appends owned values; convenient with `From` conversions.
    pub fn put(&mut self, name: &str, value: impl Into<MatValue>) -> Result<()> {
        self.put_variable(name, &value.into())
    }

    /// Appends every `(name, value)` pair in iteration order.
    pub fn put_variables<'v, I, K>(&mut self, variables: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, &'v MatValue)>,
        K: AsRef<str>,
    {
        for (name, value) in variables {
            self.put_variable(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Number of variables written so far.
    pub fn variable_count(&self) -> usize {
        self.written
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        info!("Finished MAT-file with {} variables", self.written);
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mat5::types::value::NumericArray;

    fn options(endian: Endian) -> WriteOptions {
        WriteOptions {
            byte_order: endian,
            description: Some("MATLAB 5.0 MAT-file, unit test".to_string()),
            ..WriteOptions::default()
        }
    }

    #[test]
    fn header_is_written_up_front() {
        let bytes = MatWriter::new(Vec::new(), options(Endian::Big))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(bytes.len(), 128);
        assert_eq!(&bytes[126..], b"MI");
    }

    #[test]
    fn every_variable_is_aligned() {
        let mut writer = MatWriter::new(Vec::new(), options(Endian::Little)).unwrap();
        writer.put("a", NumericArray::row(vec![1u8, 2, 3])).unwrap();
        writer.put("b", NumericArray::scalar(4.0)).unwrap();
        assert_eq!(writer.variable_count(), 2);
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len() % 8, 0);
    }

    #[test]
    fn compressed_tag_carries_zlib_length() {
        let opts = WriteOptions {
            compress: true,
            ..options(Endian::Little)
        };
        let mut writer = MatWriter::new(Vec::new(), opts).unwrap();
        writer.put("z", NumericArray::row(vec![0.0f64; 64])).unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(utils::read_u32(&bytes[128..132], Endian::Little), 15);
        let length = utils::read_u32(&bytes[132..136], Endian::Little) as usize;
        assert_eq!(bytes.len(), 136 + length);
    }
}
