use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use log::{debug, info, trace};

use super::codec::text::TextCodec;
use super::format::element::{DEFAULT_MAX_DEPTH, DecodeSettings, ElementReader};
use super::format::header::{self, HEADER_LEN};
use super::format::tables::CodecTable;
use super::iter::Variables;
use super::types::error::{MatError, Result};
use super::types::models::{Endian, MatHeader, WireType};
use super::types::value::Variable;
use super::utils;

/// Options for reading a MAT-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Overrides the byte order given by the header's endian marker.
    pub byte_order: Option<Endian>,
    /// Codec label for character data stored as `uint16`; UTF-16 in the
    /// file's byte order when unset.
    pub uint16_codec: Option<String>,
    /// Cast numeric data to the type of its declared array class.
    pub mat_dtype: bool,
    /// Maximum nesting of matrix elements.
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            byte_order: None,
            uint16_codec: None,
            mat_dtype: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Sequential reader for level 5 MAT-files.
///
/// The header is parsed on construction; variables are then decoded one
/// top-level element at a time, in file order.
///
/// # Example
/// ```no_run
/// # use mat5::{MatReader, ReadOptions};
/// let mut reader = MatReader::open("data.mat", ReadOptions::default()).unwrap();
/// for variable in reader.variables() {
///     let variable = variable.unwrap();
///     println!("{}: {:?}", variable.name, variable.value.dims());
/// }
/// ```
#[derive(Debug)]
pub struct MatReader<R: Read> {
    inner: R,
    header: MatHeader,
    table: CodecTable,
    settings: DecodeSettings,
}

impl MatReader<BufReader<File>> {
    /// Opens a MAT-file from the given path.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be opened
    /// - The file is a level 4 MAT-file
    /// - The header is short or carries an unknown endian marker
    /// - `options.uint16_codec` names an unknown codec
    pub fn open(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening MAT-file: {}", path.display());
        let file = File::open(path)?;
        Self::new(BufReader::new(file), options)
    }
}

impl<R: Read> MatReader<R> {
    /// Reads the header from `inner` and prepares to decode variables.
    pub fn new(mut inner: R, options: ReadOptions) -> Result<Self> {
        let mut block = [0u8; HEADER_LEN];
        let filled = read_full(&mut inner, &mut block)?;
        if filled >= 4 && !header::looks_like_mat5(&block[..4]) {
            return Err(MatError::UnsupportedFormat(
                "level 4 MAT-files are not supported".to_string(),
            ));
        }
        if filled < HEADER_LEN {
            return Err(MatError::TruncatedStream {
                context: "file header",
                expected: HEADER_LEN as u64,
                available: filled as u64,
            });
        }
        let header = header::parse(&block, options.byte_order)?;

        let mut table = CodecTable::new(header.byte_order);
        if let Some(label) = &options.uint16_codec {
            let codec = TextCodec::for_label(label, header.byte_order)?;
            info!("Character data stored as uint16 decodes as {}", codec.name());
            table = table.with_uint16_codec(codec);
        }

        Ok(Self {
            inner,
            header,
            table,
            settings: DecodeSettings {
                mat_dtype: options.mat_dtype,
                max_depth: options.max_depth,
            },
        })
    }

    pub fn header(&self) -> &MatHeader {
        &self.header
    }

    pub fn byte_order(&self) -> Endian {
        self.header.byte_order
    }

    /// Decodes the next top-level variable.
    ///
    /// Returns `Ok(None)` at a clean end of stream. A stream that ends inside
    /// a tag or payload is a `TruncatedStream` error.
    pub fn next_variable(&mut self) -> Result<Option<Variable>> {
        let mut tag = [0u8; 8];
        let filled = read_full(&mut self.inner, &mut tag)?;
        if filled == 0 {
            trace!("End of MAT-file stream");
            return Ok(None);
        }
        if filled < tag.len() {
            return Err(MatError::TruncatedStream {
                context: "element tag",
                expected: tag.len() as u64,
                available: filled as u64,
            });
        }

        let endian = self.header.byte_order;
        let wire_type = utils::read_u32(&tag[0..4], endian);
        if wire_type >> 16 != 0 {
            return Err(MatError::MalformedTag(
                "top-level element stored in embedded form".to_string(),
            ));
        }
        let byte_count = utils::read_u32(&tag[4..8], endian) as usize;

        // The declared length is unverified; grow as bytes arrive.
        let mut element = tag.to_vec();
        let read = (&mut self.inner)
            .take(byte_count as u64)
            .read_to_end(&mut element)?;
        if read < byte_count {
            return Err(MatError::TruncatedStream {
                context: "top-level element",
                expected: byte_count as u64,
                available: read as u64,
            });
        }
        // Compressed elements are not padded.
        if wire_type != WireType::Compressed.code() {
            self.skip_padding(utils::padding(byte_count))?;
        }

        let mut reader = ElementReader::with_settings(&element, &self.table, self.settings);
        let variable = reader.read_variable()?;
        debug!(
            "Read variable '{}' ({}, {} bytes on disk)",
            variable.name,
            variable.value.kind_name(),
            element.len()
        );
        Ok(Some(variable))
    }

    /// Skips padding after a top-level element. A stream that ends inside the
    /// padding is accepted.
    fn skip_padding(&mut self, pad: usize) -> Result<()> {
        if pad == 0 {
            return Ok(());
        }
        let mut scratch = [0u8; 8];
        let skipped = read_full(&mut self.inner, &mut scratch[..pad])?;
        trace!("Skipped {} of {} padding bytes", skipped, pad);
        Ok(())
    }

    /// Iterates over the remaining variables.
    pub fn variables(&mut self) -> Variables<'_, R> {
        Variables::new(self)
    }

    /// Reads every remaining variable.
    pub fn read_all(&mut self) -> Result<Vec<Variable>> {
        self.variables().collect()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Fills `buf` as far as the stream allows; returns how many bytes were read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
