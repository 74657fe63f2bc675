//! Matrix element writing.
//!
//! # Matrix Layout
//! ```text
//! [miMATRIX tag]      length back-patched once the body is written
//! [miUINT32 x 2]      flags word | nzmax
//! [miINT32]           dimensions
//! [miINT8]            array name
//! [body]              per class, mirroring the decoder
//! ```
//! Small elements (1 to 4 payload bytes) use the embedded tag form; every
//! other element is zero padded to the next 8-byte boundary.

use std::borrow::Cow;

use log::{debug, trace};

use crate::mat5::codec::text;
use crate::mat5::types::error::{MatError, Result};
use crate::mat5::types::models::{ArrayClass, Endian, WireType};
use crate::mat5::types::value::{
    CellArray, CharArray, MatValue, NumericArray, NumericData, NumericKind, ObjectArray,
    Record, SparseMatrix, StructArray,
};
use crate::mat5::utils;

use super::array_header::ArrayHeader;
use super::classify::{self, ContainerKind};
use super::element::DEFAULT_MAX_DEPTH;
use super::tables;

/// Encoding switches that apply to a whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    /// Store characters as UTF-8 instead of rejecting non-ASCII text.
    pub unicode_strings: bool,
    /// Maximum nesting of cell/struct/object values.
    pub max_depth: usize,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            unicode_strings: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Serializes elements into an in-memory buffer.
#[derive(Debug)]
pub struct ElementWriter {
    buf: Vec<u8>,
    endian: Endian,
    settings: EncodeSettings,
    depth: usize,
}

/// A numeric buffer prepared for writing: real part, optional imaginary part
/// and whether it carries the logical flag.
struct Storage<'a> {
    real: Cow<'a, NumericData>,
    imag: Option<NumericData>,
    is_logical: bool,
    /// The values had no array class of their own and were converted.
    converted: bool,
}

impl<'a> Storage<'a> {
    fn prepare(data: &'a NumericData) -> Self {
        if let Some((re, im)) = data.split_complex() {
            return Storage {
                real: Cow::Owned(re),
                imag: Some(im),
                is_logical: false,
                converted: false,
            };
        }
        match data {
            NumericData::Logical(flags) => Storage {
                real: Cow::Owned(NumericData::UInt8(flags.iter().map(|&b| b as u8).collect())),
                imag: None,
                is_logical: true,
                converted: true,
            },
            NumericData::Int64(_) | NumericData::UInt64(_) => Storage {
                real: Cow::Owned(data.cast(NumericKind::Double)),
                imag: None,
                is_logical: false,
                converted: true,
            },
            _ => Storage {
                real: Cow::Borrowed(data),
                imag: None,
                is_logical: false,
                converted: false,
            },
        }
    }

    fn is_complex(&self) -> bool {
        self.imag.is_some()
    }
}

impl ElementWriter {
    pub fn new(endian: Endian) -> Self {
        Self::with_settings(endian, EncodeSettings::default())
    }

    pub fn with_settings(endian: Endian, settings: EncodeSettings) -> Self {
        Self {
            buf: Vec::new(),
            endian,
            settings,
            depth: 0,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a tag and payload, choosing the embedded form for 1 to 4 bytes.
    pub fn write_raw_element(&mut self, wire_type: WireType, payload: &[u8]) -> Result<()> {
        let len = payload.len();
        if (1..=4).contains(&len) {
            utils::push_u32(&mut self.buf, ((len as u32) << 16) | wire_type.code(), self.endian);
            self.buf.extend_from_slice(payload);
            self.buf.resize(self.buf.len() + 4 - len, 0);
            return Ok(());
        }
        let byte_count = u32::try_from(len).map_err(|_| {
            MatError::InvalidFormat(format!("element of {} bytes exceeds the 4 GiB limit", len))
        })?;
        utils::push_u32(&mut self.buf, wire_type.code(), self.endian);
        utils::push_u32(&mut self.buf, byte_count, self.endian);
        self.buf.extend_from_slice(payload);
        let pad = utils::padding(len);
        self.buf.resize(self.buf.len() + pad, 0);
        trace!("Wrote {:?} element: {} bytes + {} padding", wire_type, len, pad);
        Ok(())
    }

    /// Writes a real, non-logical numeric buffer as one element.
    pub fn write_element(&mut self, data: &NumericData) -> Result<()> {
        let (wire_type, bytes) = tables::encode_numeric(data, self.endian).ok_or_else(|| {
            MatError::InvalidFormat("logical and complex buffers cannot be written as one element".to_string())
        })?;
        self.write_raw_element(wire_type, &bytes)
    }

    /// Writes `value` as a complete matrix element named `name`.
    pub fn write_variable(&mut self, name: &str, value: &MatValue, is_global: bool) -> Result<()> {
        debug!("Encoding {} '{}' with dims {:?}", value.kind_name(), name, value.dims());
        match value {
            MatValue::Numeric(array) => self.write_numeric(name, array, is_global),
            MatValue::Sparse(matrix) => self.write_sparse(name, matrix, is_global),
            MatValue::Char(chars) => self.write_char(name, chars, is_global),
            MatValue::Cell(cell) => self.write_cell(name, cell, is_global),
            MatValue::Struct(array) => {
                classify::validate_field_names(&array.field_names)?;
                self.write_struct_like(name, is_global, &array.dims, None, &array.field_names, &array.elements)
            }
            MatValue::Object(object) => self.write_object(name, object, is_global),
            MatValue::Record(record) => self.write_record(name, record, is_global),
        }
    }

    /// Writes a nested value one level deeper.
    fn write_nested(&mut self, value: &MatValue) -> Result<()> {
        if self.depth + 1 > self.settings.max_depth {
            return Err(MatError::RecursionLimit(self.settings.max_depth));
        }
        self.depth += 1;
        let result = self.write_variable("", value, false);
        self.depth -= 1;
        result
    }

    /// Starts a matrix element and writes its header. Returns the tag offset
    /// to hand to [`ElementWriter::finish_matrix`].
    fn begin_matrix(&mut self, header: &ArrayHeader) -> Result<usize> {
        let start = self.buf.len();
        utils::push_u32(&mut self.buf, WireType::Matrix.code(), self.endian);
        utils::push_u32(&mut self.buf, 0, self.endian);

        let flags = ArrayHeader::flags_word(header.class, header.is_logical, header.is_global, header.is_complex);
        let mut flags_payload = Vec::with_capacity(8);
        utils::push_u32(&mut flags_payload, flags, self.endian);
        utils::push_u32(&mut flags_payload, header.nzmax, self.endian);
        self.write_raw_element(WireType::UInt32, &flags_payload)?;

        let dims = header
            .dims
            .iter()
            .map(|&d| {
                i32::try_from(d).map_err(|_| {
                    MatError::InvalidFormat(format!("dimension {} does not fit in int32", d))
                })
            })
            .collect::<Result<Vec<i32>>>()?;
        self.write_element(&NumericData::Int32(dims))?;
        self.write_raw_element(WireType::Int8, header.name.as_bytes())?;
        Ok(start)
    }

    /// Back-patches the matrix length: everything after the 8-byte tag.
    fn finish_matrix(&mut self, start: usize) -> Result<()> {
        let body = self.buf.len() - start - 8;
        let body = u32::try_from(body).map_err(|_| {
            MatError::InvalidFormat(format!("matrix of {} bytes exceeds the 4 GiB limit", body))
        })?;
        utils::write_u32(&mut self.buf[start + 4..start + 8], body, self.endian);
        Ok(())
    }

    fn header(name: &str, class: ArrayClass, dims: &[usize], is_global: bool) -> ArrayHeader {
        ArrayHeader {
            class,
            is_logical: false,
            is_global,
            is_complex: false,
            nzmax: 0,
            dims: utils::normalize_dims(dims.to_vec()),
            name: name.to_string(),
            is_empty_matrix: false,
        }
    }

    fn write_numeric(&mut self, name: &str, array: &NumericArray, is_global: bool) -> Result<()> {
        let storage = Storage::prepare(&array.data);
        let class = if array.class.is_numeric() && !storage.converted {
            array.class
        } else {
            storage.real.default_class()
        };
        let mut header = Self::header(name, class, &array.dims, is_global);
        check_count("numeric array", &header.dims, array.data.len())?;
        header.is_logical = storage.is_logical;
        header.is_complex = storage.is_complex();

        let start = self.begin_matrix(&header)?;
        self.write_element(&storage.real)?;
        if let Some(imag) = &storage.imag {
            self.write_element(imag)?;
        }
        self.finish_matrix(start)
    }

    fn write_sparse(&mut self, name: &str, matrix: &SparseMatrix, is_global: bool) -> Result<()> {
        matrix.validate()?;
        let matrix = if matrix.has_sorted_indices() {
            Cow::Borrowed(matrix)
        } else {
            trace!("Sorting row indices of sparse '{}'", name);
            let mut sorted = matrix.clone();
            sorted.sort_indices();
            Cow::Owned(sorted)
        };
        let to_i32 = |values: &[usize], context: &str| {
            values
                .iter()
                .map(|&v| {
                    i32::try_from(v).map_err(|_| {
                        MatError::InvalidFormat(format!("{} value {} does not fit in int32", context, v))
                    })
                })
                .collect::<Result<Vec<i32>>>()
        };
        let row_indices = to_i32(&matrix.row_indices, "sparse row index")?;
        let col_ptr = to_i32(&matrix.col_ptr, "sparse column pointer")?;
        let nnz = u32::try_from(matrix.nnz()).map_err(|_| {
            MatError::InvalidFormat(format!("{} non-zeros do not fit in nzmax", matrix.nnz()))
        })?;

        let storage = Storage::prepare(&matrix.values);
        let mut header = Self::header(name, ArrayClass::Sparse, &[matrix.nrows, matrix.ncols], is_global);
        header.is_logical = storage.is_logical;
        header.is_complex = storage.is_complex();
        header.nzmax = nnz;

        let start = self.begin_matrix(&header)?;
        self.write_element(&NumericData::Int32(row_indices))?;
        self.write_element(&NumericData::Int32(col_ptr))?;
        self.write_element(&storage.real)?;
        if let Some(imag) = &storage.imag {
            self.write_element(imag)?;
        }
        self.finish_matrix(start)
    }

    fn write_char(&mut self, name: &str, chars: &CharArray, is_global: bool) -> Result<()> {
        let bytes = if self.settings.unicode_strings {
            text::encode_utf8(&chars.chars)
        } else {
            text::encode_ascii(&chars.chars)?
        };
        let header = Self::header(name, ArrayClass::Char, &chars.dims, is_global);
        check_count("char array", &header.dims, chars.chars.len())?;
        let start = self.begin_matrix(&header)?;
        self.write_raw_element(WireType::Utf8, &bytes)?;
        self.finish_matrix(start)
    }

    fn write_cell(&mut self, name: &str, cell: &CellArray, is_global: bool) -> Result<()> {
        match classify::classify(&cell.cells).container {
            ContainerKind::Struct { field_names } => {
                trace!("Cell '{}' holds uniform records; writing a struct array", name);
                let records = slot_records(&cell.cells);
                self.write_struct_like(name, is_global, &cell.dims, None, &field_names, &records)
            }
            ContainerKind::Object {
                class_name,
                field_names,
            } => {
                trace!("Cell '{}' holds uniform '{}' records; writing an object array", name, class_name);
                let records = slot_records(&cell.cells);
                self.write_struct_like(name, is_global, &cell.dims, Some(class_name.as_str()), &field_names, &records)
            }
            ContainerKind::Cell => {
                let header = Self::header(name, ArrayClass::Cell, &cell.dims, is_global);
                check_count("cell array", &header.dims, cell.cells.len())?;
                let start = self.begin_matrix(&header)?;
                for value in &cell.cells {
                    self.write_nested(value)?;
                }
                self.finish_matrix(start)
            }
        }
    }

    fn write_record(&mut self, name: &str, record: &Record, is_global: bool) -> Result<()> {
        let field_names: Vec<String> = record.fields.iter().map(|(n, _)| n.clone()).collect();
        classify::validate_field_names(&field_names)?;
        let records = [record.clone()];
        self.write_struct_like(
            name,
            is_global,
            &[1, 1],
            record.class_name.as_deref(),
            &field_names,
            &records,
        )
    }

    fn write_object(&mut self, name: &str, object: &ObjectArray, is_global: bool) -> Result<()> {
        let StructArray {
            dims,
            field_names,
            elements,
        } = &object.array;
        classify::validate_field_names(field_names)?;
        self.write_struct_like(name, is_global, dims, Some(object.class_name.as_str()), field_names, elements)
    }

    /// Writes a struct array, or an object array when `class_name` is set.
    ///
    /// Every record is written with exactly `field_names`, in that order; a
    /// record missing a field gets the empty matrix in its place.
    fn write_struct_like(
        &mut self,
        name: &str,
        is_global: bool,
        dims: &[usize],
        class_name: Option<&str>,
        field_names: &[String],
        records: &[Record],
    ) -> Result<()> {
        let class = if class_name.is_some() {
            ArrayClass::Object
        } else {
            ArrayClass::Struct
        };
        let header = Self::header(name, class, dims, is_global);
        check_count("struct array", &header.dims, records.len())?;

        let start = self.begin_matrix(&header)?;
        if let Some(class_name) = class_name {
            self.write_raw_element(WireType::Int8, class_name.as_bytes())?;
        }
        let width = field_names.iter().map(String::len).max().unwrap_or(0) + 1;
        self.write_element(&NumericData::Int32(vec![width as i32]))?;
        let mut blob = vec![0u8; width * field_names.len()];
        for (slot, field) in blob.chunks_mut(width).zip(field_names) {
            slot[..field.len()].copy_from_slice(field.as_bytes());
        }
        self.write_raw_element(WireType::Int8, &blob)?;

        let empty = MatValue::Numeric(NumericArray::empty());
        for record in records {
            for field in field_names {
                self.write_nested(record.get(field).unwrap_or(&empty))?;
            }
        }
        self.finish_matrix(start)
    }
}

/// Rejects values whose element count disagrees with their dims; the reader
/// would refuse the file otherwise.
fn check_count(context: &'static str, dims: &[usize], found: usize) -> Result<()> {
    let expected = utils::element_count(dims)?;
    if expected != found {
        return Err(MatError::ShapeMismatch {
            context,
            expected: expected as u64,
            found: found as u64,
        });
    }
    Ok(())
}

fn slot_records(values: &[MatValue]) -> Vec<Record> {
    values
        .iter()
        .filter_map(|value| match value {
            MatValue::Record(record) => Some(record.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mat5::format::element::ElementReader;
    use crate::mat5::format::tables::CodecTable;

    fn le_word(bytes: &[u8], at: usize) -> u32 {
        utils::read_u32(&bytes[at..at + 4], Endian::Little)
    }

    #[test]
    fn four_bytes_embed_five_do_not() {
        let mut w = ElementWriter::new(Endian::Little);
        w.write_raw_element(WireType::UInt8, &[1, 2, 3, 4]).unwrap();
        assert_eq!(w.len(), 8);
        assert_eq!(le_word(w.as_bytes(), 0), (4 << 16) | 2);

        let mut w = ElementWriter::new(Endian::Little);
        w.write_raw_element(WireType::UInt8, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(w.len(), 16);
        assert_eq!(le_word(w.as_bytes(), 0), 2);
        assert_eq!(le_word(w.as_bytes(), 4), 5);
    }

    #[test]
    fn elements_stay_aligned() {
        for len in 0..=16usize {
            let mut w = ElementWriter::new(Endian::Big);
            w.write_raw_element(WireType::Int8, &vec![7u8; len]).unwrap();
            assert_eq!(w.len() % 8, 0, "length {}", len);
        }
    }

    #[test]
    fn empty_element_is_regular() {
        let mut w = ElementWriter::new(Endian::Little);
        w.write_raw_element(WireType::Int8, &[]).unwrap();
        assert_eq!(w.as_bytes(), &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn matrix_length_excludes_tag() {
        let mut w = ElementWriter::new(Endian::Little);
        let value = MatValue::Numeric(NumericArray::row(vec![1.0f64, 2.0, 3.0]));
        w.write_variable("x", &value, false).unwrap();
        let bytes = w.as_bytes();
        assert_eq!(le_word(bytes, 0), WireType::Matrix.code());
        assert_eq!(le_word(bytes, 4) as usize, bytes.len() - 8);
    }

    #[test]
    fn int64_widens_to_double() {
        let mut w = ElementWriter::new(Endian::Little);
        let value = MatValue::Numeric(NumericArray::row(vec![5i64, -6]));
        w.write_variable("big", &value, false).unwrap();
        let bytes = w.into_inner();
        let table = CodecTable::new(Endian::Little);
        let var = ElementReader::new(&bytes, &table).read_variable().unwrap();
        let array = var.value.as_numeric().unwrap();
        assert_eq!(array.class, ArrayClass::Double);
        assert_eq!(array.data, NumericData::Double(vec![5.0, -6.0]));
    }

    #[test]
    fn non_ascii_needs_unicode_strings() {
        let value = MatValue::Char(CharArray::from_text("é"));
        let mut w = ElementWriter::new(Endian::Little);
        assert!(matches!(
            w.write_variable("s", &value, false),
            Err(MatError::UnsupportedTextCodec(_))
        ));
        let settings = EncodeSettings {
            unicode_strings: true,
            ..EncodeSettings::default()
        };
        let mut w = ElementWriter::with_settings(Endian::Little, settings);
        assert!(w.write_variable("s", &value, false).is_ok());
    }

    #[test]
    fn duplicate_record_fields_are_rejected() {
        let record = Record {
            class_name: None,
            fields: vec![
                ("a".to_string(), MatValue::Numeric(NumericArray::scalar(1.0))),
                ("a".to_string(), MatValue::Numeric(NumericArray::scalar(2.0))),
            ],
        };
        let mut w = ElementWriter::new(Endian::Little);
        assert!(matches!(
            w.write_variable("r", &MatValue::Record(record), false),
            Err(MatError::InvalidFieldName(_))
        ));
    }

    #[test]
    fn numeric_data_must_fill_dims() {
        let array = NumericArray {
            class: ArrayClass::Double,
            dims: vec![2, 2],
            data: NumericData::Double(vec![1.0]),
        };
        let mut w = ElementWriter::new(Endian::Little);
        assert!(matches!(
            w.write_variable("m", &MatValue::Numeric(array), false),
            Err(MatError::ShapeMismatch {
                context: "numeric array",
                expected: 4,
                found: 1
            })
        ));
        assert!(w.is_empty());
    }

    #[test]
    fn char_data_must_fill_dims() {
        let chars = CharArray {
            dims: vec![3, 3],
            chars: vec!['a'],
        };
        let mut w = ElementWriter::new(Endian::Little);
        assert!(matches!(
            w.write_variable("c", &MatValue::Char(chars), false),
            Err(MatError::ShapeMismatch {
                context: "char array",
                expected: 9,
                found: 1
            })
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let mut value = MatValue::Numeric(NumericArray::scalar(1.0));
        for _ in 0..4 {
            value = MatValue::Cell(CellArray::row(vec![value]));
        }
        let settings = EncodeSettings {
            max_depth: 3,
            ..EncodeSettings::default()
        };
        let mut w = ElementWriter::with_settings(Endian::Little, settings);
        assert!(matches!(
            w.write_variable("deep", &value, false),
            Err(MatError::RecursionLimit(3))
        ));
    }
}
