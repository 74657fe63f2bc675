//! In-memory representation of decoded variables.
//!
//! All arrays keep the MAT-file's column-major element order together with
//! their dimensions, so nothing is reordered between disk and memory.

use num_complex::{Complex32, Complex64};

use super::error::{MatError, Result};
use super::models::ArrayClass;
use crate::mat5::utils;

/// A named top-level (or nested) variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub is_global: bool,
    pub value: MatValue,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<MatValue>) -> Self {
        Self {
            name: name.into(),
            is_global: false,
            value: value.into(),
        }
    }
}

/// One of the array kinds a MAT-file can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum MatValue {
    Numeric(NumericArray),
    Sparse(SparseMatrix),
    Char(CharArray),
    Cell(CellArray),
    Struct(StructArray),
    Object(ObjectArray),
    /// A single record. Written as a 1x1 struct, or a 1x1 object when it
    /// carries a class name; the classifier also inspects these inside cells.
    Record(Record),
}

impl MatValue {
    /// Logical dimensions of the value.
    pub fn dims(&self) -> Vec<usize> {
        match self {
            MatValue::Numeric(a) => a.dims.clone(),
            MatValue::Sparse(s) => vec![s.nrows, s.ncols],
            MatValue::Char(c) => c.dims.clone(),
            MatValue::Cell(c) => c.dims.clone(),
            MatValue::Struct(s) => s.dims.clone(),
            MatValue::Object(o) => o.array.dims.clone(),
            MatValue::Record(_) => vec![1, 1],
        }
    }

    /// Short name of the array kind, used in logs and listings.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MatValue::Numeric(_) => "numeric",
            MatValue::Sparse(_) => "sparse",
            MatValue::Char(_) => "char",
            MatValue::Cell(_) => "cell",
            MatValue::Struct(_) => "struct",
            MatValue::Object(_) => "object",
            MatValue::Record(_) => "record",
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericArray> {
        match self {
            MatValue::Numeric(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<&CharArray> {
        match self {
            MatValue::Char(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseMatrix> {
        match self {
            MatValue::Sparse(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&CellArray> {
        match self {
            MatValue::Cell(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructArray> {
        match self {
            MatValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectArray> {
        match self {
            MatValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

macro_rules! impl_from_value {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for MatValue {
                fn from(value: $ty) -> Self {
                    MatValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_value!(
    Numeric(NumericArray),
    Sparse(SparseMatrix),
    Char(CharArray),
    Cell(CellArray),
    Struct(StructArray),
    Object(ObjectArray),
    Record(Record),
);

/// Element type of a real numeric buffer, independent of byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
}

impl NumericKind {
    /// Size of one value in bytes.
    pub fn width(self) -> usize {
        match self {
            NumericKind::Int8 | NumericKind::UInt8 => 1,
            NumericKind::Int16 | NumericKind::UInt16 => 2,
            NumericKind::Int32 | NumericKind::UInt32 | NumericKind::Single => 4,
            NumericKind::Int64 | NumericKind::UInt64 | NumericKind::Double => 8,
        }
    }
}

/// A flat column-major numeric buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Single(Vec<f32>),
    Double(Vec<f64>),
    Logical(Vec<bool>),
    ComplexSingle(Vec<Complex32>),
    ComplexDouble(Vec<Complex64>),
}

macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            NumericData::Int8($v) => $body,
            NumericData::UInt8($v) => $body,
            NumericData::Int16($v) => $body,
            NumericData::UInt16($v) => $body,
            NumericData::Int32($v) => $body,
            NumericData::UInt32($v) => $body,
            NumericData::Int64($v) => $body,
            NumericData::UInt64($v) => $body,
            NumericData::Single($v) => $body,
            NumericData::Double($v) => $body,
            NumericData::Logical($v) => $body,
            NumericData::ComplexSingle($v) => $body,
            NumericData::ComplexDouble($v) => $body,
        }
    };
}

impl NumericData {
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every value past `len`.
    pub fn truncate(&mut self, len: usize) {
        each_variant!(self, v => v.truncate(len))
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, NumericData::ComplexSingle(_) | NumericData::ComplexDouble(_))
    }

    /// Element type of a real, non-logical buffer.
    pub fn kind(&self) -> Option<NumericKind> {
        match self {
            NumericData::Int8(_) => Some(NumericKind::Int8),
            NumericData::UInt8(_) => Some(NumericKind::UInt8),
            NumericData::Int16(_) => Some(NumericKind::Int16),
            NumericData::UInt16(_) => Some(NumericKind::UInt16),
            NumericData::Int32(_) => Some(NumericKind::Int32),
            NumericData::UInt32(_) => Some(NumericKind::UInt32),
            NumericData::Int64(_) => Some(NumericKind::Int64),
            NumericData::UInt64(_) => Some(NumericKind::UInt64),
            NumericData::Single(_) => Some(NumericKind::Single),
            NumericData::Double(_) => Some(NumericKind::Double),
            NumericData::Logical(_)
            | NumericData::ComplexSingle(_)
            | NumericData::ComplexDouble(_) => None,
        }
    }

    /// The array class a buffer of this type is stored under by default.
    pub fn default_class(&self) -> ArrayClass {
        match self {
            NumericData::Int8(_) => ArrayClass::Int8,
            NumericData::UInt8(_) | NumericData::Logical(_) => ArrayClass::UInt8,
            NumericData::Int16(_) => ArrayClass::Int16,
            NumericData::UInt16(_) => ArrayClass::UInt16,
            NumericData::Int32(_) => ArrayClass::Int32,
            NumericData::UInt32(_) => ArrayClass::UInt32,
            NumericData::Single(_) | NumericData::ComplexSingle(_) => ArrayClass::Single,
            NumericData::Int64(_)
            | NumericData::UInt64(_)
            | NumericData::Double(_)
            | NumericData::ComplexDouble(_) => ArrayClass::Double,
        }
    }

    /// Real values widened to `f64`; logical values become 0.0/1.0.
    /// Returns `None` for complex buffers.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let values = match self {
            NumericData::Int8(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt8(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Int16(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt16(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Int32(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt32(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Single(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Double(v) => v.clone(),
            NumericData::Logical(v) => v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect(),
            NumericData::ComplexSingle(_) | NumericData::ComplexDouble(_) => return None,
        };
        Some(values)
    }

    /// Builds a buffer of `kind` from `f64` values using saturating `as` casts.
    pub fn from_f64(kind: NumericKind, values: &[f64]) -> Self {
        match kind {
            NumericKind::Int8 => NumericData::Int8(values.iter().map(|&x| x as i8).collect()),
            NumericKind::UInt8 => NumericData::UInt8(values.iter().map(|&x| x as u8).collect()),
            NumericKind::Int16 => NumericData::Int16(values.iter().map(|&x| x as i16).collect()),
            NumericKind::UInt16 => NumericData::UInt16(values.iter().map(|&x| x as u16).collect()),
            NumericKind::Int32 => NumericData::Int32(values.iter().map(|&x| x as i32).collect()),
            NumericKind::UInt32 => NumericData::UInt32(values.iter().map(|&x| x as u32).collect()),
            NumericKind::Int64 => NumericData::Int64(values.iter().map(|&x| x as i64).collect()),
            NumericKind::UInt64 => NumericData::UInt64(values.iter().map(|&x| x as u64).collect()),
            NumericKind::Single => NumericData::Single(values.iter().map(|&x| x as f32).collect()),
            NumericKind::Double => NumericData::Double(values.to_vec()),
        }
    }

    /// Complex values widened to `Complex64`; real values get a zero imaginary part.
    pub fn to_complex64_vec(&self) -> Vec<Complex64> {
        match self {
            NumericData::ComplexDouble(v) => v.clone(),
            NumericData::ComplexSingle(v) => v
                .iter()
                .map(|c| Complex64::new(c.re as f64, c.im as f64))
                .collect(),
            real => real
                .to_f64_vec()
                .unwrap_or_default()
                .into_iter()
                .map(|re| Complex64::new(re, 0.0))
                .collect(),
        }
    }

    /// Converts real data to `kind`; complex data keeps its complex form,
    /// narrowed to single precision only when `kind` is `Single`.
    pub fn cast(&self, kind: NumericKind) -> NumericData {
        if self.kind() == Some(kind) {
            return self.clone();
        }
        if self.is_complex() {
            let wide = self.to_complex64_vec();
            return match kind {
                NumericKind::Single => NumericData::ComplexSingle(
                    wide.iter()
                        .map(|c| Complex32::new(c.re as f32, c.im as f32))
                        .collect(),
                ),
                _ => NumericData::ComplexDouble(wide),
            };
        }
        let values = self.to_f64_vec().unwrap_or_default();
        NumericData::from_f64(kind, &values)
    }

    /// Non-zero values become `true`.
    pub fn to_logical(&self) -> NumericData {
        let flags = match self {
            NumericData::Logical(v) => v.clone(),
            NumericData::ComplexSingle(v) => v.iter().map(|c| c.re != 0.0 || c.im != 0.0).collect(),
            NumericData::ComplexDouble(v) => v.iter().map(|c| c.re != 0.0 || c.im != 0.0).collect(),
            real => real
                .to_f64_vec()
                .unwrap_or_default()
                .into_iter()
                .map(|x| x != 0.0)
                .collect(),
        };
        NumericData::Logical(flags)
    }

    /// Raw bytes of an 8-bit buffer (names and character data are stored this way).
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            NumericData::UInt8(v) => Some(v.clone()),
            NumericData::Int8(v) => Some(v.iter().map(|&b| b as u8).collect()),
            _ => None,
        }
    }

    /// Interprets the buffer as non-negative integral indices or sizes.
    pub fn to_indices(&self, context: &'static str) -> Result<Vec<usize>> {
        let values = self.to_f64_vec().ok_or_else(|| {
            MatError::InvalidFormat(format!("{} must be stored as real values", context))
        })?;
        values
            .into_iter()
            .map(|v| {
                if v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 {
                    Ok(v as usize)
                } else {
                    Err(MatError::InvalidFormat(format!(
                        "{} contains invalid value {}",
                        context, v
                    )))
                }
            })
            .collect()
    }

    /// Splits a complex buffer into its real and imaginary parts.
    pub fn split_complex(&self) -> Option<(NumericData, NumericData)> {
        match self {
            NumericData::ComplexSingle(v) => Some((
                NumericData::Single(v.iter().map(|c| c.re).collect()),
                NumericData::Single(v.iter().map(|c| c.im).collect()),
            )),
            NumericData::ComplexDouble(v) => Some((
                NumericData::Double(v.iter().map(|c| c.re).collect()),
                NumericData::Double(v.iter().map(|c| c.im).collect()),
            )),
            _ => None,
        }
    }
}

macro_rules! impl_from_vec {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for NumericData {
                fn from(values: Vec<$ty>) -> Self {
                    NumericData::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec!(
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Logical(bool),
    ComplexSingle(Complex32),
    ComplexDouble(Complex64),
);

/// A dense numeric array.
///
/// `class` is the class recorded in the file. It may differ from the buffer's
/// own type: MATLAB stores doubles holding small integers in narrower types.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub class: ArrayClass,
    pub dims: Vec<usize>,
    pub data: NumericData,
}

impl NumericArray {
    /// Builds an array and checks that `dims` covers exactly `data.len()` values.
    /// Rank 0 and rank 1 shapes are promoted to two dimensions.
    pub fn new(dims: Vec<usize>, data: impl Into<NumericData>) -> Result<Self> {
        let data = data.into();
        let dims = utils::normalize_dims(dims);
        let expected = utils::element_count(&dims)?;
        if expected != data.len() {
            return Err(MatError::ShapeMismatch {
                context: "numeric array",
                expected: expected as u64,
                found: data.len() as u64,
            });
        }
        Ok(Self {
            class: data.default_class(),
            dims,
            data,
        })
    }

    /// A 1x1 double.
    pub fn scalar(value: f64) -> Self {
        Self {
            class: ArrayClass::Double,
            dims: vec![1, 1],
            data: NumericData::Double(vec![value]),
        }
    }

    /// A 1xN row vector.
    pub fn row(data: impl Into<NumericData>) -> Self {
        let data = data.into();
        Self {
            class: data.default_class(),
            dims: vec![1, data.len()],
            data,
        }
    }

    /// The 0x0 double matrix.
    pub fn empty() -> Self {
        Self {
            class: ArrayClass::Double,
            dims: vec![0, 0],
            data: NumericData::Double(Vec::new()),
        }
    }

    /// Overrides the recorded class.
    pub fn with_class(mut self, class: ArrayClass) -> Self {
        self.class = class;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A 2-D sparse matrix in compressed sparse column (CSC) layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    pub nrows: usize,
    pub ncols: usize,
    /// Row index of every stored value, grouped by column.
    pub row_indices: Vec<usize>,
    /// `ncols + 1` offsets into `row_indices`/`values`.
    pub col_ptr: Vec<usize>,
    pub values: NumericData,
}

impl SparseMatrix {
    /// Builds a CSC matrix, validating pointer and index bounds.
    pub fn new(
        nrows: usize,
        ncols: usize,
        row_indices: Vec<usize>,
        col_ptr: Vec<usize>,
        values: impl Into<NumericData>,
    ) -> Result<Self> {
        let matrix = Self {
            nrows,
            ncols,
            row_indices,
            col_ptr,
            values: values.into(),
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Builds a CSC matrix from `(row, col, value)` triplets in any order.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        let mut sorted = triplets.to_vec();
        sorted.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        let mut col_ptr = vec![0usize; ncols + 1];
        for &(_, col, _) in &sorted {
            if col >= ncols {
                return Err(MatError::InvalidFormat(format!(
                    "sparse column {} out of range for {} columns",
                    col, ncols
                )));
            }
            col_ptr[col + 1] += 1;
        }
        for col in 0..ncols {
            col_ptr[col + 1] += col_ptr[col];
        }
        let row_indices = sorted.iter().map(|t| t.0).collect();
        let values: Vec<f64> = sorted.iter().map(|t| t.2).collect();
        Self::new(nrows, ncols, row_indices, col_ptr, values)
    }

    /// Number of stored values.
    pub fn nnz(&self) -> usize {
        self.col_ptr.last().copied().unwrap_or(0)
    }

    /// Checks the CSC invariants: pointer length, monotonic pointers and
    /// in-range row indices.
    pub fn validate(&self) -> Result<()> {
        if self.col_ptr.len() != self.ncols + 1 {
            return Err(MatError::ShapeMismatch {
                context: "sparse column pointers",
                expected: (self.ncols + 1) as u64,
                found: self.col_ptr.len() as u64,
            });
        }
        if self.col_ptr.first() != Some(&0) || self.col_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(MatError::InvalidFormat(
                "sparse column pointers must start at 0 and never decrease".to_string(),
            ));
        }
        let nnz = self.nnz();
        for (context, found) in [
            ("sparse row indices", self.row_indices.len()),
            ("sparse values", self.values.len()),
        ] {
            if found != nnz {
                return Err(MatError::ShapeMismatch {
                    context,
                    expected: nnz as u64,
                    found: found as u64,
                });
            }
        }
        if let Some(&row) = self.row_indices.iter().find(|&&r| r >= self.nrows) {
            return Err(MatError::InvalidFormat(format!(
                "sparse row index {} out of range for {} rows",
                row, self.nrows
            )));
        }
        Ok(())
    }

    /// Whether row indices ascend strictly within every column.
    pub fn has_sorted_indices(&self) -> bool {
        self.col_ptr.windows(2).all(|w| {
            self.row_indices[w[0]..w[1]].windows(2).all(|r| r[0] < r[1])
        })
    }

    /// Sorts row indices within each column, moving values along with them.
    pub fn sort_indices(&mut self) {
        if self.has_sorted_indices() {
            return;
        }
        let mut order: Vec<usize> = (0..self.row_indices.len()).collect();
        for w in self.col_ptr.windows(2) {
            order[w[0]..w[1]].sort_by_key(|&i| self.row_indices[i]);
        }
        self.row_indices = order.iter().map(|&i| self.row_indices[i]).collect();
        self.values = permute(&self.values, &order);
    }
}

fn permute(data: &NumericData, order: &[usize]) -> NumericData {
    macro_rules! pick {
        ($variant:ident, $v:expr) => {
            NumericData::$variant(order.iter().map(|&i| $v[i]).collect())
        };
    }
    match data {
        NumericData::Int8(v) => pick!(Int8, v),
        NumericData::UInt8(v) => pick!(UInt8, v),
        NumericData::Int16(v) => pick!(Int16, v),
        NumericData::UInt16(v) => pick!(UInt16, v),
        NumericData::Int32(v) => pick!(Int32, v),
        NumericData::UInt32(v) => pick!(UInt32, v),
        NumericData::Int64(v) => pick!(Int64, v),
        NumericData::UInt64(v) => pick!(UInt64, v),
        NumericData::Single(v) => pick!(Single, v),
        NumericData::Double(v) => pick!(Double, v),
        NumericData::Logical(v) => pick!(Logical, v),
        NumericData::ComplexSingle(v) => pick!(ComplexSingle, v),
        NumericData::ComplexDouble(v) => pick!(ComplexDouble, v),
    }
}

/// A character array stored column-major, one `char` per element.
#[derive(Debug, Clone, PartialEq)]
pub struct CharArray {
    pub dims: Vec<usize>,
    pub chars: Vec<char>,
}

impl CharArray {
    pub fn new(dims: Vec<usize>, chars: Vec<char>) -> Result<Self> {
        let dims = utils::normalize_dims(dims);
        let expected = utils::element_count(&dims)?;
        if expected != chars.len() {
            return Err(MatError::ShapeMismatch {
                context: "char array",
                expected: expected as u64,
                found: chars.len() as u64,
            });
        }
        Ok(Self { dims, chars })
    }

    /// A 1xN character row.
    pub fn from_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        Self {
            dims: vec![1, chars.len()],
            chars,
        }
    }

    /// A 2-D character matrix, one row per string, right-padded with spaces.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        let rows: Vec<Vec<char>> = rows.iter().map(|r| r.as_ref().chars().collect()).collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut chars = Vec::with_capacity(rows.len() * width);
        for col in 0..width {
            for row in &rows {
                chars.push(row.get(col).copied().unwrap_or(' '));
            }
        }
        Self {
            dims: vec![rows.len(), width],
            chars,
        }
    }

    /// Rows of a 2-D character matrix as strings.
    ///
    /// Higher-rank arrays are treated as `dims[0]` rows of all remaining
    /// columns.
    pub fn rows(&self) -> Vec<String> {
        let nrows = self.dims.first().copied().unwrap_or(0);
        if nrows == 0 {
            return Vec::new();
        }
        let ncols = self.chars.len() / nrows;
        (0..nrows)
            .map(|r| (0..ncols).map(|c| self.chars[c * nrows + r]).collect())
            .collect()
    }

    /// The characters in column-major order as a single string.
    pub fn to_text(&self) -> String {
        self.chars.iter().collect()
    }
}

/// A cell array: every slot holds an independent value.
#[derive(Debug, Clone, PartialEq)]
pub struct CellArray {
    pub dims: Vec<usize>,
    /// Slots in column-major order.
    pub cells: Vec<MatValue>,
}

impl CellArray {
    pub fn new(dims: Vec<usize>, cells: Vec<MatValue>) -> Result<Self> {
        let dims = utils::normalize_dims(dims);
        let expected = utils::element_count(&dims)?;
        if expected != cells.len() {
            return Err(MatError::ShapeMismatch {
                context: "cell array",
                expected: expected as u64,
                found: cells.len() as u64,
            });
        }
        Ok(Self { dims, cells })
    }

    /// A 1xN cell row.
    pub fn row(cells: Vec<MatValue>) -> Self {
        Self {
            dims: vec![1, cells.len()],
            cells,
        }
    }

    /// The slot at an N-d subscript.
    pub fn get(&self, index: &[usize]) -> Option<&MatValue> {
        utils::column_major_offset(&self.dims, index).and_then(|i| self.cells.get(i))
    }
}

/// An ordered field-name to value record, with an optional class name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub class_name: Option<String>,
    pub fields: Vec<(String, MatValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record of the named class.
    pub fn with_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            fields: Vec::new(),
        }
    }

    /// Sets a field, replacing an existing value of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<MatValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder form of [`Record::insert`].
    pub fn field(mut self, name: impl Into<String>, value: impl Into<MatValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MatValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// A struct array: every element shares the same ordered field names.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    pub dims: Vec<usize>,
    pub field_names: Vec<String>,
    /// Elements in column-major order.
    pub elements: Vec<Record>,
}

impl StructArray {
    pub fn new(dims: Vec<usize>, field_names: Vec<String>, elements: Vec<Record>) -> Result<Self> {
        let dims = utils::normalize_dims(dims);
        let expected = utils::element_count(&dims)?;
        if expected != elements.len() {
            return Err(MatError::ShapeMismatch {
                context: "struct array",
                expected: expected as u64,
                found: elements.len() as u64,
            });
        }
        Ok(Self {
            dims,
            field_names,
            elements,
        })
    }

    /// A 1x1 struct array holding `record`.
    pub fn from_record(record: Record) -> Self {
        Self {
            dims: vec![1, 1],
            field_names: record.fields.iter().map(|(n, _)| n.clone()).collect(),
            elements: vec![record],
        }
    }

    /// The element at an N-d subscript.
    pub fn get(&self, index: &[usize]) -> Option<&Record> {
        utils::column_major_offset(&self.dims, index).and_then(|i| self.elements.get(i))
    }
}

/// An object array: a struct array tagged with a class name.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectArray {
    pub class_name: String,
    pub array: StructArray,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_array_checks_shape() {
        assert!(NumericArray::new(vec![2, 2], vec![1.0f64, 2.0, 3.0]).is_err());
        let a = NumericArray::new(vec![3], vec![1i16, 2, 3]).unwrap();
        assert_eq!(a.dims, vec![1, 3]);
        assert_eq!(a.class, ArrayClass::Int16);
    }

    #[test]
    fn char_rows_are_column_major() {
        let c = CharArray::from_rows(&["ab", "c"]);
        assert_eq!(c.dims, vec![2, 2]);
        assert_eq!(c.chars, vec!['a', 'c', 'b', ' ']);
        assert_eq!(c.rows(), vec!["ab".to_string(), "c ".to_string()]);
    }

    #[test]
    fn sparse_sort_moves_values() {
        let mut s = SparseMatrix::new(3, 2, vec![2, 0, 1], vec![0, 2, 3], vec![20.0, 0.5, 11.0]).unwrap();
        assert!(!s.has_sorted_indices());
        s.sort_indices();
        assert_eq!(s.row_indices, vec![0, 2, 1]);
        assert_eq!(s.values, NumericData::Double(vec![0.5, 20.0, 11.0]));
    }

    #[test]
    fn sparse_from_triplets_builds_csc() {
        let s = SparseMatrix::from_triplets(2, 3, &[(1, 2, 5.0), (0, 0, 1.0), (1, 0, 2.0)]).unwrap();
        assert_eq!(s.col_ptr, vec![0, 2, 2, 3]);
        assert_eq!(s.row_indices, vec![0, 1, 1]);
        assert_eq!(s.nnz(), 3);
    }

    #[test]
    fn record_insert_replaces() {
        let mut r = Record::new().field("a", NumericArray::scalar(1.0));
        r.insert("a", NumericArray::scalar(2.0));
        assert_eq!(r.fields.len(), 1);
        assert_eq!(r.get("a"), Some(&MatValue::Numeric(NumericArray::scalar(2.0))));
    }

    #[test]
    fn indices_reject_fractions() {
        assert_eq!(NumericData::Int32(vec![0, 3]).to_indices("dims").unwrap(), vec![0, 3]);
        assert!(NumericData::Double(vec![1.5]).to_indices("dims").is_err());
        assert!(NumericData::Int32(vec![-1]).to_indices("dims").is_err());
    }
}
