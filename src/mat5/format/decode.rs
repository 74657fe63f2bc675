//! Matrix variant decoding.
//!
//! Once the array header is known, the class code selects one of six body
//! layouts. Cell, struct and object bodies are sequences of nested matrix
//! elements, so decoding recurses through [`ElementReader::read_matrix_element`].
//!
//! ```text
//! numeric:  real [imag]
//! sparse:   row indices, column pointers, real [imag]
//! char:     character data
//! cell:     prod(dims) x matrix
//! struct:   field name width, field names, prod(dims) x fields x matrix
//! object:   class name, then as struct
//! ```

use log::{debug, trace};

use crate::mat5::codec::text::TextCodec;
use crate::mat5::types::error::{MatError, Result};
use crate::mat5::types::models::ArrayClass;
use crate::mat5::types::value::{
    CellArray, CharArray, MatValue, NumericArray, NumericData, ObjectArray, Record,
    SparseMatrix, StructArray, Variable,
};
use crate::mat5::utils;

use super::array_header::{self, ArrayHeader};
use super::element::{Element, ElementReader, RawElement};
use super::tables;

/// Upper bound on the records of a struct array without fields. Such records
/// consume no bytes, so their count cannot be checked against the stream.
const MAX_FIELDLESS_RECORDS: usize = 1 << 20;

/// Decodes a matrix element's payload into a variable.
pub fn read_matrix(reader: &mut ElementReader<'_>, byte_count: usize) -> Result<Variable> {
    let header = array_header::read_header(reader, byte_count)?;
    let value = if header.is_empty_matrix {
        MatValue::Numeric(NumericArray::empty())
    } else {
        match header.class {
            ArrayClass::Cell => MatValue::Cell(read_cell(reader, &header)?),
            ArrayClass::Struct => MatValue::Struct(read_struct(reader, &header, None)?),
            ArrayClass::Object => MatValue::Object(read_object(reader, &header)?),
            ArrayClass::Char => MatValue::Char(read_char(reader, &header)?),
            ArrayClass::Sparse => MatValue::Sparse(read_sparse(reader, &header)?),
            _ => MatValue::Numeric(read_numeric(reader, &header)?),
        }
    };
    debug!(
        "Decoded {} '{}' with dims {:?}",
        value.kind_name(),
        header.name,
        header.dims
    );
    Ok(Variable {
        name: header.name,
        is_global: header.is_global,
        value,
    })
}

/// Reads the real part, and the imaginary part for complex arrays.
fn read_values(
    reader: &mut ElementReader<'_>,
    is_complex: bool,
    context: &'static str,
) -> Result<NumericData> {
    if !is_complex {
        return reader.read_numeric(context);
    }
    let re = reader.read_raw()?;
    let im = reader.read_raw()?;
    combine(reader, re, im, context)
}

fn combine(
    reader: &ElementReader<'_>,
    re: RawElement<'_>,
    im: RawElement<'_>,
    context: &'static str,
) -> Result<NumericData> {
    let re_kind = tables::numeric_kind(re.wire_type()?)
        .ok_or(MatError::UnsupportedWireType(re.tag.wire_type))?;
    let im_kind = tables::numeric_kind(im.wire_type()?)
        .ok_or(MatError::UnsupportedWireType(im.tag.wire_type))?;
    let re_len = re.payload.len() / re_kind.width();
    let im_len = im.payload.len() / im_kind.width();
    if re_len != im_len {
        return Err(MatError::ShapeMismatch {
            context,
            expected: re_len as u64,
            found: im_len as u64,
        });
    }
    Ok(tables::combine_complex(
        (re_kind, re.payload),
        (im_kind, im.payload),
        reader.table().endian(),
    ))
}

fn read_numeric(reader: &mut ElementReader<'_>, header: &ArrayHeader) -> Result<NumericArray> {
    let data = read_values(reader, header.is_complex, "numeric data")?;
    let data = if header.is_logical {
        data.to_logical()
    } else if reader.settings().mat_dtype {
        match tables::class_kind(header.class) {
            Some(kind) => data.cast(kind),
            None => data,
        }
    } else {
        data
    };
    let expected = utils::element_count(&header.dims)?;
    if data.len() != expected {
        return Err(MatError::ShapeMismatch {
            context: "numeric array",
            expected: expected as u64,
            found: data.len() as u64,
        });
    }
    Ok(NumericArray {
        class: header.class,
        dims: header.dims.clone(),
        data,
    })
}

fn read_sparse(reader: &mut ElementReader<'_>, header: &ArrayHeader) -> Result<SparseMatrix> {
    if header.dims.len() != 2 {
        return Err(MatError::InvalidFormat(format!(
            "sparse matrix must be 2-D, found dims {:?}",
            header.dims
        )));
    }
    let (nrows, ncols) = (header.dims[0], header.dims[1]);
    let mut row_indices = reader
        .read_numeric("sparse row indices")?
        .to_indices("sparse row indices")?;
    let mut col_ptr = reader
        .read_numeric("sparse column pointers")?
        .to_indices("sparse column pointers")?;
    let mut values = read_values(reader, header.is_complex, "sparse values")?;

    // Storage may be allocated up to nzmax; only col_ptr[ncols] entries are real.
    if col_ptr.len() < ncols + 1 {
        return Err(MatError::ShapeMismatch {
            context: "sparse column pointers",
            expected: (ncols + 1) as u64,
            found: col_ptr.len() as u64,
        });
    }
    col_ptr.truncate(ncols + 1);
    let nnz = col_ptr[ncols];
    for (context, found) in [
        ("sparse row indices", row_indices.len()),
        ("sparse values", values.len()),
    ] {
        if found < nnz {
            return Err(MatError::ShapeMismatch {
                context,
                expected: nnz as u64,
                found: found as u64,
            });
        }
    }
    row_indices.truncate(nnz);
    values.truncate(nnz);
    trace!(
        "Sparse {}x{}: nnz={}, nzmax={}",
        nrows, ncols, nnz, header.nzmax
    );

    if header.is_logical {
        values = values.to_logical();
    }
    SparseMatrix::new(nrows, ncols, row_indices, col_ptr, values)
}

fn read_char(reader: &mut ElementReader<'_>, header: &ArrayHeader) -> Result<CharArray> {
    let text = match reader.read_element()? {
        Element::Text(text) => text,
        Element::Numeric(NumericData::UInt16(units)) => {
            reader.table().uint16_codec().decode_units(&units)?
        }
        Element::Numeric(NumericData::UInt8(bytes)) => TextCodec::Ascii.decode(&bytes)?,
        Element::Numeric(data @ NumericData::Int8(_)) => {
            TextCodec::Ascii.decode(&data.to_bytes().unwrap_or_default())?
        }
        Element::Numeric(other) => {
            return Err(MatError::InvalidFormat(format!(
                "character data stored as {:?} values",
                other.kind()
            )));
        }
        Element::Matrix(_) => {
            return Err(MatError::InvalidFormat(
                "character data stored as a matrix".to_string(),
            ));
        }
    };
    CharArray::new(header.dims.clone(), text.chars().collect())
}

fn read_cell(reader: &mut ElementReader<'_>, header: &ArrayHeader) -> Result<CellArray> {
    let count = utils::element_count(&header.dims)?;
    // Every slot needs at least one 8-byte tag; cap the reservation accordingly.
    let mut cells = Vec::with_capacity(count.min(reader.remaining() / 8));
    for _ in 0..count {
        cells.push(reader.read_matrix_element()?.value);
    }
    Ok(CellArray {
        dims: header.dims.clone(),
        cells,
    })
}

/// Reads the field-name table: name width, then the NUL-padded names.
fn read_field_names(reader: &mut ElementReader<'_>) -> Result<Vec<String>> {
    let width = reader
        .read_numeric("field name length")?
        .to_indices("field name length")?
        .first()
        .copied()
        .ok_or_else(|| MatError::InvalidFormat("empty field name length".to_string()))?;
    let blob = reader.read_name_bytes("field names")?;
    if blob.is_empty() {
        return Ok(Vec::new());
    }
    if width == 0 {
        return Err(MatError::InvalidFormat(
            "field names present but name length is zero".to_string(),
        ));
    }
    Ok(blob
        .chunks(width)
        .map(|chunk| {
            String::from_utf8_lossy(chunk)
                .trim_matches('\0')
                .to_string()
        })
        .collect())
}

fn read_struct(
    reader: &mut ElementReader<'_>,
    header: &ArrayHeader,
    class_name: Option<&str>,
) -> Result<StructArray> {
    let field_names = read_field_names(reader)?;
    trace!("Struct fields: {:?}", field_names);
    let count = utils::element_count(&header.dims)?;
    // Every field of every record is a tagged matrix of at least 8 bytes.
    let limit = if field_names.is_empty() {
        MAX_FIELDLESS_RECORDS
    } else {
        reader.remaining() / (8 * field_names.len())
    };
    if count > limit {
        return Err(MatError::ShapeMismatch {
            context: "struct records",
            expected: count as u64,
            found: limit as u64,
        });
    }
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        let mut fields = Vec::with_capacity(field_names.len());
        for name in &field_names {
            fields.push((name.clone(), reader.read_matrix_element()?.value));
        }
        elements.push(Record {
            class_name: class_name.map(str::to_string),
            fields,
        });
    }
    Ok(StructArray {
        dims: header.dims.clone(),
        field_names,
        elements,
    })
}

fn read_object(reader: &mut ElementReader<'_>, header: &ArrayHeader) -> Result<ObjectArray> {
    let class_name = reader.read_string("class name")?;
    let array = read_struct(reader, header, Some(class_name.as_str()))?;
    Ok(ObjectArray { class_name, array })
}
