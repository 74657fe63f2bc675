use mat5::{
    ArrayClass, CellArray, CharArray, Endian, MatReader, MatValue, MatWriter, NumericArray,
    NumericData, ObjectArray, ReadOptions, Record, SparseMatrix, StructArray, Variable,
    WriteOptions,
};
use num_complex::{Complex32, Complex64};
use std::io::Cursor;

fn write(variables: &[(&str, MatValue)], options: WriteOptions) -> Vec<u8> {
    let mut writer = MatWriter::new(Vec::new(), options).unwrap();
    writer
        .put_variables(variables.iter().map(|(name, value)| (*name, value)))
        .unwrap();
    writer.finish().unwrap()
}

fn read(bytes: Vec<u8>, options: ReadOptions) -> Vec<Variable> {
    MatReader::new(Cursor::new(bytes), options)
        .unwrap()
        .read_all()
        .unwrap()
}

fn options(byte_order: Endian, compress: bool) -> WriteOptions {
    WriteOptions {
        byte_order,
        compress,
        description: Some("MATLAB 5.0 MAT-file, round trip test".to_string()),
        ..WriteOptions::default()
    }
}

fn scalar(value: f64) -> MatValue {
    MatValue::Numeric(NumericArray::scalar(value))
}

fn text(value: &str) -> MatValue {
    MatValue::Char(CharArray::from_text(value))
}

/// One value of every kind that reads back unchanged.
fn sample_variables() -> Vec<(&'static str, MatValue)> {
    let point = |x: f64, y: f64| {
        Record::with_class("Point")
            .field("x", NumericArray::scalar(x))
            .field("y", NumericArray::scalar(y))
    };
    vec![
        (
            "double_matrix",
            NumericArray::new(vec![2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])
                .unwrap()
                .into(),
        ),
        ("int8_row", NumericArray::row(vec![-128i8, 0, 127]).into()),
        ("uint8_row", NumericArray::row(vec![0u8, 255]).into()),
        ("int16_row", NumericArray::row(vec![-300i16, 300]).into()),
        ("uint16_row", NumericArray::row(vec![65535u16]).into()),
        ("int32_col", NumericArray::new(vec![3, 1], vec![i32::MIN, 0, i32::MAX]).unwrap().into()),
        ("uint32_row", NumericArray::row(vec![u32::MAX, 7]).into()),
        ("single_row", NumericArray::row(vec![1.5f32, -2.25]).into()),
        (
            "logical_square",
            NumericArray::new(vec![2, 2], vec![true, false, false, true])
                .unwrap()
                .into(),
        ),
        (
            "complex_double",
            NumericArray::row(vec![Complex64::new(1.0, -1.0), Complex64::new(0.0, 2.5)]).into(),
        ),
        (
            "complex_single",
            NumericArray::row(vec![Complex32::new(3.0, 4.0)]).into(),
        ),
        (
            "cube",
            NumericArray::new(vec![2, 2, 2], (0..8).map(f64::from).collect::<Vec<_>>())
                .unwrap()
                .into(),
        ),
        ("empty", NumericArray::empty().into()),
        (
            "sparse",
            SparseMatrix::from_triplets(4, 3, &[(0, 0, 1.0), (3, 0, 2.0), (1, 2, -5.0)])
                .unwrap()
                .into(),
        ),
        (
            "sparse_empty",
            SparseMatrix::from_triplets(2, 2, &[]).unwrap().into(),
        ),
        (
            "sparse_complex",
            SparseMatrix::new(
                2,
                2,
                vec![1],
                vec![0, 0, 1],
                vec![Complex64::new(1.0, 2.0)],
            )
            .unwrap()
            .into(),
        ),
        (
            "sparse_logical",
            SparseMatrix::new(2, 1, vec![0, 1], vec![0, 2], vec![true, true])
                .unwrap()
                .into(),
        ),
        ("greeting", text("hello world")),
        ("blank", text("")),
        ("names", CharArray::from_rows(&["alice", "bob"]).into()),
        (
            "mixed_cell",
            CellArray::new(
                vec![2, 2],
                vec![
                    scalar(1.0),
                    text("two"),
                    MatValue::Cell(CellArray::row(vec![scalar(3.0)])),
                    NumericArray::empty().into(),
                ],
            )
            .unwrap()
            .into(),
        ),
        ("empty_cell", CellArray::new(vec![0, 0], Vec::new()).unwrap().into()),
        (
            "people",
            StructArray::new(
                vec![1, 2],
                vec!["name".to_string(), "age".to_string()],
                vec![
                    Record::new().field("name", text("ann")).field("age", scalar(31.0)),
                    Record::new().field("name", text("ben")).field("age", scalar(42.0)),
                ],
            )
            .unwrap()
            .into(),
        ),
        (
            "no_fields",
            StructArray::new(vec![1, 1], Vec::new(), vec![Record::new()])
                .unwrap()
                .into(),
        ),
        (
            "points",
            ObjectArray {
                class_name: "Point".to_string(),
                array: StructArray::new(
                    vec![2, 1],
                    vec!["x".to_string(), "y".to_string()],
                    vec![point(0.0, 1.0), point(2.0, 3.0)],
                )
                .unwrap(),
            }
            .into(),
        ),
    ]
}

fn assert_round_trip(byte_order: Endian, compress: bool) {
    let variables = sample_variables();
    let decoded = read(write(&variables, options(byte_order, compress)), ReadOptions::default());
    assert_eq!(decoded.len(), variables.len());
    for ((name, value), variable) in variables.iter().zip(&decoded) {
        assert_eq!(variable.name, *name);
        assert!(!variable.is_global);
        assert_eq!(&variable.value, value, "variable {}", name);
    }
}

#[test]
fn round_trip_little_endian() {
    assert_round_trip(Endian::Little, false);
}

#[test]
fn round_trip_big_endian() {
    assert_round_trip(Endian::Big, false);
}

#[test]
fn round_trip_compressed() {
    assert_round_trip(Endian::Little, true);
    assert_round_trip(Endian::Big, true);
}

#[test]
fn wide_integers_read_back_as_double() {
    let variables = [
        ("i64", MatValue::from(NumericArray::row(vec![-3i64, 1 << 40]))),
        ("u64", MatValue::from(NumericArray::row(vec![9u64]))),
    ];
    let decoded = read(write(&variables, options(Endian::Little, false)), ReadOptions::default());
    let first = decoded[0].value.as_numeric().unwrap();
    assert_eq!(first.class, ArrayClass::Double);
    assert_eq!(first.data, NumericData::Double(vec![-3.0, (1u64 << 40) as f64]));
    assert_eq!(
        decoded[1].value.as_numeric().unwrap().data,
        NumericData::Double(vec![9.0])
    );
}

#[test]
fn bare_record_reads_back_as_struct() {
    let record = Record::new().field("a", scalar(1.0)).field("b", text("x"));
    let decoded = read(
        write(&[("r", record.clone().into())], options(Endian::Little, false)),
        ReadOptions::default(),
    );
    assert_eq!(decoded[0].value, MatValue::Struct(StructArray::from_record(record)));
}

#[test]
fn classed_record_reads_back_as_object() {
    let record = Record::with_class("Counter").field("n", scalar(5.0));
    let decoded = read(
        write(&[("c", record.clone().into())], options(Endian::Big, false)),
        ReadOptions::default(),
    );
    let object = decoded[0].value.as_object().unwrap();
    assert_eq!(object.class_name, "Counter");
    assert_eq!(object.array.dims, vec![1, 1]);
    assert_eq!(object.array.elements, vec![record]);
}

#[test]
fn missing_struct_fields_become_empty_matrices() {
    let array = StructArray {
        dims: vec![1, 2],
        field_names: vec!["a".to_string(), "b".to_string()],
        elements: vec![
            Record::new().field("a", scalar(1.0)).field("b", scalar(2.0)),
            Record::new().field("a", scalar(3.0)),
        ],
    };
    let decoded = read(
        write(&[("s", array.into())], options(Endian::Little, false)),
        ReadOptions::default(),
    );
    let s = decoded[0].value.as_struct().unwrap();
    assert_eq!(s.elements[1].get("a"), Some(&scalar(3.0)));
    assert_eq!(
        s.elements[1].get("b"),
        Some(&MatValue::Numeric(NumericArray::empty()))
    );
}

#[test]
fn uniform_records_in_cell_become_struct_array() {
    for dims in [vec![2, 1], vec![1, 2]] {
        let first = Record::new().field("id", scalar(1.0)).field("tag", text("a"));
        let second = Record::new().field("id", scalar(2.0)).field("tag", text("b"));
        let cell = CellArray::new(
            dims.clone(),
            vec![first.clone().into(), second.clone().into()],
        )
        .unwrap();
        let decoded = read(
            write(&[("cell", cell.into())], options(Endian::Little, false)),
            ReadOptions::default(),
        );
        let s = decoded[0].value.as_struct().expect("written as a struct array");
        assert_eq!(s.dims, dims);
        assert_eq!(s.field_names, vec!["id".to_string(), "tag".to_string()]);
        assert_eq!(s.elements, vec![first.clone(), second.clone()]);
        let last = if dims[0] == 2 { [1, 0] } else { [0, 1] };
        assert_eq!(s.get(&last), Some(&second));
        assert_eq!(s.get(&[0, 0]), Some(&first));
    }
}

#[test]
fn struct_of_cells_keeps_element_order() {
    let cell_of = |base: f64| {
        MatValue::Cell(CellArray::row(vec![
            scalar(base),
            scalar(base + 1.0),
            scalar(base + 2.0),
        ]))
    };
    for dims in [vec![2, 1], vec![1, 2]] {
        let elements = vec![
            Record::new().field("data", cell_of(10.0)),
            Record::new().field("data", cell_of(20.0)),
        ];
        let array = StructArray::new(dims.clone(), vec!["data".to_string()], elements).unwrap();
        for (byte_order, compress) in [(Endian::Little, false), (Endian::Big, true)] {
            let decoded = read(
                write(&[("s", array.clone().into())], options(byte_order, compress)),
                ReadOptions::default(),
            );
            let s = decoded[0].value.as_struct().unwrap();
            assert_eq!(s.dims, dims);
            assert_eq!(s, &array);

            let second = if dims[0] == 2 { [1, 0] } else { [0, 1] };
            for (index, base) in [([0, 0], 10.0), (second, 20.0)] {
                let cell = s.get(&index).unwrap().get("data").unwrap().as_cell().unwrap();
                assert_eq!(cell.dims, vec![1, 3]);
                for k in 0..3 {
                    assert_eq!(cell.get(&[0, k]), Some(&scalar(base + k as f64)));
                }
            }
        }
    }
}

#[test]
fn uniform_classed_records_in_cell_become_object_array() {
    let item = |v: f64| MatValue::Record(Record::with_class("Item").field("v", scalar(v)));
    let cell = CellArray::row(vec![item(1.0), item(2.0), item(3.0)]);
    let decoded = read(
        write(&[("items", cell.into())], options(Endian::Little, true)),
        ReadOptions::default(),
    );
    let object = decoded[0].value.as_object().unwrap();
    assert_eq!(object.class_name, "Item");
    assert_eq!(object.array.dims, vec![1, 3]);
    assert_eq!(object.array.elements[2].get("v"), Some(&scalar(3.0)));
}

#[test]
fn mixed_records_fall_back_to_cell() {
    let a = Record::new().field("a", scalar(1.0));
    let b = Record::new().field("b", scalar(2.0));
    let cell = CellArray::row(vec![a.clone().into(), b.clone().into(), scalar(3.0)]);
    let decoded = read(
        write(&[("mixed", cell.into())], options(Endian::Little, false)),
        ReadOptions::default(),
    );
    let cell = decoded[0].value.as_cell().expect("kept as a cell");
    assert_eq!(cell.dims, vec![1, 3]);
    assert_eq!(cell.cells[0], MatValue::Struct(StructArray::from_record(a)));
    assert_eq!(cell.cells[1], MatValue::Struct(StructArray::from_record(b)));
    assert_eq!(cell.cells[2], scalar(3.0));
}

#[test]
fn global_flag_follows_options() {
    let opts = WriteOptions {
        global_vars: vec!["shared".to_string()],
        ..options(Endian::Little, false)
    };
    let decoded = read(
        write(&[("shared", scalar(1.0)), ("local", scalar(2.0))], opts),
        ReadOptions::default(),
    );
    assert!(decoded[0].is_global);
    assert!(!decoded[1].is_global);
}

#[test]
fn unicode_strings_use_utf8() {
    let opts = WriteOptions {
        unicode_strings: true,
        ..options(Endian::Big, false)
    };
    let decoded = read(write(&[("s", text("naïve ☃"))], opts), ReadOptions::default());
    assert_eq!(decoded[0].value, text("naïve ☃"));

    let mut writer = MatWriter::new(Vec::new(), options(Endian::Big, false)).unwrap();
    assert!(writer.put("s", CharArray::from_text("naïve")).is_err());
}

#[test]
fn unsorted_sparse_is_sorted_on_write() {
    let unsorted = SparseMatrix::new(3, 1, vec![2, 0], vec![0, 2], vec![20.0, 1.0]).unwrap();
    let decoded = read(
        write(&[("s", unsorted.into())], options(Endian::Little, false)),
        ReadOptions::default(),
    );
    let s = decoded[0].value.as_sparse().unwrap();
    assert_eq!(s.row_indices, vec![0, 2]);
    assert_eq!(s.values, NumericData::Double(vec![1.0, 20.0]));
}

#[test]
fn mat_dtype_casts_to_declared_class() {
    let array = NumericArray::row(vec![1.0f64, 200.0]).with_class(ArrayClass::UInt8);
    let bytes = write(&[("small", array.into())], options(Endian::Little, false));

    let plain = read(bytes.clone(), ReadOptions::default());
    let plain = plain[0].value.as_numeric().unwrap();
    assert_eq!(plain.class, ArrayClass::UInt8);
    assert_eq!(plain.data, NumericData::Double(vec![1.0, 200.0]));

    let cast = read(
        bytes,
        ReadOptions {
            mat_dtype: true,
            ..ReadOptions::default()
        },
    );
    assert_eq!(
        cast[0].value.as_numeric().unwrap().data,
        NumericData::UInt8(vec![1, 200])
    );
}

#[test]
fn file_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.mat");
    let mut writer = MatWriter::create(&path, options(Endian::Big, true)).unwrap();
    writer.put("x", NumericArray::scalar(42.0)).unwrap();
    writer.put("label", CharArray::from_text("disk")).unwrap();
    writer.finish().unwrap();

    let mut reader = MatReader::open(&path, ReadOptions::default()).unwrap();
    assert_eq!(reader.header().byte_order, Endian::Big);
    assert_eq!(reader.header().description, "MATLAB 5.0 MAT-file, round trip test");
    let names: Vec<String> = reader
        .variables()
        .map(|v| v.unwrap().name)
        .collect();
    assert_eq!(names, vec!["x".to_string(), "label".to_string()]);
}

#[test]
fn duplicate_names_are_kept_in_order() {
    let decoded = read(
        write(&[("x", scalar(1.0)), ("x", scalar(2.0))], options(Endian::Little, false)),
        ReadOptions::default(),
    );
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[1].value, scalar(2.0));
}
