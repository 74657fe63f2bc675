use mat5::{MatReader, MatValue, ReadOptions};
use std::env;

fn describe(value: &MatValue) -> String {
    let dims: Vec<String> = value.dims().iter().map(|d| d.to_string()).collect();
    let shape = dims.join("x");
    match value {
        MatValue::Numeric(a) => format!("{} {} ({:?})", shape, a.class, a.data.kind()),
        MatValue::Sparse(s) => format!("{} sparse, {} non-zeros", shape, s.nnz()),
        MatValue::Char(c) => format!("{} char {:?}", shape, c.to_text()),
        MatValue::Cell(_) => format!("{} cell", shape),
        MatValue::Struct(s) => format!("{} struct [{}]", shape, s.field_names.join(", ")),
        MatValue::Object(o) => format!(
            "{} object '{}' [{}]",
            shape,
            o.class_name,
            o.array.field_names.join(", ")
        ),
        MatValue::Record(r) => format!("record [{}]", r.field_names().join(", ")),
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <path-to-mat-file> [--uint16-codec <LABEL>] [--mat-dtype]", args[0]);
        std::process::exit(1);
    }

    let mat_path = &args[1];
    let mut options = ReadOptions::default();
    // Parse --uint16-codec argument
    if let Some(idx) = args.iter().position(|arg| arg == "--uint16-codec") {
        match args.get(idx + 1) {
            Some(label) => options.uint16_codec = Some(label.clone()),
            None => {
                eprintln!("ERROR: --uint16-codec flag requires an argument.");
                std::process::exit(1);
            }
        }
    }
    options.mat_dtype = args.iter().any(|arg| arg == "--mat-dtype");

    println!("Reading MAT-file: {}", mat_path);
    println!("{}", "=".repeat(60));

    let mut reader = match MatReader::open(mat_path, options) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("\nERROR: Failed to open MAT-file");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let header = reader.header().clone();
    println!("\nFile Information:");
    println!("  Description: {}", header.description);
    println!("  Version: {}", header.version());
    println!("  Byte order: {}", header.byte_order);

    println!("\nVariables:");
    let mut count = 0;
    for result in reader.variables() {
        match result {
            Ok(variable) => {
                count += 1;
                let global = if variable.is_global { " (global)" } else { "" };
                println!("  {}. {}{}: {}", count, variable.name, global, describe(&variable.value));
            }
            Err(e) => {
                eprintln!("\nERROR: Failed to read variable {}", count + 1);
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        }
    }
    println!("\n{} variables read.", count);
}
