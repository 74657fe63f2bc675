//! Deciding how a heterogeneous container is written.
//!
//! A cell whose slots are all records sharing one field-name signature (and
//! one class name, if any) is written as a struct or object array. Anything
//! else stays a cell, and every slot is written as its own element.

use std::collections::HashSet;

use crate::mat5::types::error::{MatError, Result};
use crate::mat5::types::value::{MatValue, Record};

/// What a single slot would be written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    /// Any non-record value.
    Array,
    Struct { field_names: Vec<String> },
    Object { class_name: String, field_names: Vec<String> },
    /// A record whose field names cannot be written.
    Invalid,
}

/// How the whole container is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerKind {
    Cell,
    Struct { field_names: Vec<String> },
    Object { class_name: String, field_names: Vec<String> },
}

/// Per-slot kinds together with the resulting container kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub slots: Vec<SlotKind>,
    pub container: ContainerKind,
}

/// Checks that `names` can be stored in a field-name table: non-empty,
/// unique and free of NUL bytes.
pub fn validate_field_names<S: AsRef<str>>(names: &[S]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(MatError::InvalidFieldName("empty field name".to_string()));
        }
        if name.contains('\0') {
            return Err(MatError::InvalidFieldName(format!(
                "field name {:?} contains NUL",
                name
            )));
        }
        if !seen.insert(name) {
            return Err(MatError::InvalidFieldName(format!(
                "duplicate field name {:?}",
                name
            )));
        }
    }
    Ok(())
}

/// Tags one slot.
pub fn classify_slot(value: &MatValue) -> SlotKind {
    match value {
        MatValue::Record(record) => classify_record(record),
        _ => SlotKind::Array,
    }
}

fn classify_record(record: &Record) -> SlotKind {
    let field_names: Vec<String> = record.fields.iter().map(|(n, _)| n.clone()).collect();
    if validate_field_names(&field_names).is_err() {
        return SlotKind::Invalid;
    }
    match &record.class_name {
        Some(class_name) => SlotKind::Object {
            class_name: class_name.clone(),
            field_names,
        },
        None => SlotKind::Struct { field_names },
    }
}

/// Classifies every slot and picks the container kind.
///
/// An empty slice is a cell.
pub fn classify(values: &[MatValue]) -> Classification {
    let slots: Vec<SlotKind> = values.iter().map(classify_slot).collect();
    let container = match slots.split_first() {
        Some((first, rest)) if rest.iter().all(|slot| slot == first) => match first {
            SlotKind::Struct { field_names } => ContainerKind::Struct {
                field_names: field_names.clone(),
            },
            SlotKind::Object {
                class_name,
                field_names,
            } => ContainerKind::Object {
                class_name: class_name.clone(),
                field_names: field_names.clone(),
            },
            SlotKind::Array | SlotKind::Invalid => ContainerKind::Cell,
        },
        _ => ContainerKind::Cell,
    };
    Classification { slots, container }
}
