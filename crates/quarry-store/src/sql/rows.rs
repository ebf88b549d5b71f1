//! Column lists, parameter conversion and row decoding

use quarry_core::model::{Entity, FieldDef, FieldType};
use quarry_core::{Record, ScalarValue};
use rusqlite::types::{Value, ValueRef};
use rusqlite::Row;

/// `t0.id, t0.name, ...` in schema field order
pub(crate) fn column_list(entity: Entity, alias: &str) -> String {
    entity
        .fields()
        .iter()
        .map(|f| format!("{}.{}", alias, f.column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Booleans are stored as 0/1
pub(crate) fn to_sql(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Null => Value::Null,
        ScalarValue::Bool(b) => Value::Integer(i64::from(*b)),
        ScalarValue::Int(i) => Value::Integer(*i),
        ScalarValue::Float(f) => Value::Real(*f),
        ScalarValue::Text(s) => Value::Text(s.clone()),
    }
}

/// Decode one column according to the field's declared type
pub(crate) fn read_scalar(row: &Row<'_>, idx: usize, def: &FieldDef) -> rusqlite::Result<ScalarValue> {
    let value = match row.get_ref(idx)? {
        ValueRef::Null => ScalarValue::Null,
        ValueRef::Integer(i) if def.ty == FieldType::Bool => ScalarValue::Bool(i != 0),
        ValueRef::Integer(i) => ScalarValue::Int(i),
        ValueRef::Real(f) => ScalarValue::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            ScalarValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    };
    Ok(value)
}

/// Decode the columns produced by [`column_list`], starting at `offset`
pub(crate) fn read_record(entity: Entity, row: &Row<'_>, offset: usize) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (i, def) in entity.fields().iter().enumerate() {
        let value = read_scalar(row, offset + i, def)?;
        record.set_scalar(def.name, &value);
    }
    Ok(record)
}
