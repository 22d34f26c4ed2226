//! Raw API records to typed columns.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};
use crate::fetch::RawRecordSet;
use crate::schema::{FieldType, ObjectSpec};

/// Per-record metadata the REST API attaches to every row.
pub const ENVELOPE_FIELD: &str = "attributes";

/// Longest value text quoted in a coercion error.
const VALUE_PREVIEW_LEN: usize = 80;

/// A typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

/// One column of a [`TypedTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub field_type: FieldType,
    pub values: Vec<Scalar>,
}

/// Records of one object coerced to their declared types.
///
/// Columns follow the descriptor's field order; rows keep API order.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedTable {
    object: String,
    columns: Vec<Column>,
    num_rows: usize,
}

impl TypedTable {
    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Coerce every record of `spec`'s object into a [`TypedTable`].
///
/// The envelope field is dropped first. Each record must then carry
/// exactly the declared fields (compared ignoring case); any missing or
/// extra column, or any value that does not fit its declared type, fails
/// the whole object.
pub fn coerce_records(spec: &ObjectSpec, records: RawRecordSet) -> Result<TypedTable> {
    let types = spec.field_types()?;

    let lookup: HashMap<String, usize> = spec
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| (field.name.to_ascii_lowercase(), idx))
        .collect();

    let num_rows = records.len();
    let mut columns: Vec<Column> = spec
        .fields
        .iter()
        .zip(&types)
        .map(|(field, ty)| Column {
            name: field.name.clone(),
            field_type: *ty,
            values: Vec::with_capacity(num_rows),
        })
        .collect();

    for mut record in records {
        record.remove(ENVELOPE_FIELD);

        let mut slots: Vec<Option<Value>> = vec![None; columns.len()];
        let mut unexpected = Vec::new();
        for (key, value) in record {
            match lookup.get(&key.to_ascii_lowercase()) {
                Some(&idx) if slots[idx].is_none() => slots[idx] = Some(value),
                _ => unexpected.push(key),
            }
        }

        let missing: Vec<String> = slots
            .iter()
            .zip(&columns)
            .filter(|(slot, _)| slot.is_none())
            .map(|(_, column)| column.name.clone())
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(Error::new(ErrorKind::ColumnMismatch {
                object: spec.name.clone(),
                missing,
                unexpected,
            }));
        }

        for (column, value) in columns.iter_mut().zip(slots.into_iter().flatten()) {
            let cell = coerce_value(&column.name, value, column.field_type)?;
            column.values.push(cell);
        }
    }

    Ok(TypedTable {
        object: spec.name.clone(),
        columns,
        num_rows,
    })
}

/// Coerce one raw value to `ty`. Null is accepted for every type.
pub fn coerce_value(field: &str, value: Value, ty: FieldType) -> Result<Scalar> {
    if value.is_null() {
        return Ok(Scalar::Null);
    }

    let coerced = match ty {
        FieldType::String => Some(Scalar::String(match value {
            Value::String(ref s) => s.clone(),
            Value::Number(ref n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            ref nested => nested.to_string(),
        })),
        FieldType::Integer => as_integer(&value).map(Scalar::Integer),
        FieldType::Float => as_float(&value).map(Scalar::Float),
        FieldType::Boolean => as_boolean(&value).map(Scalar::Boolean),
        FieldType::Date => value.as_str().and_then(parse_date).map(Scalar::Date),
        FieldType::DateTime => value.as_str().and_then(parse_datetime).map(Scalar::DateTime),
    };

    coerced.ok_or_else(|| {
        Error::new(ErrorKind::Coercion {
            field: field.to_string(),
            value: preview(&value),
            expected: ty.to_string(),
        })
    })
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    // i64::MAX is not representable as f64; the bound is exclusive
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
}

/// RFC 3339, the API's `2024-01-15T10:30:00.000+0000` form, or a bare date
/// taken as midnight UTC.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

fn preview(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= VALUE_PREVIEW_LEN {
        return text;
    }
    let mut cut: String = text.chars().take(VALUE_PREVIEW_LEN).collect();
    cut.push_str("...");
    cut
}
