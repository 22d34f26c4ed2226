//! Object descriptors: which fields to pull from which object, and as what type.
//!
//! The descriptor file is a JSON array:
//!
//! ```json
//! [
//!   {
//!     "obj_api_name": "Account",
//!     "fields": [
//!       { "field_api_name": "Id", "type": "str" },
//!       { "field_api_name": "AnnualRevenue", "type": "float" }
//!     ]
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use busbar_sf_client::security::soql;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, ErrorKind, Result};

/// Column type a field is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type tag exactly as written in the descriptor file.
///
/// Tags are resolved lazily so that an unrecognised tag only fails the
/// object that uses it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Map the tag to a coercion target. Matching is case-insensitive.
    pub fn resolve(&self) -> Option<FieldType> {
        let tag = self.0.trim().to_ascii_lowercase();
        let ty = match tag.as_str() {
            "str" | "string" | "object" | "text" => FieldType::String,
            "int" | "int32" | "int64" | "integer" | "long" => FieldType::Integer,
            "float" | "float32" | "float64" | "double" | "decimal" | "number" => FieldType::Float,
            "bool" | "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "datetime" | "datetime64" | "datetime64[ns]" | "timestamp" => FieldType::DateTime,
            _ => return None,
        };
        Some(ty)
    }
}

/// One field to select, with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "field_api_name", deserialize_with = "trimmed")]
    pub name: String,
    #[serde(rename = "type", alias = "declared_type")]
    pub type_tag: TypeTag,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: TypeTag::new(type_tag),
        }
    }

    pub fn field_type(&self) -> Result<FieldType> {
        self.type_tag.resolve().ok_or_else(|| {
            Error::new(ErrorKind::UnknownType {
                field: self.name.clone(),
                tag: self.type_tag.as_str().to_string(),
            })
        })
    }
}

/// One object to export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectSpec {
    #[serde(rename = "obj_api_name", alias = "object_api_name")]
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl ObjectSpec {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Resolve every declared tag, in field order.
    pub fn field_types(&self) -> Result<Vec<FieldType>> {
        self.fields.iter().map(FieldSpec::field_type).collect()
    }

    /// Check the descriptor before any request is made for it.
    ///
    /// Names must be plain SOQL identifiers, at least one field must be
    /// declared, and field names must be unique ignoring case.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| {
            Err(Error::new(ErrorKind::InvalidSpec {
                object: self.name.clone(),
                message,
            }))
        };

        if !soql::is_safe_sobject_name(&self.name) {
            return invalid("object name is not a valid identifier".to_string());
        }
        if self.fields.is_empty() {
            return invalid("no fields declared".to_string());
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !soql::is_safe_field_name(&field.name) {
                return invalid(format!("field '{}' is not a valid identifier", field.name));
            }
            if !seen.insert(field.name.to_ascii_lowercase()) {
                return invalid(format!("field '{}' is declared twice", field.name));
            }
        }
        Ok(())
    }
}

/// Parse descriptors from a JSON string.
pub fn parse_object_specs(json: &str) -> Result<Vec<ObjectSpec>> {
    Ok(serde_json::from_str(json)?)
}

/// Load descriptors from a JSON file.
pub fn load_object_specs(path: impl AsRef<Path>) -> Result<Vec<ObjectSpec>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| {
        Error::with_source(
            ErrorKind::Schema(format!("cannot read {}: {}", path.display(), e)),
            e,
        )
    })?;
    parse_object_specs(&json)
}

fn trimmed<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}
