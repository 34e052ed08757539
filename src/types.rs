use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::PgAdapterError;

/// Values used as statement parameters and returned in fetched rows.
///
/// Rows fetched over the text protocol only ever hold `Text` or `Null`; the
/// remaining variants exist for callers supplying parameters:
/// ```rust
/// use pgsql_text_adapter::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("O'Brien".into()),
///     RowValues::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numbers are the only values inlined without quoting.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RowValues::Int(value) => Some(*value),
            RowValues::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans come back from the server as `t`/`f`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            RowValues::Text(text) => match text.as_str() {
                "t" | "true" | "1" => Some(true),
                "f" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            RowValues::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Lift a nullable text cell from the native client.
    #[must_use]
    pub fn from_cell(cell: Option<&str>) -> Self {
        cell.map_or(RowValues::Null, |text| RowValues::Text(text.to_string()))
    }

    /// JSON view used by the object-like fetch shape.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Text(s) => JsonValue::String(s.clone()),
            RowValues::Bool(b) => JsonValue::Bool(*b),
            RowValues::Timestamp(dt) => JsonValue::String(dt.to_string()),
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(value) => value.clone(),
            RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Shape in which the fetcher returns a row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Accepted as a connection default; fetches nothing.
    Lazy,
    /// Mapping from column name to value.
    #[default]
    Assoc,
    /// Values by ordinal position.
    Num,
    /// Row addressable by name and by position.
    Both,
    /// Accepted as a connection default; fetches nothing.
    Named,
    /// Record-like object with one field per column.
    Obj,
    /// Like `Both`, and copied into registered bind targets.
    Bound,
}

impl FetchMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FetchMode::Lazy => "lazy",
            FetchMode::Assoc => "assoc",
            FetchMode::Num => "num",
            FetchMode::Both => "both",
            FetchMode::Named => "named",
            FetchMode::Obj => "obj",
            FetchMode::Bound => "bound",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMode {
    type Err = PgAdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lazy" => Ok(FetchMode::Lazy),
            "assoc" => Ok(FetchMode::Assoc),
            "num" => Ok(FetchMode::Num),
            "both" => Ok(FetchMode::Both),
            "named" => Ok(FetchMode::Named),
            "obj" => Ok(FetchMode::Obj),
            "bound" => Ok(FetchMode::Bound),
            other => Err(PgAdapterError::Unsupported(format!(
                "Invalid fetch mode '{other}' specified"
            ))),
        }
    }
}

/// Case-folding policy applied to identifiers reported by introspection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CaseFolding {
    /// Keep names as the server reports them.
    #[default]
    Natural,
    Upper,
    Lower,
}

impl CaseFolding {
    #[must_use]
    pub fn fold<'a>(self, name: &'a str) -> Cow<'a, str> {
        match self {
            CaseFolding::Natural => Cow::Borrowed(name),
            CaseFolding::Upper => Cow::Owned(name.to_uppercase()),
            CaseFolding::Lower => Cow::Owned(name.to_lowercase()),
        }
    }
}

/// Parameter marker styles a caller may ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    Positional,
    Named,
}

/// Storage class of a numeric SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumericClass {
    /// 32-bit integer
    Int,
    /// 64-bit integer
    BigInt,
    /// Float or decimal
    Float,
}

impl NumericClass {
    /// Classify a declared type name, accepting both SQL spellings and catalog `typname`s.
    #[must_use]
    pub fn classify(type_name: &str) -> Option<Self> {
        match type_name.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" | "INT4" | "SERIAL" | "SERIAL4" | "SMALLINT" | "INT2" => {
                Some(NumericClass::Int)
            }
            "BIGINT" | "INT8" | "BIGSERIAL" | "SERIAL8" => Some(NumericClass::BigInt),
            "DECIMAL" | "DOUBLE PRECISION" | "FLOAT8" | "NUMERIC" | "REAL" | "FLOAT4" => {
                Some(NumericClass::Float)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_mode_parses_known_names_only() {
        assert_eq!("NUM".parse::<FetchMode>().unwrap(), FetchMode::Num);
        assert_eq!("obj".parse::<FetchMode>().unwrap(), FetchMode::Obj);
        let err = "column".parse::<FetchMode>().unwrap_err();
        assert!(matches!(err, PgAdapterError::Unsupported(_)));
    }

    #[test]
    fn case_folding_is_pure() {
        assert_eq!(CaseFolding::Natural.fold("UserId"), "UserId");
        assert_eq!(CaseFolding::Upper.fold("UserId"), "USERID");
        assert_eq!(CaseFolding::Lower.fold("UserId"), "userid");
        assert!(matches!(CaseFolding::Natural.fold("x"), Cow::Borrowed(_)));
    }

    #[test]
    fn text_cells_convert() {
        assert_eq!(RowValues::from_cell(Some("t")).as_bool(), Some(true));
        assert_eq!(RowValues::from_cell(Some("42")).as_int(), Some(42));
        assert!(RowValues::from_cell(None).is_null());
        assert_eq!(RowValues::from(None::<i64>), RowValues::Null);
    }

    #[test]
    fn numeric_classes() {
        assert_eq!(NumericClass::classify("bigserial"), Some(NumericClass::BigInt));
        assert_eq!(NumericClass::classify("int4"), Some(NumericClass::Int));
        assert_eq!(
            NumericClass::classify("double precision"),
            Some(NumericClass::Float)
        );
        assert_eq!(NumericClass::classify("varchar"), None);
    }
}
