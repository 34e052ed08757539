use serde_json::{Map, Value as JsonValue};

use super::row::DbRow;
use crate::types::{FetchMode, RowValues};

/// One row in the shape selected by the fetch mode.
#[derive(Debug, Clone)]
pub enum FetchedRow {
    /// Values by ordinal position.
    Num(Vec<RowValues>),
    /// Mapping from column name to value.
    Assoc(DbRow),
    /// Row addressable by name (`get`) and by position (`get_by_index`).
    Both(DbRow),
    /// Record-like object, one field per column.
    Obj(Map<String, JsonValue>),
    /// Same as `Both`; bind targets were filled before this was returned.
    Bound(DbRow),
}

impl FetchedRow {
    #[must_use]
    pub fn mode(&self) -> FetchMode {
        match self {
            FetchedRow::Num(_) => FetchMode::Num,
            FetchedRow::Assoc(_) => FetchMode::Assoc,
            FetchedRow::Both(_) => FetchMode::Both,
            FetchedRow::Obj(_) => FetchMode::Obj,
            FetchedRow::Bound(_) => FetchMode::Bound,
        }
    }

    /// Named access; `None` for the positional shape and for object rows.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&RowValues> {
        match self {
            FetchedRow::Assoc(row) | FetchedRow::Both(row) | FetchedRow::Bound(row) => {
                row.get(column)
            }
            FetchedRow::Num(_) | FetchedRow::Obj(_) => None,
        }
    }

    /// Positional access; only the shapes that carry positions answer.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        match self {
            FetchedRow::Num(values) => values.get(index),
            FetchedRow::Both(row) | FetchedRow::Bound(row) => row.get_by_index(index),
            FetchedRow::Assoc(_) | FetchedRow::Obj(_) => None,
        }
    }

    #[must_use]
    pub fn as_row(&self) -> Option<&DbRow> {
        match self {
            FetchedRow::Assoc(row) | FetchedRow::Both(row) | FetchedRow::Bound(row) => Some(row),
            FetchedRow::Num(_) | FetchedRow::Obj(_) => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, JsonValue>> {
        if let FetchedRow::Obj(obj) = self {
            Some(obj)
        } else {
            None
        }
    }

    /// Values in column order. Object rows carry no positions and yield their
    /// fields in key order.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        match self {
            FetchedRow::Num(values) => values,
            FetchedRow::Assoc(row) | FetchedRow::Both(row) | FetchedRow::Bound(row) => {
                row.into_values()
            }
            FetchedRow::Obj(obj) => obj
                .into_iter()
                .map(|(_, value)| match value {
                    JsonValue::Null => RowValues::Null,
                    JsonValue::String(s) => RowValues::Text(s),
                    other => RowValues::JSON(other),
                })
                .collect(),
        }
    }
}
