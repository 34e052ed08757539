use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::{ColumnRef, Statement};
use crate::error::PgAdapterError;
use crate::native::NativeClient;
use crate::results::{DbRow, FetchedRow, ResultSet, column_index};
use crate::types::{FetchMode, RowValues};

impl<C: NativeClient + ?Sized> Statement<'_, C> {
    /// Fetch the next row in the shape selected by `mode` (the statement's mode
    /// when `None`) and advance the cursor.
    ///
    /// Returns `None` when there is no result, the cursor is exhausted, or the mode
    /// has no row shape (`Lazy`, `Named`); the latter leaves the cursor in place.
    pub fn fetch(&mut self, mode: Option<FetchMode>) -> Option<FetchedRow> {
        let mode = mode.unwrap_or(self.fetch_mode);
        if matches!(mode, FetchMode::Lazy | FetchMode::Named) {
            return None;
        }

        let result = self.result.as_mut()?;
        let cells = result.fetch_row()?;
        let columns = result.columns().clone();
        let values: Vec<RowValues> = cells
            .iter()
            .map(|cell| RowValues::from_cell(cell.as_deref()))
            .collect();

        if mode == FetchMode::Num {
            return Some(FetchedRow::Num(values));
        }

        let lookup = self
            .column_lookup
            .get_or_insert_with(|| column_index(&columns))
            .clone();
        let row = DbRow::with_index(columns, values, lookup);

        Some(match mode {
            FetchMode::Assoc => FetchedRow::Assoc(row),
            FetchMode::Both => FetchedRow::Both(row),
            FetchMode::Obj => FetchedRow::Obj(row.to_json_object()),
            FetchMode::Bound => {
                self.fill_bound_columns(&row);
                FetchedRow::Bound(row)
            }
            FetchMode::Num | FetchMode::Lazy | FetchMode::Named => return None,
        })
    }

    fn fill_bound_columns(&self, row: &DbRow) {
        for (column, target) in &self.bound_columns {
            let value = match column {
                ColumnRef::Position(position) => position
                    .checked_sub(1)
                    .and_then(|idx| row.get_by_index(idx)),
                ColumnRef::Name(name) => row.get(name),
            };
            if let Some(value) = value {
                *target.borrow_mut() = value.clone();
            }
        }
    }

    /// Fetch every remaining row.
    pub fn fetch_all(&mut self, mode: Option<FetchMode>) -> Vec<FetchedRow> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch(mode) {
            rows.push(row);
        }
        rows
    }

    /// Value of one column (0-based) of the next row.
    pub fn fetch_column(&mut self, column: usize) -> Option<RowValues> {
        self.fetch(Some(FetchMode::Num))
            .and_then(|row| row.into_values().into_iter().nth(column))
    }

    /// Deserialize the next row's object-like shape into `T`.
    ///
    /// # Errors
    /// Returns `StatementError` when the row does not deserialize into `T`.
    pub fn fetch_object<T: DeserializeOwned>(&mut self) -> Result<Option<T>, PgAdapterError> {
        let Some(FetchedRow::Obj(obj)) = self.fetch(Some(FetchMode::Obj)) else {
            return Ok(None);
        };
        serde_json::from_value(JsonValue::Object(obj))
            .map(Some)
            .map_err(|e| PgAdapterError::StatementError(format!("cannot decode row: {e}")))
    }

    /// Materialize every remaining row.
    pub fn fetch_result_set(&mut self) -> ResultSet {
        let Some(result) = self.result.as_ref() else {
            return ResultSet::default();
        };
        let mut result_set = ResultSet::with_capacity(result.remaining());
        result_set.set_column_names(result.columns().clone());
        result_set.rows_affected = self.row_count;
        while let Some(row) = self.fetch(Some(FetchMode::Num)) {
            result_set.add_row_values(row.into_values());
        }
        result_set
    }
}
