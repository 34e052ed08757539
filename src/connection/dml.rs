use super::Connection;
use crate::error::PgAdapterError;
use crate::escape::{quote_identifier, quote_identifier_part};
use crate::native::Connector;
use crate::translation::PLACEHOLDER;
use crate::types::RowValues;

/// Column returned by `INSERT ... RETURNING` when a table has no primary key.
pub const ROW_ID_COLUMN: &str = "ctid";

/// Value for one column of an insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Escaped and substituted like any parameter.
    Value(RowValues),
    /// Raw SQL expression inserted verbatim, e.g. `now()`. Must not contain `?`.
    Expr(String),
}

impl Binding {
    #[must_use]
    pub fn expr(sql: impl Into<String>) -> Self {
        Binding::Expr(sql.into())
    }
}

impl From<RowValues> for Binding {
    fn from(value: RowValues) -> Self {
        Binding::Value(value)
    }
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Binding::Value(RowValues::from(value))
    }
}

impl From<String> for Binding {
    fn from(value: String) -> Self {
        Binding::Value(RowValues::from(value))
    }
}

impl From<i64> for Binding {
    fn from(value: i64) -> Self {
        Binding::Value(RowValues::Int(value))
    }
}

impl From<f64> for Binding {
    fn from(value: f64) -> Self {
        Binding::Value(RowValues::Float(value))
    }
}

impl From<bool> for Binding {
    fn from(value: bool) -> Self {
        Binding::Value(RowValues::Bool(value))
    }
}

/// Append `LIMIT count` and, when `offset > 0`, `OFFSET offset` to `sql`.
///
/// # Errors
/// `InvalidArgument` when `count` is not positive or `offset` is negative.
pub fn limit(sql: &str, count: i64, offset: i64) -> Result<String, PgAdapterError> {
    if count <= 0 {
        return Err(PgAdapterError::InvalidArgument(format!(
            "LIMIT argument count={count} is not valid"
        )));
    }
    if offset < 0 {
        return Err(PgAdapterError::InvalidArgument(format!(
            "LIMIT argument offset={offset} is not valid"
        )));
    }
    let mut out = format!("{sql} LIMIT {count}");
    if offset > 0 {
        out.push_str(&format!(" OFFSET {offset}"));
    }
    Ok(out)
}

fn into_text(value: RowValues) -> Option<String> {
    match value {
        RowValues::Null => None,
        RowValues::Text(s) => Some(s),
        other => Some(other.to_json().to_string()),
    }
}

impl<K: Connector> Connection<K> {
    /// See [`limit`].
    ///
    /// # Errors
    /// `InvalidArgument` for a non-positive count or negative offset.
    pub fn limit(&self, sql: &str, count: i64, offset: i64) -> Result<String, PgAdapterError> {
        limit(sql, count, offset)
    }

    /// Insert one row and return the generated key.
    ///
    /// The statement ends in `RETURNING` the table's primary key column, or
    /// [`ROW_ID_COLUMN`] when the table has none. The returned value is also kept
    /// for [`Connection::last_insert_id`] without arguments.
    ///
    /// # Errors
    /// Propagates connection, introspection and statement failures.
    pub fn insert(
        &mut self,
        table: &str,
        bindings: &[(&str, Binding)],
    ) -> Result<Option<String>, PgAdapterError> {
        let returning = match self.primary_key_name(table)? {
            Some(pk) => quote_identifier_part(&pk),
            None => ROW_ID_COLUMN.to_string(),
        };

        let mut columns = Vec::with_capacity(bindings.len());
        let mut values = Vec::with_capacity(bindings.len());
        let mut params = Vec::new();
        for (column, binding) in bindings {
            columns.push(quote_identifier(column));
            match binding {
                Binding::Value(value) => {
                    values.push(PLACEHOLDER.to_string());
                    params.push(value.clone());
                }
                Binding::Expr(expr) => values.push(expr.clone()),
            }
        }

        let sql = if bindings.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {returning}",
                quote_identifier(table)
            )
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {returning}",
                quote_identifier(table),
                columns.join(", "),
                values.join(", ")
            )
        };

        let id = self.fetch_one(&sql, &params)?.and_then(into_text);
        self.last_insert_id.clone_from(&id);
        Ok(id)
    }

    /// Last generated key.
    ///
    /// Without a table this is the key returned by the most recent
    /// [`Connection::insert`]. With a table it reads the current value of the
    /// sequence `<table>_<primary_key>_seq`, or `<table>_seq` when no key column
    /// is given.
    ///
    /// # Errors
    /// Propagates connection and statement failures, e.g. when the sequence has
    /// not been used in this session.
    pub fn last_insert_id(
        &mut self,
        table: Option<&str>,
        primary_key: Option<&str>,
    ) -> Result<Option<String>, PgAdapterError> {
        let Some(table) = table else {
            return Ok(self.last_insert_id.clone());
        };
        let sequence = match primary_key {
            Some(pk) => format!("{table}_{pk}_seq"),
            None => format!("{table}_seq"),
        };
        self.last_sequence_id(&sequence)
    }

    /// Current value of a sequence in this session.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn last_sequence_id(&mut self, sequence: &str) -> Result<Option<String>, PgAdapterError> {
        self.sequence_call("CURRVAL", sequence)
    }

    /// Advance a sequence and return the new value.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn next_sequence_id(&mut self, sequence: &str) -> Result<Option<String>, PgAdapterError> {
        self.sequence_call("NEXTVAL", sequence)
    }

    fn sequence_call(
        &mut self,
        function: &str,
        sequence: &str,
    ) -> Result<Option<String>, PgAdapterError> {
        let sql = format!("SELECT {function}({PLACEHOLDER})");
        let value = self.fetch_one(&sql, &[RowValues::from(sequence)])?;
        Ok(value.and_then(into_text))
    }
}
