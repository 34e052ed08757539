// Statement lifecycle - prepare -> bind -> execute -> fetch -> close for one SQL command
//
// - mod: state machine, parameter handling, execution
// - fetch: turning the result cursor into rows of the requested shape

mod fetch;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::PgAdapterError;
use crate::escape::quote_value;
use crate::native::{NativeClient, NativeResult};
use crate::results::column_index;
use crate::translation::substitute_placeholders;
use crate::types::{FetchMode, RowValues};

/// Caller-owned slot that bound-mode fetches copy a column value into.
pub type BindTarget = Rc<RefCell<RowValues>>;

/// Where a statement is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Unprepared,
    Prepared,
    Executed,
    Closed,
}

/// Parameter reference for per-parameter binding. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRef {
    Position(usize),
    Named(String),
}

impl From<usize> for ParamRef {
    fn from(position: usize) -> Self {
        ParamRef::Position(position)
    }
}

impl From<&str> for ParamRef {
    fn from(name: &str) -> Self {
        ParamRef::Named(name.to_string())
    }
}

/// Column reference for bind targets. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Position(usize),
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(position: usize) -> Self {
        ColumnRef::Position(position)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

/// One SQL command bound to a connection's native link.
///
/// The statement borrows the link mutably, so a connection can never have two
/// live statements: obtaining a new one ends the previous borrow, and dropping a
/// statement frees its result.
pub struct Statement<'c, C: NativeClient + ?Sized> {
    client: &'c mut C,
    sql: String,
    state: StatementState,
    result: Option<NativeResult>,
    column_lookup: Option<Arc<HashMap<String, usize>>>,
    bound_params: BTreeMap<usize, RowValues>,
    bound_columns: Vec<(ColumnRef, BindTarget)>,
    column_count: usize,
    row_count: u64,
    fetch_mode: FetchMode,
}

impl<'c, C: NativeClient + ?Sized> Statement<'c, C> {
    pub(crate) fn new(client: &'c mut C, fetch_mode: FetchMode) -> Self {
        Self {
            client,
            sql: String::new(),
            state: StatementState::Unprepared,
            result: None,
            column_lookup: None,
            bound_params: BTreeMap::new(),
            bound_columns: Vec::new(),
            column_count: 0,
            row_count: 0,
            fetch_mode,
        }
    }

    /// Store the SQL template. Does not contact the server.
    ///
    /// Returns `false`, leaving the statement without a template, when `sql` is empty.
    pub fn prepare(&mut self, sql: &str) -> bool {
        self.release_result();
        if sql.trim().is_empty() {
            self.sql.clear();
            self.state = StatementState::Unprepared;
            return false;
        }
        self.sql = sql.to_string();
        self.state = StatementState::Prepared;
        true
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    fn has_template(&self) -> bool {
        matches!(
            self.state,
            StatementState::Prepared | StatementState::Executed
        )
    }

    /// Record a value for a positional parameter; `execute(None)` uses recorded values.
    ///
    /// # Errors
    /// `Unsupported` for named parameters; `InvalidArgument` for position 0.
    pub fn bind_value(
        &mut self,
        param: impl Into<ParamRef>,
        value: impl Into<RowValues>,
    ) -> Result<bool, PgAdapterError> {
        match param.into() {
            ParamRef::Named(name) => Err(PgAdapterError::Unsupported(format!(
                "named parameter binding is not supported (':{name}')"
            ))),
            ParamRef::Position(0) => Err(PgAdapterError::InvalidArgument(
                "parameter positions start at 1".to_string(),
            )),
            ParamRef::Position(position) => {
                self.bound_params.insert(position, value.into());
                Ok(true)
            }
        }
    }

    /// Register a slot that bound-mode fetches fill with the given column's value.
    pub fn bind_column(&mut self, column: impl Into<ColumnRef>, target: BindTarget) -> bool {
        self.bound_columns.push((column.into(), target));
        true
    }

    /// Escape every parameter, substitute it into the template, and run the result.
    ///
    /// With `params` omitted the previously bound values are used (possibly none).
    /// Returns `Ok(false)` when there is no template to run.
    ///
    /// # Errors
    /// `InvalidArgument` when the bound positions skip a number or a value cannot
    /// be rendered; nothing is sent in either case. Returns `StatementError` with
    /// the backend's error text when execution fails.
    pub fn execute(&mut self, params: Option<&[RowValues]>) -> Result<bool, PgAdapterError> {
        if !self.has_template() {
            return Ok(false);
        }

        if let Some(params) = params {
            self.bound_params = params
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, v)| (i + 1, v))
                .collect();
        } else if let Some(missing) = first_gap(&self.bound_params) {
            return Err(PgAdapterError::InvalidArgument(format!(
                "no value bound for parameter {missing}"
            )));
        }

        let tokens = self
            .bound_params
            .values()
            .map(|value| quote_value(&*self.client, value))
            .collect::<Result<Vec<_>, _>>()?;

        self.release_result();

        let sql = substitute_placeholders(&self.sql, &tokens);
        tracing::debug!(sql = %sql, "execute");

        match self.client.query(&sql) {
            Ok(result) => {
                self.column_count = result.field_count();
                self.row_count = result.affected_rows();
                self.column_lookup = Some(column_index(result.columns()));
                self.result = Some(result);
                self.state = StatementState::Executed;
                Ok(true)
            }
            Err(e) => {
                self.column_count = 0;
                self.row_count = 0;
                self.state = StatementState::Prepared;
                let err = PgAdapterError::statement(e.message, self.client.last_error());
                tracing::debug!(error = %err, "execute failed");
                Err(err)
            }
        }
    }

    fn release_result(&mut self) -> bool {
        self.column_lookup = None;
        self.result.take().is_some()
    }

    /// Free the result so the statement can be executed again.
    ///
    /// Returns `false` when there was no result to free.
    pub fn close_cursor(&mut self) -> bool {
        let freed = self.release_result();
        if self.state == StatementState::Executed {
            self.state = StatementState::Prepared;
        }
        freed
    }

    /// Free the result and drop the template. Safe to call repeatedly.
    ///
    /// Returns `false` when there was no result to free.
    pub fn close(&mut self) -> bool {
        let freed = self.release_result();
        self.sql.clear();
        self.bound_params.clear();
        if self.state != StatementState::Unprepared || freed {
            tracing::debug!("statement closed");
        }
        self.state = StatementState::Closed;
        freed
    }

    /// Columns in the last successful result; zero for commands without rows.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Rows affected or returned by the last execution; `None` without a result.
    #[must_use]
    pub fn row_count(&self) -> Option<u64> {
        self.result.as_ref().map(|_| self.row_count)
    }

    /// The link's last error text; `None` when the statement has no template.
    #[must_use]
    pub fn error_info(&self) -> Option<&str> {
        if self.sql.is_empty() {
            return None;
        }
        self.client.last_error()
    }

    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    pub fn set_fetch_mode(&mut self, mode: FetchMode) {
        self.fetch_mode = mode;
    }

    /// The text protocol yields exactly one result per statement.
    ///
    /// # Errors
    /// Always returns `Unsupported`.
    pub fn next_rowset(&mut self) -> Result<bool, PgAdapterError> {
        Err(PgAdapterError::Unsupported(
            "next_rowset() is not implemented".to_string(),
        ))
    }
}

/// First position missing from a bound set, when the keys are not exactly `1..=len`.
fn first_gap(bound: &BTreeMap<usize, RowValues>) -> Option<usize> {
    (1..)
        .zip(bound.keys())
        .find(|(expected, position)| expected != *position)
        .map(|(expected, _)| expected)
}
