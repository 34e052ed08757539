// Native client layer - the procedural text-protocol API the adapter drives
//
// - NativeClient: escape / query / last-error / close on one established link
// - Connector: opens a NativeClient from a ConnectionConfig
// - NativeResult: one result handle with a row cursor
// - postgres: tokio-postgres simple-query implementation

pub mod postgres;

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::error::PgAdapterError;

pub use postgres::{PgClient, PgConnector};

/// Failure reported by a single native call. The message may be absent, in which
/// case callers fall back to [`NativeClient::last_error`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeError {
    pub message: Option<String>,
}

impl NativeError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn silent() -> Self {
        Self { message: None }
    }
}

/// One established backend link.
pub trait NativeClient {
    /// Escape a string for inclusion between single quotes. Correctness may depend
    /// on the link's negotiated settings, which is why this lives on the client.
    fn escape_string(&self, value: &str) -> String;

    /// Send text SQL and wait for its (single) result.
    ///
    /// # Errors
    /// Returns a `NativeError` when the backend rejects the command or the link fails.
    fn query(&mut self, sql: &str) -> Result<NativeResult, NativeError>;

    /// Text of the most recent failure on this link.
    fn last_error(&self) -> Option<&str>;

    /// Tear the link down. Further queries fail.
    fn close(&mut self);
}

/// Opens native links. The `Connection` is generic over this, so the client
/// implementation is fixed at construction time.
pub trait Connector {
    type Client: NativeClient;

    /// # Errors
    /// Returns `ConfigError` when the client cannot be initialized and
    /// `ConnectionError` (with backend text) when the link cannot be established.
    fn connect(&self, config: &ConnectionConfig) -> Result<Self::Client, PgAdapterError>;
}

/// A result handle: column names, text cells, the affected-row count, and a cursor.
#[derive(Debug, Clone, Default)]
pub struct NativeResult {
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<Option<String>>>,
    affected: u64,
    cursor: usize,
}

impl NativeResult {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>, affected: u64) -> Self {
        Self {
            columns: Arc::new(columns),
            rows,
            affected,
            cursor: 0,
        }
    }

    /// Result of a command that returns no rows.
    #[must_use]
    pub fn command(affected: u64) -> Self {
        Self::new(Vec::new(), Vec::new(), affected)
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.affected
    }

    #[must_use]
    pub fn columns(&self) -> &Arc<Vec<String>> {
        &self.columns
    }

    /// Return the row under the cursor and advance; `None` once exhausted.
    pub fn fetch_row(&mut self) -> Option<Vec<Option<String>>> {
        let row = self.rows.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(row)
    }

    /// Rows not yet fetched.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len().saturating_sub(self.cursor)
    }
}
