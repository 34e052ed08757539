// Connection - one lazily opened backend link plus the adapter-level operations
//
// - mod: link lifecycle, quoting, statements, fetch helpers
// - tx: BEGIN / COMMIT / ROLLBACK
// - dml: insert with RETURNING, sequences, LIMIT/OFFSET

mod dml;
mod tx;

pub use dml::{Binding, ROW_ID_COLUMN, limit};

use crate::config::ConnectionConfig;
use crate::error::PgAdapterError;
use crate::escape::{quote_identifier, quote_value};
use crate::native::{Connector, NativeClient, PgConnector};
use crate::results::ResultSet;
use crate::statement::Statement;
use crate::types::{FetchMode, ParamStyle, RowValues};

/// A connection to one database. The link is opened on first use and kept until
/// [`Connection::close_connection`] or drop.
///
/// Statements borrow the connection mutably, so at most one is alive at a time.
///
/// ```rust,no_run
/// use pgsql_text_adapter::prelude::*;
///
/// # fn main() -> Result<(), PgAdapterError> {
/// let cfg = ConnectionConfig::new("localhost", "shop", "web").with_password("pw");
/// let mut conn = Connection::new(cfg);
/// let mut stmt = conn.query("SELECT name FROM items WHERE id = ?", &[RowValues::Int(7)])?;
/// while let Some(row) = stmt.fetch(None) {
///     println!("{:?}", row.get("name"));
/// }
/// # Ok(())
/// # }
/// ```
pub struct Connection<K: Connector = PgConnector> {
    connector: K,
    config: ConnectionConfig,
    client: Option<K::Client>,
    fetch_mode: FetchMode,
    last_insert_id: Option<String>,
}

impl Connection<PgConnector> {
    /// Connection backed by the `tokio-postgres` client.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, PgConnector)
    }
}

impl<K: Connector> Connection<K> {
    #[must_use]
    pub fn with_connector(config: ConnectionConfig, connector: K) -> Self {
        let fetch_mode = config.fetch_mode;
        Self {
            connector,
            config,
            client: None,
            fetch_mode,
            last_insert_id: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the link if it is not open yet.
    ///
    /// # Errors
    /// `ConfigError` for an unusable configuration, `ConnectionError` with the
    /// backend's text when the server refuses the link.
    pub fn connect(&mut self) -> Result<(), PgAdapterError> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = self.connector.connect(&self.config)?;
        self.client = Some(client);
        Ok(())
    }

    pub(crate) fn client_mut(&mut self) -> Result<&mut K::Client, PgAdapterError> {
        if self.client.is_none() {
            self.connect()?;
        }
        self.client
            .as_mut()
            .ok_or_else(|| PgAdapterError::ConnectionError("not connected".to_string()))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Close the link. Safe to call when not connected.
    pub fn close_connection(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.close();
        }
    }

    /// Render a value as a SQL literal, connecting first since escaping depends
    /// on the link's settings.
    ///
    /// # Errors
    /// Propagates connection failures, and rejects text holding NUL characters.
    pub fn quote(&mut self, value: &RowValues) -> Result<String, PgAdapterError> {
        let client = self.client_mut()?;
        quote_value(&*client, value)
    }

    #[must_use]
    pub fn quote_identifier(&self, ident: &str) -> String {
        quote_identifier(ident)
    }

    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    /// Set the fetch mode new statements start with.
    ///
    /// # Errors
    /// `Unsupported` for [`FetchMode::Bound`], which needs per-statement bind targets.
    pub fn set_fetch_mode(&mut self, mode: FetchMode) -> Result<(), PgAdapterError> {
        if mode == FetchMode::Bound {
            return Err(PgAdapterError::Unsupported(
                "FETCH_BOUND is not supported as a connection default".to_string(),
            ));
        }
        self.fetch_mode = mode;
        Ok(())
    }

    /// Only positional placeholders are supported.
    #[must_use]
    pub fn supports_parameters(&self, style: ParamStyle) -> bool {
        matches!(style, ParamStyle::Positional)
    }

    /// Start a statement for `sql`, connecting if needed. An empty `sql` yields a
    /// statement without a template whose `execute` reports `false`.
    ///
    /// # Errors
    /// Propagates connection failures.
    pub fn prepare(&mut self, sql: &str) -> Result<Statement<'_, K::Client>, PgAdapterError> {
        let mode = self.fetch_mode;
        let client = self.client_mut()?;
        let mut stmt = Statement::new(client, mode);
        stmt.prepare(sql);
        Ok(stmt)
    }

    /// Prepare and execute in one step.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Statement<'_, K::Client>, PgAdapterError> {
        let mut stmt = self.prepare(sql)?;
        stmt.execute(Some(params))?;
        Ok(stmt)
    }

    /// Every row of a query.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn fetch_all(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, PgAdapterError> {
        let mut stmt = self.query(sql, params)?;
        Ok(stmt.fetch_result_set())
    }

    /// First column of every row.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn fetch_col(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<RowValues>, PgAdapterError> {
        let mut stmt = self.query(sql, params)?;
        let mut values = Vec::new();
        while let Some(value) = stmt.fetch_column(0) {
            values.push(value);
        }
        Ok(values)
    }

    /// First column of the first row.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn fetch_one(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<RowValues>, PgAdapterError> {
        let mut stmt = self.query(sql, params)?;
        Ok(stmt.fetch_column(0))
    }

    /// Server version string as reported by `SHOW server_version`.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn server_version(&mut self) -> Result<Option<String>, PgAdapterError> {
        let value = self.fetch_one("SHOW server_version", &[])?;
        Ok(value.and_then(|v| v.as_text().map(str::to_string)))
    }
}

impl<K: Connector> Drop for Connection<K> {
    fn drop(&mut self) {
        self.close_connection();
    }
}
