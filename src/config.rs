use serde::{Deserialize, Serialize};

use crate::error::PgAdapterError;
use crate::types::{CaseFolding, FetchMode};

/// Default PostgreSQL port used when the configuration omits one.
pub const DEFAULT_PORT: u16 = 5432;

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Connection configuration plus the adapter-wide options a `Connection` honors.
///
/// ```rust
/// use pgsql_text_adapter::prelude::*;
///
/// let cfg = ConnectionConfig::new("localhost", "app", "app_user")
///     .with_password("secret")
///     .with_case_folding(CaseFolding::Lower);
/// assert_eq!(cfg.port, 5432);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Client encoding negotiated with `SET NAMES` after connecting.
    #[serde(default)]
    pub charset: Option<String>,
    /// Fetch shape new statements start with.
    #[serde(default)]
    pub fetch_mode: FetchMode,
    /// Folding applied to names reported by `describe_table`.
    #[serde(default)]
    pub case_folding: CaseFolding,
    /// Surface `BEGIN`/`COMMIT`/`ROLLBACK` failures instead of logging and ignoring them.
    #[serde(default)]
    pub strict_transactions: bool,
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, dbname: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            dbname: dbname.into(),
            user: user.into(),
            password: String::new(),
            charset: None,
            fetch_mode: FetchMode::default(),
            case_folding: CaseFolding::default(),
            strict_transactions: false,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn with_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.fetch_mode = mode;
        self
    }

    #[must_use]
    pub fn with_case_folding(mut self, folding: CaseFolding) -> Self {
        self.case_folding = folding;
        self
    }

    #[must_use]
    pub fn with_strict_transactions(mut self, strict: bool) -> Self {
        self.strict_transactions = strict;
        self
    }

    /// Check that every field needed to open a link is present.
    ///
    /// # Errors
    /// Returns `PgAdapterError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), PgAdapterError> {
        if self.host.trim().is_empty() {
            return Err(PgAdapterError::ConfigError("host is required".to_string()));
        }
        if self.dbname.trim().is_empty() {
            return Err(PgAdapterError::ConfigError("dbname is required".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(PgAdapterError::ConfigError("user is required".to_string()));
        }
        if self.port == 0 {
            return Err(PgAdapterError::ConfigError("port is required".to_string()));
        }
        Ok(())
    }

    /// libpq-style keyword/value connection string.
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.dbname, self.user, self.password
        )
    }
}
