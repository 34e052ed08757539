use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgAdapterError {
    /// Native client unavailable or the connection configuration is incomplete.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Link establishment failed; carries the backend's error text.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Execute or catalog-query failure; carries the backend's error text.
    #[error("PGSql statement execute error: {0}")]
    StatementError(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PgAdapterError {
    /// Build a statement error from the failed call's own text, falling back to the
    /// connection-level last error when the call reported none.
    pub(crate) fn statement(own: Option<String>, last_error: Option<&str>) -> Self {
        let text = own
            .filter(|msg| !msg.is_empty())
            .or_else(|| last_error.map(str::to_string))
            .unwrap_or_else(|| "unknown backend error".to_string());
        PgAdapterError::StatementError(text)
    }
}
