use tokio::runtime::{Builder, Runtime};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use super::{Connector, NativeClient, NativeError, NativeResult};
use crate::config::ConnectionConfig;
use crate::error::PgAdapterError;

/// Opens blocking links to a PostgreSQL server.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

/// A `tokio-postgres` client driven by its own current-thread runtime, so every
/// call blocks the caller until the server answers. Only the simple-query
/// protocol is used: statements travel as plain text.
pub struct PgClient {
    runtime: Runtime,
    client: Option<Client>,
    standard_conforming_strings: bool,
    last_error: Option<String>,
}

fn error_text(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{}: {}", db.severity(), db.message()),
        None => err.to_string(),
    }
}

impl Connector for PgConnector {
    type Client = PgClient;

    fn connect(&self, config: &ConnectionConfig) -> Result<PgClient, PgAdapterError> {
        config.validate()?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                PgAdapterError::ConfigError(format!("postgres client runtime unavailable: {e}"))
            })?;

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.dbname)
            .user(&config.user)
            .password(&config.password);

        tracing::debug!(
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            user = %config.user,
            "postgres connect start"
        );
        let (client, connection) = runtime
            .block_on(pg_config.connect(NoTls))
            .map_err(|e| PgAdapterError::ConnectionError(error_text(&e)))?;
        // The connection task only makes progress while a later block_on drives the runtime.
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection task ended");
            }
        });

        let mut pg = PgClient {
            runtime,
            client: Some(client),
            standard_conforming_strings: true,
            last_error: None,
        };
        pg.standard_conforming_strings = pg.read_standard_conforming_strings();

        if let Some(charset) = config.charset.as_deref().filter(|c| !c.is_empty()) {
            let set_names = format!("SET NAMES '{}'", pg.escape_string(charset));
            if let Err(e) = pg.query(&set_names) {
                tracing::warn!(charset, error = ?e.message, "could not set client encoding");
            }
        }

        tracing::debug!("postgres connect established");
        Ok(pg)
    }
}

/// Escape text for the inside of a plain `'...'` literal.
///
/// Quotes are doubled. Backslashes are doubled only when the server reads them
/// as escapes (`standard_conforming_strings = off`).
#[must_use]
pub fn escape_literal(value: &str, standard_conforming_strings: bool) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' if !standard_conforming_strings => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out
}

impl PgClient {
    fn read_standard_conforming_strings(&mut self) -> bool {
        match self.query("SHOW standard_conforming_strings") {
            Ok(mut res) => res
                .fetch_row()
                .and_then(|row| row.into_iter().next().flatten())
                .is_none_or(|value| value != "off"),
            Err(_) => true,
        }
    }
}

impl NativeClient for PgClient {
    fn escape_string(&self, value: &str) -> String {
        escape_literal(value, self.standard_conforming_strings)
    }

    fn query(&mut self, sql: &str) -> Result<NativeResult, NativeError> {
        let Some(client) = self.client.as_ref() else {
            let msg = "connection is closed".to_string();
            self.last_error = Some(msg.clone());
            return Err(NativeError::new(msg));
        };

        let messages = match self.runtime.block_on(client.simple_query(sql)) {
            Ok(messages) => messages,
            Err(e) => {
                let msg = error_text(&e);
                self.last_error = Some(msg.clone());
                return Err(NativeError::new(msg));
            }
        };

        // A multi-command string yields several results; the last one wins.
        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut affected = 0;
        let mut completed = false;
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(desc) => {
                    columns = desc.iter().map(|c| c.name().to_string()).collect();
                    rows.clear();
                    completed = false;
                }
                SimpleQueryMessage::Row(row) => {
                    if completed {
                        columns.clear();
                        rows.clear();
                        completed = false;
                    }
                    if columns.is_empty() {
                        columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                    }
                    let cells = (0..row.len())
                        .map(|idx| row.get(idx).map(str::to_string))
                        .collect();
                    rows.push(cells);
                }
                SimpleQueryMessage::CommandComplete(count) => {
                    if completed {
                        columns.clear();
                        rows.clear();
                    }
                    affected = count;
                    completed = true;
                }
                _ => {}
            }
        }

        Ok(NativeResult::new(columns, rows, affected))
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!("postgres connection closed");
        }
    }
}
