use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ConnectionConfig;
use crate::error::PgAdapterError;
use crate::native::{Connector, NativeClient, NativeError, NativeResult};

/// Canned answer for statements matching a rule.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    },
    Command(u64),
    /// Failure, optionally without message text of its own.
    Error(Option<String>),
}

#[derive(Debug, Default)]
struct ScriptState {
    rules: Vec<(String, ScriptedResponse)>,
    executed: Vec<String>,
    last_error: Option<String>,
    connect_error: Option<String>,
    connects: usize,
    closes: usize,
}

/// In-memory stand-in for a server. Statements are answered by the most recently
/// added rule whose pattern occurs in the SQL text; unmatched statements succeed
/// as a command touching zero rows. Every statement text is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn on(&self, pattern: &str, response: ScriptedResponse) {
        self.lock().rules.push((pattern.to_string(), response));
    }

    pub fn on_rows(&self, pattern: &str, columns: &[&str], rows: &[&[Option<&str>]]) {
        self.on(
            pattern,
            ScriptedResponse::Rows {
                columns: columns.iter().map(|c| (*c).to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
                    .collect(),
            },
        );
    }

    pub fn on_command(&self, pattern: &str, affected: u64) {
        self.on(pattern, ScriptedResponse::Command(affected));
    }

    pub fn on_error(&self, pattern: &str, message: Option<&str>) {
        self.on(pattern, ScriptedResponse::Error(message.map(str::to_string)));
    }

    /// Last-error text new clients start with.
    pub fn set_last_error(&self, message: &str) {
        self.lock().last_error = Some(message.to_string());
    }

    /// Make every subsequent connect attempt fail with `message`.
    pub fn fail_connect(&self, message: &str) {
        self.lock().connect_error = Some(message.to_string());
    }

    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub fn clear_executed(&self) {
        self.lock().executed.clear();
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    #[must_use]
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    #[must_use]
    pub fn client(&self) -> ScriptedClient {
        let last_error = self.lock().last_error.clone();
        ScriptedClient {
            backend: self.clone(),
            last_error,
            closed: false,
        }
    }

    #[must_use]
    pub fn connector(&self) -> ScriptedConnector {
        ScriptedConnector {
            backend: self.clone(),
        }
    }

    fn respond(&self, sql: &str) -> ScriptedResponse {
        let mut state = self.lock();
        state.executed.push(sql.to_string());
        state
            .rules
            .iter()
            .rev()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map_or(ScriptedResponse::Command(0), |(_, response)| response.clone())
    }
}

/// Native client answering from a [`ScriptedBackend`].
#[derive(Debug, Default)]
pub struct ScriptedClient {
    backend: ScriptedBackend,
    last_error: Option<String>,
    closed: bool,
}

impl NativeClient for ScriptedClient {
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    fn query(&mut self, sql: &str) -> Result<NativeResult, NativeError> {
        if self.closed {
            let msg = "connection is closed".to_string();
            self.last_error = Some(msg.clone());
            return Err(NativeError::new(msg));
        }
        match self.backend.respond(sql) {
            ScriptedResponse::Rows { columns, rows } => {
                let count = rows.len() as u64;
                Ok(NativeResult::new(columns, rows, count))
            }
            ScriptedResponse::Command(affected) => Ok(NativeResult::command(affected)),
            ScriptedResponse::Error(Some(message)) => {
                self.last_error = Some(message.clone());
                Err(NativeError::new(message))
            }
            ScriptedResponse::Error(None) => Err(NativeError::silent()),
        }
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.backend.lock().closes += 1;
        }
    }
}

/// Connector handing out [`ScriptedClient`]s.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    backend: ScriptedBackend,
}

impl Connector for ScriptedConnector {
    type Client = ScriptedClient;

    fn connect(&self, config: &ConnectionConfig) -> Result<ScriptedClient, PgAdapterError> {
        config.validate()?;
        {
            let mut state = self.backend.lock();
            if let Some(message) = state.connect_error.clone() {
                return Err(PgAdapterError::ConnectionError(message));
            }
            state.connects += 1;
        }
        Ok(self.backend.client())
    }
}
