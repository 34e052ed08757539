use super::Connection;
use crate::error::PgAdapterError;
use crate::native::{Connector, NativeClient};

impl<K: Connector> Connection<K> {
    /// Send `BEGIN`.
    ///
    /// # Errors
    /// Connection failures always propagate. Backend failures of the command itself
    /// propagate only with `strict_transactions`; otherwise they are logged and ignored.
    pub fn begin_transaction(&mut self) -> Result<(), PgAdapterError> {
        self.transaction_command("BEGIN;")
    }

    /// Send `COMMIT`.
    ///
    /// # Errors
    /// See [`Connection::begin_transaction`].
    pub fn commit(&mut self) -> Result<(), PgAdapterError> {
        self.transaction_command("COMMIT;")
    }

    /// Send `ROLLBACK`.
    ///
    /// # Errors
    /// See [`Connection::begin_transaction`].
    pub fn rollback(&mut self) -> Result<(), PgAdapterError> {
        self.transaction_command("ROLLBACK;")
    }

    /// Run `body` between `BEGIN` and `COMMIT`, rolling back when it fails.
    ///
    /// # Errors
    /// Returns the body's error (after rollback) or a transaction command failure.
    pub fn transaction<T, F>(&mut self, body: F) -> Result<T, PgAdapterError>
    where
        F: FnOnce(&mut Self) -> Result<T, PgAdapterError>,
    {
        self.begin_transaction()?;
        match body(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after failed transaction body failed");
                }
                Err(e)
            }
        }
    }

    fn transaction_command(&mut self, command: &'static str) -> Result<(), PgAdapterError> {
        let strict = self.config.strict_transactions;
        let client = self.client_mut()?;
        match client.query(command) {
            Ok(_) => {
                tracing::debug!(command, "transaction command");
                Ok(())
            }
            Err(e) => {
                let err = PgAdapterError::statement(e.message, client.last_error());
                if strict {
                    Err(err)
                } else {
                    tracing::warn!(command, error = %err, "transaction command failed; ignored");
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConnectionConfig;
    use crate::connection::Connection;
    use crate::error::PgAdapterError;
    use crate::test_utils::{ScriptedBackend, ScriptedConnector};

    fn connection(backend: &ScriptedBackend, strict: bool) -> Connection<ScriptedConnector> {
        Connection::with_connector(
            ConnectionConfig::new("localhost", "db", "user").with_strict_transactions(strict),
            backend.connector(),
        )
    }

    #[test]
    fn commands_are_sent_in_order() {
        let backend = ScriptedBackend::new();
        let mut conn = connection(&backend, false);
        conn.begin_transaction().unwrap();
        conn.commit().unwrap();
        conn.begin_transaction().unwrap();
        conn.rollback().unwrap();
        assert_eq!(
            backend.executed(),
            vec!["BEGIN;", "COMMIT;", "BEGIN;", "ROLLBACK;"]
        );
    }

    #[test]
    fn lenient_mode_swallows_failures() {
        let backend = ScriptedBackend::new();
        backend.on_error("COMMIT", Some("current transaction is aborted"));
        let mut conn = connection(&backend, false);
        assert!(conn.commit().is_ok());
    }

    #[test]
    fn strict_mode_raises_failures() {
        let backend = ScriptedBackend::new();
        backend.on_error("COMMIT", Some("current transaction is aborted"));
        let mut conn = connection(&backend, true);
        let err = conn.commit().unwrap_err();
        assert!(
            matches!(err, PgAdapterError::StatementError(ref m) if m.contains("aborted"))
        );
    }

    #[test]
    fn connect_failure_always_raises() {
        let backend = ScriptedBackend::new();
        backend.fail_connect("no route to host");
        let mut conn = connection(&backend, false);
        assert!(matches!(
            conn.begin_transaction(),
            Err(PgAdapterError::ConnectionError(_))
        ));
    }

    #[test]
    fn transaction_helper_commits_or_rolls_back() {
        let backend = ScriptedBackend::new();
        backend.on_error("bad", Some("syntax error"));
        let mut conn = connection(&backend, true);

        let n = conn
            .transaction(|c| {
                c.query("UPDATE t SET a = 1", &[])?;
                Ok(1)
            })
            .unwrap();
        assert_eq!(n, 1);

        let failed: Result<(), _> = conn.transaction(|c| {
            c.query("bad sql", &[])?;
            Ok(())
        });
        assert!(failed.is_err());
        assert_eq!(
            backend.executed(),
            vec![
                "BEGIN;",
                "UPDATE t SET a = 1",
                "COMMIT;",
                "BEGIN;",
                "bad sql",
                "ROLLBACK;"
            ]
        );
    }
}
