use postgresql_embedded::PostgreSQL;

use super::SHARED_RUNTIME;
use crate::config::ConnectionConfig;
use crate::connection::Connection;

/// A running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    /// Working configuration with the server's generated credentials
    pub config: ConnectionConfig,
}

/// Start an embedded `PostgreSQL`, create `dbname` and check that a
/// [`Connection`] can reach it.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, the database
/// cannot be created, or the connectivity check fails.
pub fn setup_postgres_embedded(
    dbname: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let (postgresql, config) = SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();

        // bundled binaries, no download
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(dbname).await?;

        let settings = postgresql.settings();
        let config = ConnectionConfig::new(settings.host.clone(), dbname, settings.username.clone())
            .with_port(settings.port)
            .with_password(settings.password.clone());
        Ok::<_, Box<dyn std::error::Error>>((postgresql, config))
    })?;

    // The adapter drives its own runtime, so this must run outside block_on.
    let mut conn = Connection::new(config.clone());
    conn.query("SELECT 1", &[])?;
    conn.close_connection();
    tracing::debug!(port = config.port, dbname, "embedded PostgreSQL ready");

    Ok(EmbeddedPostgres {
        port: config.port,
        postgresql,
        config,
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
