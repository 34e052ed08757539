use pgsql_text_adapter::connection::ROW_ID_COLUMN;
use pgsql_text_adapter::prelude::*;
use pgsql_text_adapter::test_utils::{ScriptedBackend, ScriptedConnector};

fn connection(backend: &ScriptedBackend) -> Connection<ScriptedConnector> {
    Connection::with_connector(
        ConnectionConfig::new("localhost", "testing", "testuser"),
        backend.connector(),
    )
}

fn orders_catalog(backend: &ScriptedBackend) {
    backend.on_rows(
        "FROM pg_attribute",
        &[
            "attnum",
            "nspname",
            "relname",
            "colname",
            "type",
            "complete_type",
            "default_value",
            "notnull",
            "length",
            "contype",
            "conkey",
        ],
        &[&[
            Some("1"),
            Some("public"),
            Some("orders"),
            Some("order_id"),
            Some("int4"),
            Some("integer"),
            Some("nextval('orders_order_id_seq'::regclass)"),
            Some("t"),
            Some("4"),
            Some("p"),
            Some("1"),
        ]],
    );
}

#[test]
fn test3_insert_returns_primary_key() -> Result<(), Box<dyn std::error::Error>> {
    let backend = ScriptedBackend::new();
    orders_catalog(&backend);
    backend.on_rows("INSERT INTO", &["order_id"], &[&[Some("17")]]);
    let mut conn = connection(&backend);

    let id = conn.insert(
        "orders",
        &[
            ("customer", "ann's shop".into()),
            ("qty", 3_i64.into()),
            ("placed_at", Binding::expr("now()")),
        ],
    )?;
    assert_eq!(id.as_deref(), Some("17"));
    assert_eq!(conn.last_insert_id(None, None)?.as_deref(), Some("17"));

    let insert = backend
        .executed()
        .into_iter()
        .find(|sql| sql.starts_with("INSERT"))
        .expect("insert ran");
    assert_eq!(
        insert,
        "INSERT INTO \"orders\" (\"customer\", \"qty\", \"placed_at\") \
         VALUES ('ann''s shop', 3, now()) RETURNING \"order_id\""
    );
    Ok(())
}

#[test]
fn test3_insert_without_primary_key_returns_row_id() -> Result<(), Box<dyn std::error::Error>> {
    let backend = ScriptedBackend::new();
    backend.on_rows("INSERT INTO", &[ROW_ID_COLUMN], &[&[Some("(0,1)")]]);
    let mut conn = connection(&backend);

    let id = conn.insert("audit.log", &[("msg", "hello".into())])?;
    assert_eq!(id.as_deref(), Some("(0,1)"));
    let executed = backend.executed();
    assert!(executed[0].contains("n.nspname = 'audit'"));
    assert_eq!(
        executed[1],
        "INSERT INTO \"audit\".\"log\" (\"msg\") VALUES ('hello') RETURNING ctid"
    );
    Ok(())
}

#[test]
fn test3_insert_with_no_columns_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let backend = ScriptedBackend::new();
    orders_catalog(&backend);
    backend.on_rows("INSERT INTO", &["order_id"], &[&[Some("18")]]);
    let mut conn = connection(&backend);

    assert_eq!(conn.insert("orders", &[])?.as_deref(), Some("18"));
    assert!(
        backend
            .executed()
            .contains(&"INSERT INTO \"orders\" DEFAULT VALUES RETURNING \"order_id\"".to_string())
    );
    Ok(())
}

#[test]
fn test3_failed_insert_keeps_previous_id() -> Result<(), Box<dyn std::error::Error>> {
    let backend = ScriptedBackend::new();
    orders_catalog(&backend);
    backend.on_rows("INSERT INTO", &["order_id"], &[&[Some("5")]]);
    let mut conn = connection(&backend);
    conn.insert("orders", &[("qty", 1_i64.into())])?;

    backend.on_error("INSERT INTO", Some("duplicate key value violates unique constraint"));
    assert!(conn.insert("orders", &[("qty", 1_i64.into())]).is_err());
    assert_eq!(conn.last_insert_id(None, None)?.as_deref(), Some("5"));
    Ok(())
}

#[test]
fn test3_sequences() -> Result<(), Box<dyn std::error::Error>> {
    let backend = ScriptedBackend::new();
    backend.on_rows("CURRVAL", &["currval"], &[&[Some("9")]]);
    backend.on_rows("NEXTVAL", &["nextval"], &[&[Some("10")]]);
    let mut conn = connection(&backend);

    assert_eq!(
        conn.last_insert_id(Some("orders"), Some("order_id"))?.as_deref(),
        Some("9")
    );
    assert_eq!(conn.last_sequence_id("orders_order_id_seq")?.as_deref(), Some("9"));
    assert_eq!(conn.next_sequence_id("orders_order_id_seq")?.as_deref(), Some("10"));

    backend.on_error("CURRVAL", Some("currval of sequence \"s\" is not yet defined in this session"));
    assert!(conn.last_sequence_id("s").is_err());
    Ok(())
}

#[test]
fn test3_limit_clause() -> Result<(), Box<dyn std::error::Error>> {
    let backend = ScriptedBackend::new();
    let conn = connection(&backend);

    assert_eq!(conn.limit("SELECT * FROM t", 5, 0)?, "SELECT * FROM t LIMIT 5");
    assert_eq!(
        conn.limit("SELECT * FROM t", 5, 10)?,
        "SELECT * FROM t LIMIT 5 OFFSET 10"
    );
    assert!(matches!(
        conn.limit("SELECT * FROM t", -1, 0),
        Err(PgAdapterError::InvalidArgument(_))
    ));
    assert!(matches!(
        conn.limit("SELECT * FROM t", 1, -3),
        Err(PgAdapterError::InvalidArgument(_))
    ));
    assert_eq!(backend.connect_count(), 0);
    Ok(())
}
