// Schema introspection - catalog queries decoded into column descriptors
//
// - mod: descriptor types and the Connection entry points
// - parse: catalog row decoding and type-string parsing

mod parse;

use std::collections::HashMap;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::connection::Connection;
use crate::error::PgAdapterError;
use crate::native::Connector;
use crate::types::{FetchMode, NumericClass, RowValues};

const DESCRIBE_TABLE_SQL: &str = "SELECT \
    a.attnum, \
    n.nspname, \
    c.relname, \
    a.attname AS colname, \
    t.typname AS type, \
    FORMAT_TYPE(a.atttypid, a.atttypmod) AS complete_type, \
    pg_get_expr(d.adbin, d.adrelid) AS default_value, \
    a.attnotnull AS notnull, \
    a.attlen AS length, \
    co.contype, \
    ARRAY_TO_STRING(co.conkey, ',') AS conkey \
    FROM pg_attribute AS a \
    JOIN pg_class AS c ON a.attrelid = c.oid \
    JOIN pg_namespace AS n ON c.relnamespace = n.oid \
    JOIN pg_type AS t ON a.atttypid = t.oid \
    LEFT OUTER JOIN pg_constraint AS co ON (co.conrelid = c.oid \
        AND a.attnum = ANY(co.conkey) AND co.contype = 'p') \
    LEFT OUTER JOIN pg_attrdef AS d ON d.adrelid = c.oid AND d.adnum = a.attnum \
    WHERE a.attnum > 0 AND NOT a.attisdropped AND c.relname = ?";

const LIST_TABLES_SQL: &str = "SELECT c.relname AS table_name \
    FROM pg_class c, pg_user u \
    WHERE c.relowner = u.usesysid AND c.relkind = 'r' \
    AND NOT EXISTS (SELECT 1 FROM pg_views WHERE viewname = c.relname) \
    AND c.relname !~ '^(pg_|sql_)' \
    UNION \
    SELECT c.relname AS table_name \
    FROM pg_class c \
    WHERE c.relkind = 'r' \
    AND NOT EXISTS (SELECT 1 FROM pg_views WHERE viewname = c.relname) \
    AND NOT EXISTS (SELECT 1 FROM pg_user WHERE usesysid = c.relowner) \
    AND c.relname !~ '^pg_'";

/// Metadata for one table column.
///
/// Names are reported exactly as the catalog stores them; case folding only
/// applies to the keys of [`TableDescription`]. `scale`, `precision` and
/// `unsigned` are never populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ColumnDescriptor {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    /// 1-based ordinal in the table
    pub column_position: i32,
    /// Catalog type name, e.g. `int4`, `varchar`
    pub data_type: String,
    pub default: Option<String>,
    pub nullable: bool,
    /// `None` means unbounded or variable width.
    pub length: Option<u32>,
    pub scale: Option<u32>,
    pub precision: Option<u32>,
    pub unsigned: Option<bool>,
    pub primary: bool,
    /// 1-based position within the primary key constraint
    pub primary_position: Option<usize>,
    /// Default is generated by advancing a sequence.
    pub identity: bool,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn numeric_class(&self) -> Option<NumericClass> {
        NumericClass::classify(&self.data_type)
    }
}

/// Column descriptors of one table in column order, keyed by case-folded name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDescription {
    columns: Vec<(String, ColumnDescriptor)>,
    index: HashMap<String, usize>,
}

impl TableDescription {
    /// Add a column under its folded key. A repeated catalog row for the same
    /// column replaces the earlier one; two distinct columns folding to one key
    /// is an error.
    fn insert(&mut self, key: String, column: ColumnDescriptor) -> Result<(), PgAdapterError> {
        match self.index.get(&key) {
            Some(&idx) if self.columns[idx].1.column_name == column.column_name => {
                self.columns[idx].1 = column;
            }
            Some(&idx) => {
                return Err(PgAdapterError::StatementError(format!(
                    "columns '{}' and '{}' of table '{}' both fold to key '{key}'",
                    self.columns[idx].1.column_name, column.column_name, column.table_name
                )));
            }
            None => {
                self.index.insert(key.clone(), self.columns.len());
                self.columns.push((key, column));
            }
        }
        Ok(())
    }

    /// Look up by folded key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.index.get(key).map(|&idx| &self.columns[idx].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnDescriptor)> {
        self.columns.iter().map(|(key, col)| (key.as_str(), col))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Primary key columns in constraint order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&ColumnDescriptor> {
        let mut keys: Vec<&ColumnDescriptor> = self
            .columns
            .iter()
            .map(|(_, col)| col)
            .filter(|col| col.primary)
            .collect();
        keys.sort_by_key(|col| col.primary_position);
        keys
    }
}

impl Serialize for TableDescription {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (key, column) in &self.columns {
            map.serialize_entry(key, column)?;
        }
        map.end()
    }
}

impl<K: Connector> Connection<K> {
    /// Describe the columns of `table`.
    ///
    /// Without `schema` only a table visible on the search path is considered.
    /// A table that does not exist yields an empty description.
    ///
    /// # Errors
    /// Propagates connection and statement failures; `StatementError` for a
    /// catalog row that cannot be decoded.
    pub fn describe_table(
        &mut self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<TableDescription, PgAdapterError> {
        let mut sql = String::from(DESCRIBE_TABLE_SQL);
        let mut params = vec![RowValues::from(table)];
        match schema {
            Some(schema) => {
                sql.push_str(" AND n.nspname = ?");
                params.push(RowValues::from(schema));
            }
            None => sql.push_str(" AND pg_table_is_visible(c.oid)"),
        }
        sql.push_str(" ORDER BY a.attnum");

        let folding = self.config().case_folding;
        let rows = {
            let mut stmt = self.query(&sql, &params)?;
            stmt.fetch_all(Some(FetchMode::Num))
        };

        let mut description = TableDescription::default();
        for row in rows {
            let catalog = parse::decode_row(&row.into_values())?;
            let column = parse::describe_column(catalog);
            let key = folding.fold(&column.column_name).into_owned();
            description.insert(key, column)?;
        }
        tracing::debug!(table, columns = description.len(), "described table");
        Ok(description)
    }

    /// Names of user tables, excluding system relations and views.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn list_tables(&mut self) -> Result<Vec<String>, PgAdapterError> {
        let names = self.fetch_col(LIST_TABLES_SQL, &[])?;
        Ok(names
            .iter()
            .filter_map(|name| name.as_text().map(str::to_string))
            .collect())
    }

    /// Name of the first primary key column of `table` (`schema.table` accepted),
    /// or `None` when the table has no primary key.
    ///
    /// # Errors
    /// Propagates connection and statement failures.
    pub fn primary_key_name(&mut self, table: &str) -> Result<Option<String>, PgAdapterError> {
        if table.is_empty() {
            return Ok(None);
        }
        let description = match table.split_once('.') {
            Some((schema, name)) => self.describe_table(name, Some(schema))?,
            None => self.describe_table(table, None)?,
        };
        Ok(description
            .primary_key()
            .first()
            .map(|col| col.column_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::test_utils::{ScriptedBackend, ScriptedConnector};
    use crate::types::CaseFolding;

    const COLUMNS: &[&str] = &[
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
    ];

    fn connection(backend: &ScriptedBackend, folding: CaseFolding) -> Connection<ScriptedConnector> {
        Connection::with_connector(
            ConnectionConfig::new("localhost", "db", "user").with_case_folding(folding),
            backend.connector(),
        )
    }

    fn users_catalog(backend: &ScriptedBackend) {
        backend.on_rows(
            "FROM pg_attribute",
            COLUMNS,
            &[
                &[
                    Some("1"),
                    Some("public"),
                    Some("users"),
                    Some("Id"),
                    Some("int4"),
                    Some("integer"),
                    Some("nextval('users_id_seq'::regclass)"),
                    Some("t"),
                    Some("4"),
                    Some("p"),
                    Some("1"),
                ],
                &[
                    Some("2"),
                    Some("public"),
                    Some("users"),
                    Some("name"),
                    Some("varchar"),
                    Some("character varying(50)"),
                    Some("'anon'::character varying"),
                    Some("f"),
                    Some("-1"),
                    None,
                    None,
                ],
            ],
        );
    }

    #[test]
    fn describe_keys_follow_case_folding() {
        let backend = ScriptedBackend::new();
        users_catalog(&backend);
        let mut conn = connection(&backend, CaseFolding::Lower);

        let desc = conn.describe_table("users", None).unwrap();
        assert_eq!(desc.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        let id = desc.get("id").unwrap();
        assert_eq!(id.column_name, "Id");
        assert_eq!(id.numeric_class(), Some(NumericClass::Int));
        assert_eq!(desc.get("name").unwrap().default.as_deref(), Some("anon"));
        assert!(desc.get("Id").is_none());
    }

    #[test]
    fn folding_collision_is_an_error() {
        let backend = ScriptedBackend::new();
        fn row(attnum: &'static str, name: &'static str) -> [Option<&'static str>; 11] {
            [
                Some(attnum),
                Some("public"),
                Some("mixed"),
                Some(name),
                Some("int4"),
                Some("integer"),
                None,
                Some("f"),
                Some("4"),
                None,
                None,
            ]
        }
        let (upper, lower) = (row("1", "Id"), row("2", "id"));
        backend.on_rows("FROM pg_attribute", COLUMNS, &[&upper[..], &lower[..]]);

        let mut natural = connection(&backend, CaseFolding::Natural);
        assert_eq!(natural.describe_table("mixed", None).unwrap().len(), 2);

        let mut folded = connection(&backend, CaseFolding::Lower);
        let err = folded.describe_table("mixed", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PGSql statement execute error: columns 'Id' and 'id' of table 'mixed' both fold to key 'id'"
        );
    }

    #[test]
    fn describe_sql_carries_table_and_schema() {
        let backend = ScriptedBackend::new();
        let mut conn = connection(&backend, CaseFolding::Natural);
        let desc = conn.describe_table("o'brien", Some("sales")).unwrap();
        assert!(desc.is_empty());
        let sql = backend.executed().pop().unwrap();
        assert!(sql.contains("c.relname = 'o''brien'"));
        assert!(sql.contains("n.nspname = 'sales'"));
        assert!(sql.contains("co.contype = 'p'"));
        assert!(sql.ends_with("ORDER BY a.attnum"));
    }

    #[test]
    fn serializes_in_column_order() {
        let backend = ScriptedBackend::new();
        users_catalog(&backend);
        let mut conn = connection(&backend, CaseFolding::Natural);
        let desc = conn.describe_table("users", None).unwrap();
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["Id"]["PRIMARY_POSITION"], 1);
        assert_eq!(json["name"]["LENGTH"], 50);
        assert_eq!(json["name"]["NULLABLE"], true);
        let text = serde_json::to_string(&desc).unwrap();
        assert!(text.find("\"Id\"").unwrap() < text.find("\"name\"").unwrap());
    }

    #[test]
    fn primary_key_name_and_tables() {
        let backend = ScriptedBackend::new();
        users_catalog(&backend);
        backend.on_rows("FROM pg_class c, pg_user u", &["table_name"], &[&[Some("users")], &[Some("orders")]]);
        let mut conn = connection(&backend, CaseFolding::Natural);
        assert_eq!(conn.primary_key_name("users").unwrap().as_deref(), Some("Id"));
        assert_eq!(conn.primary_key_name("").unwrap(), None);
        assert_eq!(conn.list_tables().unwrap(), vec!["users", "orders"]);
    }
}
