use std::sync::LazyLock;

use regex::Regex;

use super::ColumnDescriptor;
use crate::error::PgAdapterError;
use crate::types::RowValues;

// Matches the length suffix in `character varying(50)` / `character(10)`.
static CHARACTER_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"character(?: varying)?(?:\((\d+)\))?").expect("character length pattern")
});

// Matches a quoted literal default cast to a character type, e.g. `'n/a'::character varying`.
static CHARACTER_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^'(.*?)'::(?:character varying|bpchar)$").expect("character default pattern")
});

// Positions in the catalog query's select list.
const ATTNUM: usize = 0;
const NSPNAME: usize = 1;
const RELNAME: usize = 2;
const COLNAME: usize = 3;
const TYPE: usize = 4;
const COMPLETE_TYPE: usize = 5;
const DEFAULT_VALUE: usize = 6;
const NOTNULL: usize = 7;
const LENGTH: usize = 8;
const CONTYPE: usize = 9;
const CONKEY: usize = 10;

/// One row of the catalog query, still in catalog terms.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CatalogRow {
    pub attnum: i32,
    pub schema: String,
    pub table: String,
    pub column: String,
    pub type_name: String,
    pub complete_type: String,
    pub default: Option<String>,
    pub not_null: bool,
    pub attlen: Option<i32>,
    pub contype: Option<String>,
    pub conkey: Option<String>,
}

fn text(values: &[RowValues], idx: usize) -> Option<&str> {
    values.get(idx).and_then(RowValues::as_text)
}

fn required(values: &[RowValues], idx: usize, name: &str) -> Result<String, PgAdapterError> {
    text(values, idx).map(str::to_string).ok_or_else(|| {
        PgAdapterError::StatementError(format!("catalog row is missing {name}"))
    })
}

pub(crate) fn decode_row(values: &[RowValues]) -> Result<CatalogRow, PgAdapterError> {
    let attnum = text(values, ATTNUM)
        .and_then(|s| s.trim().parse::<i32>().ok())
        .ok_or_else(|| {
            PgAdapterError::StatementError("catalog row has no column number".to_string())
        })?;
    Ok(CatalogRow {
        attnum,
        schema: required(values, NSPNAME, "schema name")?,
        table: required(values, RELNAME, "table name")?,
        column: required(values, COLNAME, "column name")?,
        type_name: required(values, TYPE, "type name")?,
        complete_type: text(values, COMPLETE_TYPE).unwrap_or_default().to_string(),
        default: text(values, DEFAULT_VALUE).map(str::to_string),
        not_null: values
            .get(NOTNULL)
            .and_then(RowValues::as_bool)
            .unwrap_or(false),
        attlen: text(values, LENGTH).and_then(|s| s.trim().parse().ok()),
        contype: text(values, CONTYPE).map(str::to_string),
        conkey: text(values, CONKEY).map(str::to_string),
    })
}

fn is_character_type(type_name: &str) -> bool {
    matches!(type_name, "varchar" | "bpchar")
}

/// Declared length: the `(n)` of character types, otherwise the fixed storage
/// width. `None` for unbounded or variable-width types.
pub(crate) fn declared_length(type_name: &str, complete_type: &str, attlen: Option<i32>) -> Option<u32> {
    if is_character_type(type_name) {
        return CHARACTER_LENGTH
            .captures(complete_type)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
    }
    attlen.and_then(|len| u32::try_from(len).ok()).filter(|len| *len > 0)
}

/// Strip the cast from a character-type literal default and unescape it.
pub(crate) fn clean_default(type_name: &str, default: Option<String>) -> Option<String> {
    let default = default?;
    if !is_character_type(type_name) {
        return Some(default);
    }
    match CHARACTER_DEFAULT.captures(&default) {
        Some(caps) => caps.get(1).map(|m| m.as_str().replace("''", "'")),
        None => Some(default),
    }
}

/// 1-based position of `attnum` within a comma-separated constraint key list.
pub(crate) fn key_position(attnum: i32, conkey: &str) -> Option<usize> {
    conkey
        .split(',')
        .position(|key| key.trim().parse::<i32>().ok() == Some(attnum))
        .map(|idx| idx + 1)
}

pub(crate) fn is_sequence_default(default: Option<&str>) -> bool {
    default.is_some_and(|d| d.trim_start().starts_with("nextval("))
}

pub(crate) fn describe_column(row: CatalogRow) -> ColumnDescriptor {
    let primary_position = match (row.contype.as_deref(), row.conkey.as_deref()) {
        (Some("p"), Some(conkey)) => key_position(row.attnum, conkey),
        _ => None,
    };
    let identity = is_sequence_default(row.default.as_deref());
    let length = declared_length(&row.type_name, &row.complete_type, row.attlen);
    let default = clean_default(&row.type_name, row.default);

    ColumnDescriptor {
        schema_name: row.schema,
        table_name: row.table,
        column_name: row.column,
        column_position: row.attnum,
        data_type: row.type_name,
        default,
        nullable: !row.not_null,
        length,
        scale: None,
        precision: None,
        unsigned: None,
        primary: primary_position.is_some(),
        primary_position,
        identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[Option<&str>]) -> Vec<RowValues> {
        values.iter().map(|v| RowValues::from_cell(*v)).collect()
    }

    #[test]
    fn length_of_character_types() {
        assert_eq!(
            declared_length("varchar", "character varying(50)", Some(-1)),
            Some(50)
        );
        assert_eq!(declared_length("bpchar", "character(10)", Some(-1)), Some(10));
        assert_eq!(declared_length("varchar", "character varying", Some(-1)), None);
        assert_eq!(declared_length("text", "text", Some(-1)), None);
        assert_eq!(declared_length("int4", "integer", Some(4)), Some(4));
    }

    #[test]
    fn character_defaults_lose_their_cast() {
        assert_eq!(
            clean_default("varchar", Some("'n/a'::character varying".into())).as_deref(),
            Some("n/a")
        );
        assert_eq!(
            clean_default("bpchar", Some("'it''s'::bpchar".into())).as_deref(),
            Some("it's")
        );
        assert_eq!(
            clean_default("int4", Some("nextval('t_id_seq'::regclass)".into())).as_deref(),
            Some("nextval('t_id_seq'::regclass)")
        );
        assert_eq!(
            clean_default("varchar", Some("upper('x'::text)".into())).as_deref(),
            Some("upper('x'::text)")
        );
        assert_eq!(clean_default("varchar", None), None);
    }

    #[test]
    fn key_positions_follow_constraint_order() {
        assert_eq!(key_position(3, "3,1"), Some(1));
        assert_eq!(key_position(1, "3,1"), Some(2));
        assert_eq!(key_position(2, "3,1"), None);
        assert_eq!(key_position(1, ""), None);
    }

    #[test]
    fn sequence_defaults() {
        assert!(is_sequence_default(Some("nextval('users_id_seq'::regclass)")));
        assert!(!is_sequence_default(Some("0")));
        assert!(!is_sequence_default(None));
    }

    #[test]
    fn decodes_and_describes_a_serial_key() {
        let row = decode_row(&cells(&[
            Some("1"),
            Some("public"),
            Some("users"),
            Some("id"),
            Some("int4"),
            Some("integer"),
            Some("nextval('users_id_seq'::regclass)"),
            Some("t"),
            Some("4"),
            Some("p"),
            Some("1"),
        ]))
        .unwrap();
        let col = describe_column(row);
        assert_eq!(col.column_name, "id");
        assert_eq!(col.column_position, 1);
        assert!(col.primary);
        assert_eq!(col.primary_position, Some(1));
        assert!(col.identity);
        assert!(!col.nullable);
        assert_eq!(col.length, Some(4));
    }

    #[test]
    fn decodes_a_plain_nullable_column() {
        let row = decode_row(&cells(&[
            Some("2"),
            Some("public"),
            Some("users"),
            Some("bio"),
            Some("text"),
            Some("text"),
            None,
            Some("f"),
            Some("-1"),
            None,
            None,
        ]))
        .unwrap();
        let col = describe_column(row);
        assert!(col.nullable);
        assert!(!col.primary);
        assert_eq!(col.primary_position, None);
        assert_eq!(col.length, None);
        assert_eq!(col.default, None);
        assert!(!col.identity);
    }

    #[test]
    fn malformed_rows_are_errors() {
        assert!(decode_row(&cells(&[Some("x")])).is_err());
        assert!(decode_row(&cells(&[Some("1"), Some("public")])).is_err());
    }
}
