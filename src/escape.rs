//! Turning parameter values and identifiers into SQL text.
//!
//! Every value that ends up inlined into statement text goes through
//! [`quote_value`]; the substitution step in [`crate::translation`] never sees a
//! raw value.

use std::fmt::Write as _;

use crate::error::PgAdapterError;
use crate::native::NativeClient;
use crate::types::RowValues;

/// Symbol used to delimit identifiers.
pub const QUOTE_IDENTIFIER_SYMBOL: char = '"';

/// Render a value as a SQL literal token.
///
/// Numbers are returned unquoted, negative ones wrapped in parentheses so the
/// token cannot merge with a preceding `-` into a `--` comment. `Null` becomes
/// the bare `NULL` keyword, booleans become `TRUE`/`FALSE`, and everything else
/// is escaped with the link's escaping routine and wrapped in single quotes.
///
/// # Errors
/// `InvalidArgument` when a textual value contains a NUL character, which no
/// PostgreSQL text value can hold.
pub fn quote_value<C: NativeClient + ?Sized>(
    client: &C,
    value: &RowValues,
) -> Result<String, PgAdapterError> {
    Ok(match value {
        RowValues::Int(i) => self_delimited(i.to_string()),
        RowValues::Float(f) if f.is_finite() => self_delimited(f.to_string()),
        // NaN and the infinities are only valid as quoted float input
        RowValues::Float(f) => quote_str(client, &non_finite_text(*f))?,
        RowValues::Null => "NULL".to_string(),
        RowValues::Bool(true) => "TRUE".to_string(),
        RowValues::Bool(false) => "FALSE".to_string(),
        RowValues::Text(s) => quote_str(client, s)?,
        RowValues::Timestamp(dt) => {
            quote_str(client, &dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())?
        }
        RowValues::JSON(json) => quote_str(client, &json.to_string())?,
        RowValues::Blob(bytes) => quote_str(client, &bytea_hex(bytes))?,
    })
}

/// Escape a string and wrap it in single quotes.
///
/// # Errors
/// `InvalidArgument` when `value` contains a NUL character.
pub fn quote_str<C: NativeClient + ?Sized>(client: &C, value: &str) -> Result<String, PgAdapterError> {
    if value.contains('\0') {
        return Err(PgAdapterError::InvalidArgument(
            "text values cannot contain NUL characters".to_string(),
        ));
    }
    Ok(format!("'{}'", client.escape_string(value)))
}

fn self_delimited(number: String) -> String {
    if number.starts_with('-') {
        format!("({number})")
    } else {
        number
    }
}

fn non_finite_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_sign_positive() {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Quote an identifier, treating dots as qualifier separators (`schema.table`).
#[must_use]
pub fn quote_identifier(ident: &str) -> String {
    ident
        .split('.')
        .map(quote_identifier_part)
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a single identifier without splitting on dots.
#[must_use]
pub fn quote_identifier_part(ident: &str) -> String {
    let doubled = ident.replace(
        QUOTE_IDENTIFIER_SYMBOL,
        &format!("{QUOTE_IDENTIFIER_SYMBOL}{QUOTE_IDENTIFIER_SYMBOL}"),
    );
    format!("{QUOTE_IDENTIFIER_SYMBOL}{doubled}{QUOTE_IDENTIFIER_SYMBOL}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedClient;
    use chrono::NaiveDate;

    /// Reads a single-quoted literal back the way the server would.
    fn unquote(literal: &str) -> String {
        let inner = &literal[1..literal.len() - 1];
        inner.replace("''", "'")
    }

    #[test]
    fn numbers_are_not_quoted() {
        let client = ScriptedClient::default();
        assert_eq!(quote_value(&client, &RowValues::Int(42)).unwrap(), "42");
        assert_eq!(quote_value(&client, &RowValues::Int(-42)).unwrap(), "(-42)");
        assert_eq!(quote_value(&client, &RowValues::Float(-0.5)).unwrap(), "(-0.5)");
        assert_eq!(quote_value(&client, &RowValues::Float(2.5)).unwrap(), "2.5");
        assert_eq!(quote_value(&client, &RowValues::Float(f64::NAN)).unwrap(), "'NaN'");
        assert_eq!(
            quote_value(&client, &RowValues::Float(f64::NEG_INFINITY)).unwrap(),
            "'-Infinity'"
        );
    }

    #[test]
    fn null_and_bool_are_keywords() {
        let client = ScriptedClient::default();
        assert_eq!(quote_value(&client, &RowValues::Null).unwrap(), "NULL");
        assert_eq!(quote_value(&client, &RowValues::Bool(true)).unwrap(), "TRUE");
        assert_eq!(quote_value(&client, &RowValues::Bool(false)).unwrap(), "FALSE");
    }

    #[test]
    fn quotes_round_trip() {
        let client = ScriptedClient::default();
        for original in ["O'Brien", "'", "''; DROP TABLE users; --", "a''b'", "plain"] {
            let literal = quote_value(&client, &RowValues::Text(original.to_string())).unwrap();
            assert!(literal.starts_with('\'') && literal.ends_with('\''));
            assert_eq!(unquote(&literal), original);
        }
    }

    #[test]
    fn textual_values_are_quoted() {
        let client = ScriptedClient::default();
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        assert_eq!(
            quote_value(&client, &RowValues::Timestamp(ts)).unwrap(),
            "'2024-02-29 13:05:00'"
        );
        assert_eq!(
            quote_value(&client, &RowValues::JSON(serde_json::json!({"k": "it's"}))).unwrap(),
            r#"'{"k":"it''s"}'"#
        );
        assert_eq!(
            quote_value(&client, &RowValues::Blob(vec![0xde, 0xad])).unwrap(),
            r"'\xdead'"
        );
    }

    #[test]
    fn nul_characters_are_rejected() {
        let client = ScriptedClient::default();
        assert!(matches!(
            quote_value(&client, &RowValues::Text("ab\0cd".to_string())),
            Err(PgAdapterError::InvalidArgument(_))
        ));
        assert!(matches!(
            quote_str(&client, "\0"),
            Err(PgAdapterError::InvalidArgument(_))
        ));
    }

    #[test]
    fn identifiers_are_delimited() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("public.users"), "\"public\".\"users\"");
        assert_eq!(quote_identifier_part("we\"ird"), "\"we\"\"ird\"");
    }
}
