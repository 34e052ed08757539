//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::ConnectionConfig;
pub use crate::connection::{Binding, Connection, limit};
pub use crate::error::PgAdapterError;
pub use crate::escape::{quote_identifier, quote_value};
pub use crate::introspect::{ColumnDescriptor, TableDescription};
pub use crate::native::{Connector, NativeClient, PgConnector};
pub use crate::results::{DbRow, FetchedRow, ResultSet};
pub use crate::statement::{BindTarget, ColumnRef, ParamRef, Statement, StatementState};
pub use crate::translation::{count_placeholders, substitute_placeholders};
pub use crate::types::{CaseFolding, FetchMode, NumericClass, ParamStyle, RowValues};
