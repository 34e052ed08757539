//! Synchronous PostgreSQL adapter over a text-only client protocol.
//!
//! Parameters are escaped client-side and spliced into `?` placeholders, rows
//! come back as text in several fetch shapes, and table metadata is read from
//! the system catalogs.
//!
//! ```rust,no_run
//! use pgsql_text_adapter::prelude::*;
//!
//! # fn main() -> Result<(), PgAdapterError> {
//! let mut conn = Connection::new(ConnectionConfig::new("localhost", "app", "app_user"));
//! let id = conn.insert("users", &[("name", "ann".into())])?;
//! let users = conn.describe_table("users", None)?;
//! println!("{id:?} {}", users.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod escape;
pub mod introspect;
pub mod native;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod test_utils;
pub mod translation;
pub mod types;

pub use config::ConnectionConfig;
pub use connection::{Binding, Connection};
pub use error::PgAdapterError;
pub use introspect::{ColumnDescriptor, TableDescription};
pub use results::{DbRow, FetchedRow, ResultSet};
pub use statement::{Statement, StatementState};
pub use types::{CaseFolding, FetchMode, NumericClass, ParamStyle, RowValues};
