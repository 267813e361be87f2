//! Purpose: Define the public Rust API boundary for tabstore.
//! Exports: Catalog, table, schema, value, and error types needed by the CLI and embedders.
//! Role: Public, additive-only surface over the `core` modules.
//! Invariants: Callers reach storage only through `Database` and `Table`.
//! Invariants: Configuration is passed explicitly via `Config`; nothing is global.

pub use crate::core::catalog::{Config, Database, connect_database, create_database};
pub use crate::core::codec::{EncodedRow, TableDocument, encode_row};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::paths::{BASE_DIR_ENV, TABLE_EXTENSION, default_base_dir};
pub use crate::core::storage::{JsonFile, TableStorage};
pub use crate::core::table::{Predicate, Rows, Table};
pub use crate::core::types::{ColumnDef, Row, Schema, TypeTag, Value, format_date, parse_date};
