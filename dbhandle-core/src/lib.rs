//! dbhandle-core: a single PostgreSQL connection bound to a static schema
//!
//! Startup reads `NEXT_DATABASE_URL`, opens one connection, and hands back a
//! [`Database`] that the application passes explicitly to whatever needs it.
//! Queries are built with the schema-checked builders in [`query`].

pub mod config;
pub mod error;
pub mod handle;
pub mod query;
pub mod schema;
pub mod value;

pub use config::{ConnectionTarget, DatabaseConfig, CONNECT_TIMEOUT_VAR, DATABASE_URL_VAR};
pub use error::{DbError, DbResult, ErrorKind};
pub use handle::Database;
pub use query::{delete, insert, select, update, Order, Statement};
pub use schema::{ColumnDef, ColumnType, Schema, Table, TableDef};
pub use value::Value;
