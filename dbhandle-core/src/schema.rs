//! Static schema description
//!
//! Tables are declared as `static` values and gathered into a [`Schema`]:
//!
//! ```ignore
//! static USERS: TableDef = TableDef::new(
//!     "users",
//!     &[
//!         ColumnDef::new("id", ColumnType::Uuid).primary_key(),
//!         ColumnDef::new("email", ColumnType::Text),
//!         ColumnDef::new("nickname", ColumnType::Text).nullable(),
//!     ],
//! );
//!
//! static APP: Schema = Schema::new("app", &[&USERS]);
//! ```
//!
//! A [`Table`] impl ties a row type to its declaration so queries built
//! through the handle decode into that type.

use std::collections::HashSet;
use std::fmt;

use sqlx::postgres::PgRow;
use sqlx::FromRow;

use crate::error::{DbError, DbResult};

/// PostgreSQL truncates identifiers beyond NAMEDATALEN - 1 bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    BigInt,
    Boolean,
    Double,
    Uuid,
    Timestamptz,
    Jsonb,
}

impl ColumnType {
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Boolean => "boolean",
            ColumnType::Double => "double precision",
            ColumnType::Uuid => "uuid",
            ColumnType::Timestamptz => "timestamptz",
            ColumnType::Jsonb => "jsonb",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            primary_key: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    pub const fn new(name: &'static str, columns: &'static [ColumnDef]) -> Self {
        Self { name, columns }
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, failing with a schema error if it isn't declared.
    pub fn require_column(&self, name: &str) -> DbResult<&'static ColumnDef> {
        self.column(name).ok_or_else(|| DbError::UnknownColumn {
            table: self.name,
            column: name.to_owned(),
        })
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub tables: &'static [&'static TableDef],
}

impl Schema {
    pub const fn new(name: &'static str, tables: &'static [&'static TableDef]) -> Self {
        Self { name, tables }
    }

    pub fn table(&self, name: &str) -> Option<&'static TableDef> {
        self.tables.iter().copied().find(|t| t.name == name)
    }

    pub fn contains(&self, table: &TableDef) -> bool {
        self.table(table.name).is_some_and(|t| t == table)
    }

    /// Check the declaration is usable before anything is sent to a server.
    pub fn validate(&self) -> DbResult<()> {
        let invalid = |reason: String| DbError::InvalidSchema {
            schema: self.name,
            reason,
        };

        let mut tables = HashSet::new();
        for table in self.tables {
            check_identifier(table.name).map_err(|why| invalid(format!("table {why}")))?;
            if !tables.insert(table.name) {
                return Err(invalid(format!("duplicate table '{}'", table.name)));
            }
            if table.columns.is_empty() {
                return Err(invalid(format!("table '{}' has no columns", table.name)));
            }

            let mut columns = HashSet::new();
            for column in table.columns {
                check_identifier(column.name)
                    .map_err(|why| invalid(format!("column in '{}' {why}", table.name)))?;
                if !columns.insert(column.name) {
                    return Err(invalid(format!(
                        "duplicate column '{}.{}'",
                        table.name, column.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_owned());
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "name '{name}' exceeds {MAX_IDENTIFIER_LEN} bytes"
        ));
    }
    if name.contains('\0') {
        return Err(format!("name '{}' contains a NUL byte", name.escape_debug()));
    }
    Ok(())
}

/// Binds a Rust row type to its table declaration.
pub trait Table {
    const DEF: &'static TableDef;
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;
}

/// Quote an identifier for interpolation into SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    static USERS: TableDef = TableDef::new(
        "users",
        &[
            ColumnDef::new("id", ColumnType::Uuid).primary_key(),
            ColumnDef::new("email", ColumnType::Text),
            ColumnDef::new("nickname", ColumnType::Text).nullable(),
        ],
    );

    static POSTS: TableDef = TableDef::new(
        "posts",
        &[
            ColumnDef::new("id", ColumnType::BigInt).primary_key(),
            ColumnDef::new("author_id", ColumnType::Uuid),
        ],
    );

    static APP: Schema = Schema::new("app", &[&USERS, &POSTS]);

    #[test]
    fn valid_schema_passes() {
        APP.validate().unwrap();
    }

    #[test]
    fn looks_up_tables_and_columns() {
        let users = APP.table("users").unwrap();
        assert!(users.column("nickname").unwrap().nullable);
        assert!(users.column("missing").is_none());
        assert_eq!(
            users.primary_key().map(|c| c.name).collect::<Vec<_>>(),
            vec!["id"]
        );
        assert!(APP.contains(&POSTS));
    }

    #[test]
    fn foreign_table_with_same_name_is_not_contained() {
        static OTHER_USERS: TableDef =
            TableDef::new("users", &[ColumnDef::new("id", ColumnType::Integer)]);
        assert!(!APP.contains(&OTHER_USERS));
    }

    #[test]
    fn require_column_reports_table() {
        let err = USERS.require_column("age").unwrap_err();
        assert_eq!(err.to_string(), "table 'users' has no column 'age'");
    }

    #[test]
    fn rejects_duplicate_tables() {
        static DUP: Schema = Schema::new("dup", &[&USERS, &USERS]);
        let err = DUP.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate table 'users'"));
    }

    #[test]
    fn rejects_duplicate_columns() {
        static T: TableDef = TableDef::new(
            "t",
            &[
                ColumnDef::new("a", ColumnType::Text),
                ColumnDef::new("a", ColumnType::Integer),
            ],
        );
        static S: Schema = Schema::new("s", &[&T]);
        assert!(S.validate().unwrap_err().to_string().contains("duplicate column 't.a'"));
    }

    #[test]
    fn rejects_empty_table_and_long_names() {
        static EMPTY: TableDef = TableDef::new("empty", &[]);
        static S1: Schema = Schema::new("s1", &[&EMPTY]);
        assert!(S1.validate().unwrap_err().to_string().contains("no columns"));

        static LONG: TableDef = TableDef::new(
            "a_table_name_that_goes_on_well_past_the_postgres_identifier_limit",
            &[ColumnDef::new("id", ColumnType::Integer)],
        );
        static S2: Schema = Schema::new("s2", &[&LONG]);
        assert!(S2.validate().unwrap_err().to_string().contains("exceeds 63 bytes"));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
