//! Schema-typed query builders
//!
//! Builders are plain values: they render to a [`Statement`] without touching
//! the network and run against a [`Database`] passed in at execution time,
//! the same shape as `sqlx::query(..).fetch_all(&pool)`.
//!
//! ```ignore
//! let rows = select::<Users>()
//!     .eq("email", "ada@example.com")
//!     .order_by("created_at", Order::Desc)
//!     .limit(10)
//!     .fetch_all(&db)
//!     .await?;
//! ```
//!
//! Column names are checked against the table declaration as the builder is
//! assembled. The first problem is kept and reported when the builder is
//! rendered or executed.

use std::fmt::Write as _;
use std::marker::PhantomData;

use sqlx::postgres::PgArguments;

use crate::error::{DbError, DbResult};
use crate::handle::Database;
use crate::schema::{quote_ident, ColumnDef, Table, TableDef};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Rendered SQL with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Statement {
    fn new() -> Self {
        Self {
            sql: String::new(),
            values: Vec::new(),
        }
    }

    /// Append a value: NULL inline, anything else as the next `$n`.
    fn push_value(&mut self, value: Value) {
        if value.is_null() {
            self.sql.push_str("NULL");
        } else {
            self.values.push(value);
            let _ = write!(self.sql, "${}", self.values.len());
        }
    }

    pub(crate) fn into_parts(self) -> DbResult<(String, PgArguments)> {
        let mut args = PgArguments::default();
        for value in self.values {
            value.bind(&mut args)?;
        }
        Ok((self.sql, args))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Compare {
        column: &'static str,
        op: CompareOp,
        value: Value,
    },
    IsNull(&'static str),
    IsNotNull(&'static str),
}

/// State shared by every builder: the target table, its conditions and the
/// first error seen while assembling.
#[derive(Debug)]
struct Draft {
    table: &'static TableDef,
    conditions: Vec<Condition>,
    error: Option<DbError>,
}

impl Draft {
    fn new(table: &'static TableDef) -> Self {
        Self {
            table,
            conditions: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: DbError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn column(&mut self, name: &str) -> Option<&'static ColumnDef> {
        match self.table.require_column(name) {
            Ok(column) => Some(column),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// Resolve `name` and check `value` fits it.
    fn typed_column(&mut self, name: &str, value: &Value) -> Option<&'static ColumnDef> {
        let column = self.column(name)?;
        match value.check_column(self.table.name, column) {
            Ok(()) => Some(column),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    fn compare(&mut self, name: &str, op: CompareOp, value: Value) {
        if value.is_null() {
            let Some(column) = self.column(name) else {
                return;
            };
            match op {
                CompareOp::Eq => self.conditions.push(Condition::IsNull(column.name)),
                CompareOp::Ne => self.conditions.push(Condition::IsNotNull(column.name)),
                _ => self.fail(DbError::InvalidQuery(format!(
                    "cannot compare '{}' {} NULL",
                    column.name,
                    op.sql()
                ))),
            }
            return;
        }

        if let Some(column) = self.typed_column(name, &value) {
            self.conditions.push(Condition::Compare {
                column: column.name,
                op,
                value,
            });
        }
    }

    fn null_check(&mut self, name: &str, is_null: bool) {
        if let Some(column) = self.column(name) {
            self.conditions.push(if is_null {
                Condition::IsNull(column.name)
            } else {
                Condition::IsNotNull(column.name)
            });
        }
    }

    /// Fail if assembly hit a problem. The error stays on the draft, so every
    /// render of a rejected builder fails, not just the first.
    fn check(&self) -> DbResult<()> {
        match &self.error {
            Some(err) => Err(reissue(err)),
            None => Ok(()),
        }
    }

    fn write_where(&self, stmt: &mut Statement) {
        for (i, condition) in self.conditions.iter().enumerate() {
            stmt.sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Compare { column, op, value } => {
                    let _ = write!(stmt.sql, "{} {} ", quote_ident(column), op.sql());
                    stmt.push_value(value.clone());
                }
                Condition::IsNull(column) => {
                    let _ = write!(stmt.sql, "{} IS NULL", quote_ident(column));
                }
                Condition::IsNotNull(column) => {
                    let _ = write!(stmt.sql, "{} IS NOT NULL", quote_ident(column));
                }
            }
        }
    }
}

/// Copy of an assembly error. Drafts only record the variants matched here.
fn reissue(err: &DbError) -> DbError {
    match err {
        DbError::UnknownColumn { table, column } => DbError::UnknownColumn {
            table: *table,
            column: column.clone(),
        },
        DbError::TypeMismatch {
            table,
            column,
            expected,
            actual,
        } => DbError::TypeMismatch {
            table: *table,
            column: *column,
            expected: expected.clone(),
            actual: *actual,
        },
        DbError::InvalidQuery(reason) => DbError::InvalidQuery(reason.clone()),
        other => DbError::InvalidQuery(other.to_string()),
    }
}

fn column_list(columns: &[ColumnDef]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

macro_rules! impl_conditions {
    ($($builder:ident),*) => {
        $(
            impl<T: Table> $builder<T> {
                pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
                    self.draft.compare(column, CompareOp::Eq, value.into());
                    self
                }

                pub fn ne(mut self, column: &str, value: impl Into<Value>) -> Self {
                    self.draft.compare(column, CompareOp::Ne, value.into());
                    self
                }

                pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
                    self.draft.compare(column, CompareOp::Lt, value.into());
                    self
                }

                pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
                    self.draft.compare(column, CompareOp::Lte, value.into());
                    self
                }

                pub fn gt(mut self, column: &str, value: impl Into<Value>) -> Self {
                    self.draft.compare(column, CompareOp::Gt, value.into());
                    self
                }

                pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
                    self.draft.compare(column, CompareOp::Gte, value.into());
                    self
                }

                pub fn is_null(mut self, column: &str) -> Self {
                    self.draft.null_check(column, true);
                    self
                }

                pub fn is_not_null(mut self, column: &str) -> Self {
                    self.draft.null_check(column, false);
                    self
                }
            }
        )*
    };
}

impl_conditions!(Select, Update, Delete);

// ============================================================================
// SELECT
// ============================================================================

pub fn select<T: Table>() -> Select<T> {
    Select {
        draft: Draft::new(T::DEF),
        order: Vec::new(),
        limit: None,
        offset: None,
        _row: PhantomData,
    }
}

#[derive(Debug)]
pub struct Select<T: Table> {
    draft: Draft,
    order: Vec<(&'static str, Order)>,
    limit: Option<u32>,
    offset: Option<u32>,
    _row: PhantomData<fn() -> T>,
}

impl<T: Table> Select<T> {
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        if let Some(column) = self.draft.column(column) {
            self.order.push((column.name, order));
        }
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn to_statement(&self) -> DbResult<Statement> {
        self.draft.check()?;

        let mut stmt = Statement::new();
        let _ = write!(
            stmt.sql,
            "SELECT {} FROM {}",
            column_list(T::DEF.columns),
            quote_ident(T::DEF.name)
        );
        self.draft.write_where(&mut stmt);

        for (i, (column, order)) in self.order.iter().enumerate() {
            stmt.sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
            let _ = write!(stmt.sql, "{} {}", quote_ident(column), order.sql());
        }
        if let Some(limit) = self.limit {
            stmt.sql.push_str(" LIMIT ");
            stmt.push_value(Value::BigInt(limit.into()));
        }
        if let Some(offset) = self.offset {
            stmt.sql.push_str(" OFFSET ");
            stmt.push_value(Value::BigInt(offset.into()));
        }
        Ok(stmt)
    }

    /// Render `SELECT COUNT(*)` over the same conditions. Ordering and paging
    /// are ignored.
    pub fn to_count_statement(&self) -> DbResult<Statement> {
        self.draft.check()?;

        let mut stmt = Statement::new();
        let _ = write!(stmt.sql, "SELECT COUNT(*) FROM {}", quote_ident(T::DEF.name));
        self.draft.write_where(&mut stmt);
        Ok(stmt)
    }

    pub async fn fetch_all(self, db: &Database) -> DbResult<Vec<T::Row>> {
        db.require_table(T::DEF)?;
        let stmt = self.to_statement()?;
        db.fetch_all::<T::Row>(stmt).await
    }

    pub async fn fetch_optional(self, db: &Database) -> DbResult<Option<T::Row>> {
        db.require_table(T::DEF)?;
        let stmt = self.to_statement()?;
        db.fetch_optional::<T::Row>(stmt).await
    }

    /// Fetch exactly one row; zero rows is `sqlx::Error::RowNotFound`.
    pub async fn fetch_one(self, db: &Database) -> DbResult<T::Row> {
        self.fetch_optional(db)
            .await?
            .ok_or(DbError::Query(sqlx::Error::RowNotFound))
    }

    pub async fn count(self, db: &Database) -> DbResult<i64> {
        db.require_table(T::DEF)?;
        let stmt = self.to_count_statement()?;
        db.fetch_count(stmt).await
    }
}

// ============================================================================
// INSERT
// ============================================================================

pub fn insert<T: Table>() -> Insert<T> {
    Insert {
        draft: Draft::new(T::DEF),
        values: Vec::new(),
        _row: PhantomData,
    }
}

#[derive(Debug)]
pub struct Insert<T: Table> {
    draft: Draft,
    values: Vec<(&'static str, Value)>,
    _row: PhantomData<fn() -> T>,
}

impl<T: Table> Insert<T> {
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(column) = self.draft.typed_column(column, &value) {
            if self.values.iter().any(|(name, _)| *name == column.name) {
                self.draft.fail(DbError::InvalidQuery(format!(
                    "column '{}' set more than once",
                    column.name
                )));
            } else {
                self.values.push((column.name, value));
            }
        }
        self
    }

    pub fn to_statement(&self) -> DbResult<Statement> {
        self.draft.check()?;
        if self.values.is_empty() {
            return Err(DbError::InvalidQuery(format!(
                "insert into '{}' has no values",
                T::DEF.name
            )));
        }

        let mut stmt = Statement::new();
        let columns = self
            .values
            .iter()
            .map(|(name, _)| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(
            stmt.sql,
            "INSERT INTO {} ({}) VALUES (",
            quote_ident(T::DEF.name),
            columns
        );
        for (i, (_, value)) in self.values.iter().enumerate() {
            if i > 0 {
                stmt.sql.push_str(", ");
            }
            stmt.push_value(value.clone());
        }
        stmt.sql.push(')');
        Ok(stmt)
    }

    pub fn to_returning_statement(&self) -> DbResult<Statement> {
        let mut stmt = self.to_statement()?;
        let _ = write!(stmt.sql, " RETURNING {}", column_list(T::DEF.columns));
        Ok(stmt)
    }

    /// Run the insert and return the number of rows written.
    pub async fn execute(self, db: &Database) -> DbResult<u64> {
        db.require_table(T::DEF)?;
        let stmt = self.to_statement()?;
        db.execute(stmt).await
    }

    /// Run the insert and decode the stored row, including server defaults.
    pub async fn returning(self, db: &Database) -> DbResult<T::Row> {
        db.require_table(T::DEF)?;
        let stmt = self.to_returning_statement()?;
        db.fetch_optional::<T::Row>(stmt)
            .await?
            .ok_or(DbError::Query(sqlx::Error::RowNotFound))
    }
}

// ============================================================================
// UPDATE
// ============================================================================

pub fn update<T: Table>() -> Update<T> {
    Update {
        draft: Draft::new(T::DEF),
        assignments: Vec::new(),
        _row: PhantomData,
    }
}

#[derive(Debug)]
pub struct Update<T: Table> {
    draft: Draft,
    assignments: Vec<(&'static str, Value)>,
    _row: PhantomData<fn() -> T>,
}

impl<T: Table> Update<T> {
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(column) = self.draft.typed_column(column, &value) {
            match self.assignments.iter_mut().find(|(name, _)| *name == column.name) {
                Some((_, existing)) => *existing = value,
                None => self.assignments.push((column.name, value)),
            }
        }
        self
    }

    pub fn to_statement(&self) -> DbResult<Statement> {
        self.draft.check()?;
        if self.assignments.is_empty() {
            return Err(DbError::InvalidQuery(format!(
                "update of '{}' sets no columns",
                T::DEF.name
            )));
        }

        let mut stmt = Statement::new();
        let _ = write!(stmt.sql, "UPDATE {} SET ", quote_ident(T::DEF.name));
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                stmt.sql.push_str(", ");
            }
            let _ = write!(stmt.sql, "{} = ", quote_ident(column));
            stmt.push_value(value.clone());
        }
        self.draft.write_where(&mut stmt);
        Ok(stmt)
    }

    pub async fn execute(self, db: &Database) -> DbResult<u64> {
        db.require_table(T::DEF)?;
        let stmt = self.to_statement()?;
        db.execute(stmt).await
    }
}

// ============================================================================
// DELETE
// ============================================================================

pub fn delete<T: Table>() -> Delete<T> {
    Delete {
        draft: Draft::new(T::DEF),
        _row: PhantomData,
    }
}

#[derive(Debug)]
pub struct Delete<T: Table> {
    draft: Draft,
    _row: PhantomData<fn() -> T>,
}

impl<T: Table> Delete<T> {
    pub fn to_statement(&self) -> DbResult<Statement> {
        self.draft.check()?;

        let mut stmt = Statement::new();
        let _ = write!(stmt.sql, "DELETE FROM {}", quote_ident(T::DEF.name));
        self.draft.write_where(&mut stmt);
        Ok(stmt)
    }

    pub async fn execute(self, db: &Database) -> DbResult<u64> {
        db.require_table(T::DEF)?;
        let stmt = self.to_statement()?;
        db.execute(stmt).await
    }
}
