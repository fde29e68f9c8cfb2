//! Bind values for the query façade

use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::Arguments;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::schema::{ColumnDef, ColumnType};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double precision",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamptz",
            Value::Json(_) => "jsonb",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value may be stored in or compared against `column`.
    pub fn check_column(&self, table: &'static str, column: &ColumnDef) -> DbResult<()> {
        let ok = match (self, column.ty) {
            (Value::Null, _) => column.nullable,
            (Value::Bool(_), ColumnType::Boolean)
            | (Value::Int(_), ColumnType::Integer | ColumnType::BigInt)
            | (Value::BigInt(_), ColumnType::BigInt)
            | (Value::Double(_), ColumnType::Double)
            | (Value::Text(_), ColumnType::Text)
            | (Value::Uuid(_), ColumnType::Uuid)
            | (Value::Timestamp(_), ColumnType::Timestamptz)
            | (Value::Json(_), ColumnType::Jsonb) => true,
            _ => false,
        };

        if ok {
            return Ok(());
        }

        let expected = if column.nullable {
            format!("{} (nullable)", column.ty)
        } else {
            column.ty.to_string()
        };
        Err(DbError::TypeMismatch {
            table,
            column: column.name,
            expected,
            actual: self.type_name(),
        })
    }

    /// Append this value to `args`. Null is rendered inline and never bound.
    pub(crate) fn bind(self, args: &mut PgArguments) -> DbResult<()> {
        let added = match self {
            Value::Null => {
                return Err(DbError::InvalidQuery(
                    "NULL must be rendered inline, not bound".to_owned(),
                ))
            }
            Value::Bool(v) => args.add(v),
            Value::Int(v) => args.add(v),
            Value::BigInt(v) => args.add(v),
            Value::Double(v) => args.add(v),
            Value::Text(v) => args.add(v),
            Value::Uuid(v) => args.add(v),
            Value::Timestamp(v) => args.add(v),
            Value::Json(v) => args.add(v),
        };
        added.map_err(|e| DbError::Query(sqlx::Error::Encode(e)))
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => BigInt,
    f64 => Double,
    String => Text,
    &str => Text,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    serde_json::Value => Json,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
