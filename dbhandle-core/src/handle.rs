//! The database handle
//!
//! One `PgConnection`, opened once and shared by every clone of the handle.
//! There is no pool and no reconnect: if the connection dies, statements fail
//! and the caller decides what to do.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Connection, FromRow, Postgres};
use tokio::sync::{Mutex, MutexGuard};

use crate::config::{ConnectionTarget, DatabaseConfig};
use crate::error::{DbError, DbResult};
use crate::query::Statement;
use crate::schema::{Schema, TableDef};

/// Connected handle bound to a static schema.
///
/// Construct it once at startup with [`Database::connect`] and pass it (or
/// clones of it) to whatever needs database access. Clones are cheap and
/// share the same connection; statements issued through different clones are
/// serialized on it.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    conn: Mutex<PgConnection>,
    schema: &'static Schema,
    target: ConnectionTarget,
    server_version: Option<u32>,
    statements: AtomicU64,
}

impl Database {
    /// Open the connection described by `config` and bind it to `schema`.
    ///
    /// Performs exactly one network action (the connect handshake) and issues
    /// no statements.
    ///
    /// # Errors
    ///
    /// - connection kind: unparseable URI, unreachable server, rejected
    ///   credentials, or the configured timeout elapsing
    /// - schema kind: `schema` fails [`Schema::validate`]
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = DatabaseConfig::from_env()?;
    /// let db = Database::connect(&config, &APP_SCHEMA).await?;
    /// ```
    pub async fn connect(config: &DatabaseConfig, schema: &'static Schema) -> DbResult<Self> {
        let options = config.connect_options()?;
        schema.validate()?;

        let target = ConnectionTarget::from(&options);
        tracing::debug!(
            host = %target.host,
            port = target.port,
            database = target.database.as_deref().unwrap_or("-"),
            schema = schema.name,
            "connecting to database"
        );

        let connecting = PgConnection::connect_with(&options);
        let conn = match config.connect_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .map_err(|_| DbError::ConnectTimeout(timeout))?,
            None => connecting.await,
        }
        .map_err(DbError::Connect)?;

        let server_version = conn.server_version_num();
        tracing::info!(
            db = %target,
            server_version = server_version.unwrap_or_default(),
            "connected to database"
        );

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                conn: Mutex::new(conn),
                schema,
                target,
                server_version,
                statements: AtomicU64::new(0),
            }),
        })
    }

    /// Read configuration from the environment, then [`Database::connect`].
    pub async fn connect_from_env(schema: &'static Schema) -> DbResult<Self> {
        let config = DatabaseConfig::from_env()?;
        Self::connect(&config, schema).await
    }

    pub fn schema(&self) -> &'static Schema {
        self.inner.schema
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.inner.target
    }

    /// `server_version_num` reported during the startup handshake.
    pub fn server_version(&self) -> Option<u32> {
        self.inner.server_version
    }

    /// Whether `other` is a clone of this handle (same underlying connection).
    pub fn shares_connection(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Statements run through the query builders and [`Database::ping`] so far.
    /// Raw work done via [`Database::acquire`] is not counted.
    pub fn statements_issued(&self) -> u64 {
        self.inner.statements.load(Ordering::Relaxed)
    }

    /// Round-trip to the server.
    pub async fn ping(&self) -> DbResult<()> {
        let mut conn = self.statement().await;
        conn.ping().await?;
        Ok(())
    }

    /// Exclusive access to the raw connection for statements the builders
    /// don't cover. Other users of the handle wait until the guard drops.
    pub async fn acquire(&self) -> MutexGuard<'_, PgConnection> {
        self.inner.conn.lock().await
    }

    pub(crate) fn require_table(&self, table: &'static TableDef) -> DbResult<()> {
        if self.inner.schema.contains(table) {
            Ok(())
        } else {
            Err(DbError::UnknownTable {
                schema: self.inner.schema.name,
                table: table.name,
            })
        }
    }

    async fn statement(&self) -> MutexGuard<'_, PgConnection> {
        let guard = self.inner.conn.lock().await;
        self.inner.statements.fetch_add(1, Ordering::Relaxed);
        guard
    }

    pub(crate) async fn fetch_all<O>(&self, stmt: Statement) -> DbResult<Vec<O>>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let (sql, args) = stmt.into_parts()?;
        tracing::trace!(%sql, "fetch_all");
        let mut conn = self.statement().await;
        let rows = sqlx::query_as_with::<Postgres, O, _>(&sql, args)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    pub(crate) async fn fetch_optional<O>(&self, stmt: Statement) -> DbResult<Option<O>>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let (sql, args) = stmt.into_parts()?;
        tracing::trace!(%sql, "fetch_optional");
        let mut conn = self.statement().await;
        let row = sqlx::query_as_with::<Postgres, O, _>(&sql, args)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub(crate) async fn fetch_count(&self, stmt: Statement) -> DbResult<i64> {
        let (sql, args) = stmt.into_parts()?;
        tracing::trace!(%sql, "fetch_count");
        let mut conn = self.statement().await;
        let count: i64 = sqlx::query_scalar_with::<Postgres, i64, _>(&sql, args)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub(crate) async fn execute(&self, stmt: Statement) -> DbResult<u64> {
        let (sql, args) = stmt.into_parts()?;
        tracing::trace!(%sql, "execute");
        let mut conn = self.statement().await;
        let result = sqlx::query_with::<Postgres, _>(&sql, args).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("target", &self.inner.target)
            .field("schema", &self.inner.schema.name)
            .field("statements", &self.statements_issued())
            .finish()
    }
}
