//! Raw executor contracts and their tokio-postgres implementations.
//!
//! These traits are the seam between the query adapters and the driver:
//! [`Db`](crate::Db) and [`Tx`](crate::Tx) only ever talk to a `RawQueryer`,
//! so any connection, pool or transaction that implements it can sit behind
//! the same `Queryer` interface.

use crate::config::TxOptions;
use crate::context::Context;
use crate::error::DriverError;
use crate::row::FromRow;
use deadpool_postgres::{Object, Pool};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_postgres::types::ToSql;
use tokio_postgres::{CancelToken, Row};

/// Metadata returned by a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self { rows_affected }
    }
}

/// Executes SQL text with positional arguments.
pub trait RawQueryer: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Row>, DriverError>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, DriverError>> + Send;

    /// Token for server-side cancellation of the statement in flight, if the
    /// connection is known up front.
    fn cancel_token(&self) -> Option<CancelToken> {
        None
    }

    /// Map the first row to `T`.
    ///
    /// - 0 rows: returns [`DriverError::NotFound`]
    /// - 1 or more rows: maps the first one
    fn get<T: FromRow + Send>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<T, DriverError>> + Send {
        async move { map_first(&self.query(sql, params).await?) }
    }

    /// Map every row to `T`.
    fn select<T: FromRow + Send>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<T>, DriverError>> + Send {
        async move { map_all(&self.query(sql, params).await?) }
    }

    /// [`query`](Self::query) bounded by `ctx`.
    ///
    /// The default races the statement against `ctx` and asks the server to
    /// cancel it through [`cancel_token`](Self::cancel_token). Implementors that
    /// only learn their connection at call time override this.
    fn query_context(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Row>, DriverError>> + Send {
        ctx.run(self.cancel_token(), self.query(sql, params))
    }

    /// [`execute`](Self::execute) bounded by `ctx`.
    fn execute_context(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, DriverError>> + Send {
        ctx.run(self.cancel_token(), self.execute(sql, params))
    }

    fn get_context<T: FromRow + Send>(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<T, DriverError>> + Send {
        async move { map_first(&self.query_context(ctx, sql, params).await?) }
    }

    fn select_context<T: FromRow + Send>(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<T>, DriverError>> + Send {
        async move { map_all(&self.query_context(ctx, sql, params).await?) }
    }
}

fn map_first<T: FromRow>(rows: &[Row]) -> Result<T, DriverError> {
    let row = rows
        .first()
        .ok_or_else(|| DriverError::not_found("Expected one row, got none"))?;
    T::from_row(row)
}

fn map_all<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, DriverError> {
    rows.iter().map(T::from_row).collect()
}

/// A raw handle that can open transactions.
pub trait RawBeginner: RawQueryer {
    type Tx: RawTransaction;

    fn begin(&self, opts: &TxOptions) -> impl Future<Output = Result<Self::Tx, DriverError>> + Send;
}

/// A raw in-flight transaction.
pub trait RawTransaction: RawQueryer {
    fn commit(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn rollback(&self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

impl RawQueryer for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, DriverError> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DriverError> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }

    fn cancel_token(&self) -> Option<CancelToken> {
        Some(tokio_postgres::Client::cancel_token(self))
    }
}

/// Each call checks out its own connection and returns it afterwards.
///
/// Context-bound calls check out first, then race the statement with that
/// connection's cancel token. A connection whose statement was abandoned is
/// detached instead of going back to the pool.
impl RawQueryer for Pool {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, DriverError> {
        let conn = self.get().await?;
        RawQueryer::query(&**conn, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DriverError> {
        let conn = self.get().await?;
        RawQueryer::execute(&**conn, sql, params).await
    }

    async fn query_context(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        let conn = checkout(self, ctx).await?;
        let cancel = tokio_postgres::Client::cancel_token(&conn);
        let result = ctx
            .run(Some(cancel), RawQueryer::query(&**conn, sql, params))
            .await;
        release(conn, &result);
        result
    }

    async fn execute_context(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, DriverError> {
        let conn = checkout(self, ctx).await?;
        let cancel = tokio_postgres::Client::cancel_token(&conn);
        let result = ctx
            .run(Some(cancel), RawQueryer::execute(&**conn, sql, params))
            .await;
        release(conn, &result);
        result
    }
}

async fn checkout(pool: &Pool, ctx: &Context) -> Result<Object, DriverError> {
    ctx.run(None, async { pool.get().await.map_err(DriverError::from) })
        .await
}

fn release<T>(conn: Object, result: &Result<T, DriverError>) {
    if let Err(err) = result {
        if err.is_context_done() {
            // may still be running the abandoned statement
            drop(Object::take(conn));
        }
    }
}

impl RawBeginner for Pool {
    type Tx = PgTx;

    async fn begin(&self, opts: &TxOptions) -> Result<PgTx, DriverError> {
        let tx = PgTx::new(self.get().await?);
        tx.client()?.batch_execute(&opts.begin_sql()).await?;
        Ok(tx)
    }
}

/// A transaction that owns one pooled connection.
///
/// The connection stays checked out until the `PgTx` is dropped. If it is
/// dropped while still open (no successful COMMIT or ROLLBACK), the connection
/// is detached from the pool and closed, and the server aborts the transaction.
///
/// Once COMMIT or ROLLBACK has succeeded, every further call fails with
/// [`DriverError::TxDone`] without touching the connection.
pub struct PgTx {
    conn: Option<Object>,
    open: AtomicBool,
}

impl PgTx {
    fn new(conn: Object) -> Self {
        Self {
            conn: Some(conn),
            open: AtomicBool::new(true),
        }
    }

    fn client(&self) -> Result<&tokio_postgres::Client, DriverError> {
        match &self.conn {
            // Object -> ClientWrapper -> Client
            Some(conn) => Ok(&***conn),
            None => Err(DriverError::Other(
                "transaction connection released".to_string(),
            )),
        }
    }

    /// Whether neither COMMIT nor ROLLBACK has succeeded yet.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// The connection, as long as the transaction has not ended.
    fn open_client(&self) -> Result<&tokio_postgres::Client, DriverError> {
        if !self.is_open() {
            return Err(DriverError::TxDone);
        }
        self.client()
    }

    async fn finish(&self, sql: &str) -> Result<(), DriverError> {
        self.open_client()?.batch_execute(sql).await?;
        self.open.store(false, Ordering::Release);
        Ok(())
    }
}

impl RawQueryer for PgTx {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, DriverError> {
        RawQueryer::query(self.open_client()?, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DriverError> {
        RawQueryer::execute(self.open_client()?, sql, params).await
    }

    fn cancel_token(&self) -> Option<CancelToken> {
        self.client().ok().and_then(RawQueryer::cancel_token)
    }
}

impl RawTransaction for PgTx {
    async fn commit(&self) -> Result<(), DriverError> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for PgTx {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Some(conn) = self.conn.take() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                target: "easql.tx",
                "transaction dropped without commit or rollback; closing its connection"
            );
            drop(Object::take(conn));
        }
    }
}
