//! Recording raw executors for unit tests.
//!
//! `tokio_postgres::Row` cannot be built outside the driver, so reads always
//! come back empty; tests assert on the recorded SQL and arguments instead.

use crate::config::TxOptions;
use crate::context::Context;
use crate::error::DriverError;
use crate::raw::{RawBeginner, RawQueryer, RawTransaction};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Via {
    Db,
    Tx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Query,
    Execute,
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub via: Via,
    pub kind: Kind,
    pub sql: String,
    pub args: Vec<String>,
}

#[derive(Default)]
pub(crate) struct MockState {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<Vec<Kind>>,
    rows_affected: AtomicU64,
    stall: AtomicBool,
    context_calls: AtomicUsize,
}

impl MockState {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every later call of `kind` fail.
    pub fn fail(&self, kind: Kind) {
        self.failing.lock().unwrap().push(kind);
    }

    pub fn set_rows_affected(&self, n: u64) {
        self.rows_affected.store(n, Ordering::SeqCst);
    }

    /// Calls that came in through the context-bound entry points.
    pub fn context_calls(&self) -> usize {
        self.context_calls.load(Ordering::SeqCst)
    }

    /// Make queries and executes hang until dropped.
    pub fn stall(&self) {
        self.stall.store(true, Ordering::SeqCst);
    }

    fn record(
        &self,
        via: Via,
        kind: Kind,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<(), DriverError> {
        self.calls.lock().unwrap().push(Call {
            via,
            kind,
            sql: sql.to_string(),
            args: params.iter().map(|p| format!("{p:?}")).collect(),
        });
        if self.failing.lock().unwrap().contains(&kind) {
            return Err(DriverError::Other(format!("mock {kind:?} failure")));
        }
        Ok(())
    }

    async fn query(&self, via: Via, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, DriverError> {
        self.record(via, Kind::Query, sql, params)?;
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(vec![])
    }

    async fn execute(&self, via: Via, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DriverError> {
        self.record(via, Kind::Execute, sql, params)?;
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self.rows_affected.load(Ordering::SeqCst))
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockDb {
    pub state: Arc<MockState>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter_context(&self) {
        self.state.context_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl RawQueryer for MockDb {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, DriverError> {
        self.state.query(Via::Db, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DriverError> {
        self.state.execute(Via::Db, sql, params).await
    }

    async fn query_context(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DriverError> {
        self.enter_context();
        ctx.run(None, self.query(sql, params)).await
    }

    async fn execute_context(
        &self,
        ctx: &Context,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, DriverError> {
        self.enter_context();
        ctx.run(None, self.execute(sql, params)).await
    }
}

impl RawBeginner for MockDb {
    type Tx = MockTx;

    async fn begin(&self, opts: &TxOptions) -> Result<MockTx, DriverError> {
        self.state.record(Via::Db, Kind::Begin, &opts.begin_sql(), &[])?;
        Ok(MockTx {
            state: self.state.clone(),
            done: AtomicBool::new(false),
        })
    }
}

pub(crate) struct MockTx {
    state: Arc<MockState>,
    done: AtomicBool,
}

impl MockTx {
    /// Same contract as `PgTx`: nothing reaches the driver once the
    /// transaction has ended.
    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.done.load(Ordering::SeqCst) {
            return Err(DriverError::TxDone);
        }
        Ok(())
    }

    fn finish(&self, kind: Kind, sql: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.state.record(Via::Tx, kind, sql, &[])?;
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl RawQueryer for MockTx {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, DriverError> {
        self.ensure_open()?;
        self.state.query(Via::Tx, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DriverError> {
        self.ensure_open()?;
        self.state.execute(Via::Tx, sql, params).await
    }
}

impl RawTransaction for MockTx {
    async fn commit(&self) -> Result<(), DriverError> {
        self.finish(Kind::Commit, "COMMIT")
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.finish(Kind::Rollback, "ROLLBACK")
    }
}
