//! The top-level database handle.

use crate::config::{DbConfig, TxOptions};
use crate::context::Context;
use crate::error::{DriverError, EasqlError, EasqlResult, Op};
use crate::queryer::impl_queryer;
use crate::raw::RawBeginner;
use crate::tx::Tx;
use deadpool_postgres::Pool;
use std::future::Future;

/// Opens transactions.
pub trait Beginner: Send + Sync {
    type Raw: crate::raw::RawTransaction;

    fn begin(&self) -> impl Future<Output = EasqlResult<Tx<Self::Raw>>> + Send;

    /// Begin, giving up if `ctx` is done first.
    fn begin_context(&self, ctx: &Context) -> impl Future<Output = EasqlResult<Tx<Self::Raw>>> + Send;

    fn begin_with(&self, opts: &TxOptions) -> impl Future<Output = EasqlResult<Tx<Self::Raw>>> + Send;

    fn begin_context_with(
        &self,
        ctx: &Context,
        opts: &TxOptions,
    ) -> impl Future<Output = EasqlResult<Tx<Self::Raw>>> + Send;
}

/// A database handle wrapping a raw connection source (a pool by default).
///
/// Create as many as needed and pass them where they are used; a handle holds
/// no state besides the raw object.
///
/// ```ignore
/// let db = Db::connect(&DbConfig::from_env()?)?;
/// let name: String = db
///     .get(builder::select("users").columns(&["name"]).eq("id", 1i64))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Db<R: RawBeginner = Pool> {
    raw: R,
}

impl<R: RawBeginner> Db<R> {
    pub fn new(raw: R) -> Self {
        Self { raw }
    }

    /// The wrapped raw object.
    pub fn raw(&self) -> &R {
        &self.raw
    }

    pub fn into_raw(self) -> R {
        self.raw
    }

    async fn open(&self, ctx: Option<&Context>, opts: &TxOptions) -> EasqlResult<Tx<R::Tx>> {
        let raw = match ctx {
            Some(ctx) => ctx.run(None, self.raw.begin(opts)).await,
            None => self.raw.begin(opts).await,
        }
        .map_err(|source| EasqlError::execution(Op::Begin, source))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(target: "easql.tx", begin = %opts.begin_sql(), "transaction started");
        Ok(Tx::new(raw))
    }
}

impl Db<Pool> {
    /// Build a pool from `config` and wrap it.
    ///
    /// No connection is made until the first query.
    pub fn connect(config: &DbConfig) -> Result<Self, DriverError> {
        Ok(Self::new(config.create_pool()?))
    }
}

impl_queryer!(Db: RawBeginner);

impl<R: RawBeginner> Beginner for Db<R> {
    type Raw = R::Tx;

    async fn begin(&self) -> EasqlResult<Tx<R::Tx>> {
        self.open(None, &TxOptions::default()).await
    }

    async fn begin_context(&self, ctx: &Context) -> EasqlResult<Tx<R::Tx>> {
        self.open(Some(ctx), &TxOptions::default()).await
    }

    async fn begin_with(&self, opts: &TxOptions) -> EasqlResult<Tx<R::Tx>> {
        self.open(None, opts).await
    }

    async fn begin_context_with(&self, ctx: &Context, opts: &TxOptions) -> EasqlResult<Tx<R::Tx>> {
        self.open(Some(ctx), opts).await
    }
}
