//! The query interface shared by [`Db`](crate::Db) and [`Tx`](crate::Tx).
//!
//! Code that only needs to read and write can accept `&impl Queryer` and run
//! unchanged on a handle or inside a transaction:
//!
//! ```ignore
//! use easql::{builder, EasqlResult, Queryer};
//!
//! async fn rename(q: &impl Queryer, id: i64, name: &str) -> EasqlResult<u64> {
//!     let res = q
//!         .update(builder::update("users").set("name", name.to_string()).eq("id", id))
//!         .await?;
//!     Ok(res.rows_affected)
//! }
//! ```

use crate::builder::{BuiltQuery, DeleteBuilder, InsertBuilder, SelectBuilder, SqlBuilder, UpdateBuilder};
use crate::context::Context;
use crate::error::{DriverError, EasqlError, EasqlResult, Op};
use crate::raw::{ExecResult, RawQueryer};
use crate::row::FromRow;
use std::future::Future;

/// Reads and writes without a cancellation context.
pub trait Queryer: Send + Sync {
    /// Fetch the first row of `query` mapped to `T`.
    ///
    /// No matching row is an [`EasqlError::Execution`] whose cause is
    /// [`DriverError::NotFound`].
    fn get<T: FromRow + Send>(
        &self,
        query: SelectBuilder,
    ) -> impl Future<Output = EasqlResult<T>> + Send;

    /// Fetch every row of `query` mapped to `T`. No rows is an empty `Vec`.
    fn select<T: FromRow + Send>(
        &self,
        query: SelectBuilder,
    ) -> impl Future<Output = EasqlResult<Vec<T>>> + Send;

    fn insert(&self, query: InsertBuilder) -> impl Future<Output = EasqlResult<ExecResult>> + Send;

    fn update(&self, query: UpdateBuilder) -> impl Future<Output = EasqlResult<ExecResult>> + Send;

    fn delete(&self, query: DeleteBuilder) -> impl Future<Output = EasqlResult<ExecResult>> + Send;
}

/// The [`Queryer`] operations, each bounded by a [`Context`].
///
/// A context that is already done fails with `Execution` before anything is
/// sent. One that ends mid-call abandons the statement.
pub trait QueryerContext: Send + Sync {
    fn get_context<T: FromRow + Send>(
        &self,
        ctx: &Context,
        query: SelectBuilder,
    ) -> impl Future<Output = EasqlResult<T>> + Send;

    fn select_context<T: FromRow + Send>(
        &self,
        ctx: &Context,
        query: SelectBuilder,
    ) -> impl Future<Output = EasqlResult<Vec<T>>> + Send;

    fn insert_context(
        &self,
        ctx: &Context,
        query: InsertBuilder,
    ) -> impl Future<Output = EasqlResult<ExecResult>> + Send;

    fn update_context(
        &self,
        ctx: &Context,
        query: UpdateBuilder,
    ) -> impl Future<Output = EasqlResult<ExecResult>> + Send;

    fn delete_context(
        &self,
        ctx: &Context,
        query: DeleteBuilder,
    ) -> impl Future<Output = EasqlResult<ExecResult>> + Send;
}

fn render<B: SqlBuilder>(op: Op, query: &B) -> EasqlResult<BuiltQuery> {
    let built = query.build()?;
    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "easql.sql",
        op = op.as_str(),
        sql = %built.sql,
        param_count = built.params.len(),
        "query"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = op;
    Ok(built)
}

fn wrap<T>(op: Op, result: Result<T, DriverError>) -> EasqlResult<T> {
    result.map_err(|source| EasqlError::execution(op, source))
}

pub(crate) async fn fetch_one<R, T>(raw: &R, ctx: Option<&Context>, query: SelectBuilder) -> EasqlResult<T>
where
    R: RawQueryer,
    T: FromRow + Send,
{
    let built = render(Op::Get, &query)?;
    let params = built.params_ref();
    let result = match ctx {
        Some(ctx) => raw.get_context(ctx, &built.sql, &params).await,
        None => raw.get(&built.sql, &params).await,
    };
    wrap(Op::Get, result)
}

pub(crate) async fn fetch_all<R, T>(
    raw: &R,
    ctx: Option<&Context>,
    query: SelectBuilder,
) -> EasqlResult<Vec<T>>
where
    R: RawQueryer,
    T: FromRow + Send,
{
    let built = render(Op::Select, &query)?;
    let params = built.params_ref();
    let result = match ctx {
        Some(ctx) => raw.select_context(ctx, &built.sql, &params).await,
        None => raw.select(&built.sql, &params).await,
    };
    wrap(Op::Select, result)
}

pub(crate) async fn exec<R, B>(raw: &R, ctx: Option<&Context>, query: B) -> EasqlResult<ExecResult>
where
    R: RawQueryer,
    B: SqlBuilder,
{
    let built = render(Op::Exec, &query)?;
    let params = built.params_ref();
    let result = match ctx {
        Some(ctx) => raw.execute_context(ctx, &built.sql, &params).await,
        None => raw.execute(&built.sql, &params).await,
    };
    wrap(Op::Exec, result).map(ExecResult::new)
}

/// Implement `Queryer` and `QueryerContext` for a wrapper whose raw handle is
/// reachable as `self.raw`. The wrapper's type parameter is always named
/// `__Raw`, so it never shadows the `T` of the row-mapping methods.
macro_rules! impl_queryer {
    ($ty:ident : $bound:path) => {
        impl<__Raw: $bound> $crate::queryer::Queryer for $ty<__Raw> {
            async fn get<T: $crate::FromRow + Send>(
                &self,
                query: $crate::builder::SelectBuilder,
            ) -> $crate::EasqlResult<T> {
                $crate::queryer::fetch_one(&self.raw, None, query).await
            }

            async fn select<T: $crate::FromRow + Send>(
                &self,
                query: $crate::builder::SelectBuilder,
            ) -> $crate::EasqlResult<Vec<T>> {
                $crate::queryer::fetch_all(&self.raw, None, query).await
            }

            async fn insert(
                &self,
                query: $crate::builder::InsertBuilder,
            ) -> $crate::EasqlResult<$crate::ExecResult> {
                $crate::queryer::exec(&self.raw, None, query).await
            }

            async fn update(
                &self,
                query: $crate::builder::UpdateBuilder,
            ) -> $crate::EasqlResult<$crate::ExecResult> {
                $crate::queryer::exec(&self.raw, None, query).await
            }

            async fn delete(
                &self,
                query: $crate::builder::DeleteBuilder,
            ) -> $crate::EasqlResult<$crate::ExecResult> {
                $crate::queryer::exec(&self.raw, None, query).await
            }
        }

        impl<__Raw: $bound> $crate::queryer::QueryerContext for $ty<__Raw> {
            async fn get_context<T: $crate::FromRow + Send>(
                &self,
                ctx: &$crate::Context,
                query: $crate::builder::SelectBuilder,
            ) -> $crate::EasqlResult<T> {
                $crate::queryer::fetch_one(&self.raw, Some(ctx), query).await
            }

            async fn select_context<T: $crate::FromRow + Send>(
                &self,
                ctx: &$crate::Context,
                query: $crate::builder::SelectBuilder,
            ) -> $crate::EasqlResult<Vec<T>> {
                $crate::queryer::fetch_all(&self.raw, Some(ctx), query).await
            }

            async fn insert_context(
                &self,
                ctx: &$crate::Context,
                query: $crate::builder::InsertBuilder,
            ) -> $crate::EasqlResult<$crate::ExecResult> {
                $crate::queryer::exec(&self.raw, Some(ctx), query).await
            }

            async fn update_context(
                &self,
                ctx: &$crate::Context,
                query: $crate::builder::UpdateBuilder,
            ) -> $crate::EasqlResult<$crate::ExecResult> {
                $crate::queryer::exec(&self.raw, Some(ctx), query).await
            }

            async fn delete_context(
                &self,
                ctx: &$crate::Context,
                query: $crate::builder::DeleteBuilder,
            ) -> $crate::EasqlResult<$crate::ExecResult> {
                $crate::queryer::exec(&self.raw, Some(ctx), query).await
            }
        }
    };
}

pub(crate) use impl_queryer;
