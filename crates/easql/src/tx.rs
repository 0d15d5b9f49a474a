//! Transactions opened from a [`Db`](crate::Db).

use crate::error::{EasqlError, EasqlResult, Op};
use crate::queryer::impl_queryer;
use crate::raw::{PgTx, RawTransaction};
use std::future::Future;

/// Ends a transaction.
pub trait Committer: Send + Sync {
    fn commit(&self) -> impl Future<Output = EasqlResult<()>> + Send;

    fn rollback(&self) -> impl Future<Output = EasqlResult<()>> + Send;
}

/// An in-flight transaction with the same query interface as [`Db`](crate::Db).
///
/// Every query runs on the transaction's own connection. Dropping a `Tx`
/// without calling [`commit`](Committer::commit) or
/// [`rollback`](Committer::rollback) leaves the outcome to the raw
/// transaction; for [`PgTx`] the connection is closed and the server aborts.
pub struct Tx<T: RawTransaction = PgTx> {
    raw: T,
}

impl<T: RawTransaction> Tx<T> {
    pub fn new(raw: T) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &T {
        &self.raw
    }
}

impl<T: RawTransaction> std::fmt::Debug for Tx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx").finish_non_exhaustive()
    }
}

impl_queryer!(Tx: RawTransaction);

impl<T: RawTransaction> Committer for Tx<T> {
    async fn commit(&self) -> EasqlResult<()> {
        self.raw
            .commit()
            .await
            .map_err(|source| EasqlError::execution(Op::Commit, source))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "easql.tx", "transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> EasqlResult<()> {
        self.raw
            .rollback()
            .await
            .map_err(|source| EasqlError::execution(Op::Rollback, source))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "easql.tx", "transaction rolled back");
        Ok(())
    }
}


/// Runs the given block inside a transaction opened on `$db`.
///
/// - Begins a transaction via [`Beginner::begin`](crate::Beginner::begin) on `$db`
///   (a `Db` or a reference to one).
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `easql::EasqlResult<T>`. A failed rollback is
/// reported as the rollback error, with the block's error in its message.
///
/// ```ignore
/// use easql::{builder, Queryer};
///
/// let moved = easql::transaction!(db, tx, {
///     tx.update(builder::update("accounts").set_raw("balance", "balance - 100").eq("id", 1i64))
///         .await?;
///     tx.update(builder::update("accounts").set_raw("balance", "balance + 100").eq("id", 2i64))
///         .await?;
///     Ok(())
/// });
/// ```
#[macro_export]
macro_rules! transaction {
    ($db:expr, $tx:ident, $body:block) => {
        async {
            let $tx = {
                use $crate::Beginner as _;
                ($db).begin().await?
            };

            let __easql_tx_body_result: $crate::EasqlResult<_> = async { $body }.await;
            let __easql_tx_result: $crate::EasqlResult<_> = match __easql_tx_body_result {
                Ok(value) => {
                    $crate::Committer::commit(&$tx).await?;
                    Ok(value)
                }
                Err(error) => match $crate::Committer::rollback(&$tx).await {
                    Ok(()) => Err(error),
                    Err(rollback_err) => Err($crate::EasqlError::execution(
                        $crate::Op::Rollback,
                        $crate::DriverError::Other(format!(
                            "{error} (rollback failed: {})",
                            rollback_err
                                .driver_error()
                                .map(ToString::to_string)
                                .unwrap_or_else(|| rollback_err.to_string())
                        )),
                    )),
                },
            };
            __easql_tx_result
        }
        .await
    };
}
