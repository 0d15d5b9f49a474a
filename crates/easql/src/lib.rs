//! # easql
//!
//! One query interface for PostgreSQL, usable the same way on a database
//! handle or inside a transaction.
//!
//! - **Builders in, values out**: every call takes a statement builder, renders
//!   it, forwards SQL and arguments to the driver and maps rows via [`FromRow`]
//! - **Same calls everywhere**: [`Db`] and [`Tx`] both implement [`Queryer`]
//!   and [`QueryerContext`]
//! - **Cancellation**: the `*_context` variants take a [`Context`] carrying a
//!   cancellation token and an optional deadline
//! - **Phase-tagged errors**: render failures and driver failures are told
//!   apart by [`EasqlError`]
//!
//! ```ignore
//! use easql::{builder, Beginner, Committer, Db, DbConfig, Queryer};
//!
//! let db = Db::connect(&DbConfig::from_env()?)?;
//!
//! let users: Vec<(i64, String)> = db
//!     .select(builder::select("users").columns(&["id", "name"]).order_by("id"))
//!     .await?;
//!
//! let tx = db.begin().await?;
//! tx.insert(builder::insert("users").set("name", "leo")).await?;
//! tx.commit().await?;
//! ```

extern crate self as easql;

pub mod builder;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod queryer;
pub mod raw;
pub mod row;
pub mod tx;

pub use config::{DbConfig, TxOptions};
pub use context::Context;
pub use db::{Beginner, Db};
pub use error::{BuildError, DriverError, EasqlError, EasqlResult, Op};
pub use queryer::{Queryer, QueryerContext};
pub use raw::{ExecResult, PgTx};
pub use row::{FromRow, RowExt};
pub use tx::{Committer, Tx};

pub use tokio_postgres;
pub use tokio_postgres::IsolationLevel;
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "derive")]
pub use easql_derive::FromRow;

pub mod prelude;

#[cfg(test)]
mod mock;
