//! Convenient imports for typical `easql` usage.
//!
//! ```ignore
//! use easql::prelude::*;
//! ```

pub use crate::builder::{self, Expr, SqlBuilder};
pub use crate::{
    Beginner, Committer, Context, Db, DbConfig, EasqlError, EasqlResult, ExecResult, FromRow,
    Queryer, QueryerContext, RowExt, Tx, TxOptions,
};
