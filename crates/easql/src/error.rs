//! Error types for easql

use std::fmt;
use thiserror::Error;

/// Result type alias for easql operations
pub type EasqlResult<T> = Result<T, EasqlError>;

/// The driver call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    Select,
    Exec,
    Begin,
    Commit,
    Rollback,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Get => "get",
            Op::Select => "select",
            Op::Exec => "exec",
            Op::Begin => "begin",
            Op::Commit => "commit",
            Op::Rollback => "rollback",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by [`Db`](crate::Db) and [`Tx`](crate::Tx) operations.
///
/// Each variant names the phase that failed and keeps the underlying cause,
/// reachable through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum EasqlError {
    /// The statement builder could not render SQL text and arguments.
    #[error("error to sql: {0}")]
    Render(#[from] BuildError),

    /// The driver call returned an error.
    #[error("error {op}: {source}")]
    Execution {
        op: Op,
        #[source]
        source: DriverError,
    },
}

impl EasqlError {
    /// Wrap a driver error for the given operation.
    pub fn execution(op: Op, source: DriverError) -> Self {
        Self::Execution { op, source }
    }

    /// The failed operation, if this is an execution error.
    pub fn op(&self) -> Option<Op> {
        match self {
            Self::Execution { op, .. } => Some(*op),
            Self::Render(_) => None,
        }
    }

    /// The driver error, if this is an execution error.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Execution { source, .. } => Some(source),
            Self::Render(_) => None,
        }
    }

    /// The builder error, if this is a render error.
    pub fn build_error(&self) -> Option<&BuildError> {
        match self {
            Self::Render(err) => Some(err),
            Self::Execution { .. } => None,
        }
    }

    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    /// Check if the driver reported that no row matched
    pub fn is_not_found(&self) -> bool {
        self.driver_error().is_some_and(DriverError::is_not_found)
    }

    /// Check if the call was abandoned because its context was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.driver_error().is_some_and(DriverError::is_cancelled)
    }

    /// Check if the call was abandoned because its context deadline passed
    pub fn is_deadline_exceeded(&self) -> bool {
        self.driver_error()
            .is_some_and(DriverError::is_deadline_exceeded)
    }

    /// Check if the transaction had already been committed or rolled back
    pub fn is_tx_done(&self) -> bool {
        self.driver_error().is_some_and(DriverError::is_tx_done)
    }
}

/// Errors reported by the raw executor layer.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Query execution error
    #[error("Query error: {0}")]
    Db(#[from] tokio_postgres::Error),

    /// Pool checkout error
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The context was cancelled before or during the call
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed before or during the call
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The transaction was already committed or rolled back
    #[error("transaction has already been committed or rolled back")]
    TxDone,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    /// The call was abandoned because its context ended.
    pub fn is_context_done(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    pub fn is_tx_done(&self) -> bool {
        matches!(self, Self::TxDone)
    }

    /// The PostgreSQL error (with SQLSTATE), if the server reported one.
    pub fn db_error(&self) -> Option<&tokio_postgres::error::DbError> {
        match self {
            Self::Db(err) => err.as_db_error(),
            _ => None,
        }
    }
}

/// A statement builder was in a state that cannot be rendered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("{builder}: table name cannot be empty")]
    MissingTable { builder: &'static str },

    #[error("SelectBuilder: at least one result column is required")]
    NoColumns,

    #[error("UpdateBuilder: SET clause cannot be empty")]
    EmptySet,

    #[error("DeleteBuilder: WHERE clause is required (use allow_delete_all to delete every row)")]
    DeleteWithoutWhere,

    #[error("InsertBuilder: VALUES rows need a column list")]
    InsertWithoutColumns,

    #[error("InsertBuilder: row {row} has {got} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("template `{sql}` has {placeholders} placeholders but {params} arguments")]
    PlaceholderMismatch {
        sql: String,
        placeholders: usize,
        params: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn render_error_has_fixed_prefix() {
        let err = EasqlError::from(BuildError::EmptySet);
        assert_eq!(
            err.to_string(),
            "error to sql: UpdateBuilder: SET clause cannot be empty"
        );
        assert!(err.is_render());
        assert!(err.op().is_none());
    }

    #[test]
    fn execution_error_names_the_op() {
        let err = EasqlError::execution(Op::Commit, DriverError::Other("boom".into()));
        assert_eq!(err.to_string(), "error commit: boom");
        assert_eq!(err.op(), Some(Op::Commit));
    }

    #[test]
    fn execution_error_preserves_the_driver_cause() {
        let err = EasqlError::execution(Op::Get, DriverError::not_found("no rows"));
        assert!(err.is_not_found());
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "Not found: no rows");
        assert!(matches!(
            err.driver_error(),
            Some(DriverError::NotFound(msg)) if msg == "no rows"
        ));
    }

    #[test]
    fn cancellation_predicates() {
        let cancelled = EasqlError::execution(Op::Exec, DriverError::Cancelled);
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_deadline_exceeded());

        let expired = EasqlError::execution(Op::Select, DriverError::DeadlineExceeded);
        assert!(expired.is_deadline_exceeded());
        assert_eq!(expired.to_string(), "error select: context deadline exceeded");
        assert!(expired.driver_error().is_some_and(DriverError::is_context_done));
    }

    #[test]
    fn finished_transaction_is_reported() {
        let err = EasqlError::execution(Op::Exec, DriverError::TxDone);
        assert!(err.is_tx_done());
        assert!(!err.driver_error().is_some_and(DriverError::is_context_done));
        assert_eq!(
            err.to_string(),
            "error exec: transaction has already been committed or rolled back"
        );
    }
}
