//! The render contract shared by every statement builder.

use super::param::Param;
use crate::error::BuildError;
use tokio_postgres::types::ToSql;

/// SQL text plus its positional arguments, ready for the driver.
#[derive(Clone, Debug)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl BuiltQuery {
    pub fn new(sql: String, params: Vec<Param>) -> Self {
        Self { sql, params }
    }

    /// Arguments as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(Param::as_sql).collect()
    }
}

/// Anything that can render itself to SQL text and arguments.
///
/// Rendering fails when the builder state is inconsistent (for example an
/// UPDATE with no SET clause); nothing is sent to the database in that case.
pub trait SqlBuilder: Send + Sync {
    fn build(&self) -> Result<BuiltQuery, BuildError>;

    /// Rendered SQL text, or the render error message. Debug helper.
    fn to_sql(&self) -> String {
        match self.build() {
            Ok(query) => query.sql,
            Err(err) => format!("<{err}>"),
        }
    }
}
