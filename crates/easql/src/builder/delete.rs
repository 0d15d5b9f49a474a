//! DELETE statement builder.

use super::expr::{Expr, ExprGroup, where_methods};
use super::param::ParamList;
use super::traits::{BuiltQuery, SqlBuilder};
use crate::error::BuildError;
use tokio_postgres::types::ToSql;

/// DELETE statement builder.
///
/// A DELETE without WHERE conditions refuses to render unless
/// [`allow_delete_all`](Self::allow_delete_all) is set.
#[derive(Clone, Debug)]
pub struct DeleteBuilder {
    table: String,
    where_group: ExprGroup,
    returning_cols: Vec<String>,
    allow_delete_all: bool,
}

impl DeleteBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            where_group: ExprGroup::new(),
            returning_cols: Vec::new(),
            allow_delete_all: false,
        }
    }

    /// Allow a DELETE that removes every row of the table.
    pub fn allow_delete_all(mut self, allow: bool) -> Self {
        self.allow_delete_all = allow;
        self
    }

    where_methods!(where_group);

    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols = vec![cols.to_string()];
        self
    }
}

impl SqlBuilder for DeleteBuilder {
    fn build(&self) -> Result<BuiltQuery, BuildError> {
        if self.table.trim().is_empty() {
            return Err(BuildError::MissingTable {
                builder: "DeleteBuilder",
            });
        }
        if self.where_group.is_empty() && !self.allow_delete_all {
            return Err(BuildError::DeleteWithoutWhere);
        }

        let mut params = ParamList::new();
        let mut sql = format!("DELETE FROM {}", self.table);

        if !self.where_group.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_group.build(&mut params)?);
        }

        if !self.returning_cols.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning_cols.join(", "));
        }

        Ok(BuiltQuery::new(sql, params.into_vec()))
    }
}
