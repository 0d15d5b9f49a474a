//! SELECT statement builder.

use super::expr::{Expr, ExprGroup, where_methods};
use super::param::ParamList;
use super::traits::{BuiltQuery, SqlBuilder};
use crate::error::BuildError;
use tokio_postgres::types::ToSql;

/// SELECT statement builder.
#[derive(Clone, Debug)]
pub struct SelectBuilder {
    /// Table or FROM expression
    from_expr: String,
    columns: Vec<String>,
    joins: Vec<String>,
    where_group: ExprGroup,
    group_by: Option<String>,
    having_group: ExprGroup,
    order_clauses: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectBuilder {
    /// Select every column (`*`) from a table or FROM expression.
    pub fn new(from_expr: &str) -> Self {
        Self {
            from_expr: from_expr.to_string(),
            columns: vec!["*".to_string()],
            joins: Vec::new(),
            where_group: ExprGroup::new(),
            group_by: None,
            having_group: ExprGroup::new(),
            order_clauses: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Replace the result columns.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Append one result column, replacing the default `*`.
    pub fn column(mut self, col: &str) -> Self {
        if self.columns.len() == 1 && self.columns[0] == "*" {
            self.columns.clear();
        }
        self.columns.push(col.to_string());
        self
    }

    pub fn inner_join(mut self, table: &str, on: &str) -> Self {
        self.joins.push(format!("INNER JOIN {table} ON {on}"));
        self
    }

    pub fn left_join(mut self, table: &str, on: &str) -> Self {
        self.joins.push(format!("LEFT JOIN {table} ON {on}"));
        self
    }

    where_methods!(where_group);

    pub fn group_by(mut self, clause: &str) -> Self {
        self.group_by = Some(clause.to_string());
        self
    }

    /// Add a HAVING condition with `?` placeholders.
    pub fn having_template<T: ToSql + Send + Sync + 'static>(mut self, sql: &str, values: Vec<T>) -> Self {
        self.having_group.push(Expr::template(sql, values));
        self
    }

    /// Add ORDER BY clause, e.g. `"created_at DESC"`.
    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_clauses.push(clause.to_string());
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }
}

impl SqlBuilder for SelectBuilder {
    fn build(&self) -> Result<BuiltQuery, BuildError> {
        if self.from_expr.trim().is_empty() {
            return Err(BuildError::MissingTable {
                builder: "SelectBuilder",
            });
        }
        if self.columns.is_empty() {
            return Err(BuildError::NoColumns);
        }

        let mut params = ParamList::new();
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.from_expr);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.where_group.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_group.build(&mut params)?);
        }

        if let Some(group) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }

        if !self.having_group.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having_group.build(&mut params)?);
        }

        if !self.order_clauses.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_clauses.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(BuiltQuery::new(sql, params.into_vec()))
    }
}
