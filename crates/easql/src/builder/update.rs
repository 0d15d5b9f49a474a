//! UPDATE statement builder.

use super::expr::{Expr, ExprGroup, where_methods};
use super::param::{Param, ParamList};
use super::traits::{BuiltQuery, SqlBuilder};
use crate::error::BuildError;
use tokio_postgres::types::ToSql;

#[derive(Clone, Debug)]
enum SetField {
    Value(Param),
    Raw(String),
}

/// UPDATE statement builder.
#[derive(Clone, Debug)]
pub struct UpdateBuilder {
    table: String,
    set_fields: Vec<(String, SetField)>,
    where_group: ExprGroup,
    returning_cols: Vec<String>,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            set_fields: Vec::new(),
            where_group: ExprGroup::new(),
            returning_cols: Vec::new(),
        }
    }

    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.set_fields
            .push((column.to_string(), SetField::Value(Param::new(value))));
        self
    }

    /// Set an optional column value (None => skip).
    pub fn set_opt<T: ToSql + Send + Sync + 'static>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to a raw SQL expression, e.g. `set_raw("version", "version + 1")`.
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.set_fields
            .push((column.to_string(), SetField::Raw(expr.to_string())));
        self
    }

    where_methods!(where_group);

    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols = vec![cols.to_string()];
        self
    }
}

impl SqlBuilder for UpdateBuilder {
    fn build(&self) -> Result<BuiltQuery, BuildError> {
        if self.table.trim().is_empty() {
            return Err(BuildError::MissingTable {
                builder: "UpdateBuilder",
            });
        }
        if self.set_fields.is_empty() {
            return Err(BuildError::EmptySet);
        }

        let mut params = ParamList::new();
        let set_parts: Vec<String> = self
            .set_fields
            .iter()
            .map(|(col, field)| match field {
                SetField::Value(p) => format!("{col} = ${}", params.push(p.clone())),
                SetField::Raw(expr) => format!("{col} = {expr}"),
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.table, set_parts.join(", "));

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_update() {
        let qb = UpdateBuilder::new("users")
            .set("status", "inactive")
            .eq("id", 1i64);
        assert_eq!(qb.to_sql(), "UPDATE users SET status = $1 WHERE id = $2");
    }

    #[test]
    fn test_update_with_raw_and_returning() {
        let qb = UpdateBuilder::new("accounts")
            .set_raw("version", "version + 1")
            .set("balance", 10i64)
            .eq("id", 7i64)
            .returning("version");
        let built = qb.build().unwrap();
        assert_eq!(
            built.sql,
            "UPDATE accounts SET version = version + 1, balance = $1 WHERE id = $2 RETURNING version"
        );
        assert_eq!(built.params.len(), 2);
    }

    #[test]
    fn test_update_where_in_list_continues_numbering() {
        let qb = UpdateBuilder::new("users")
            .set("status", "inactive")
            .in_list("role", vec!["user", "guest"]);
        assert_eq!(
            qb.to_sql(),
            "UPDATE users SET status = $1 WHERE role IN ($2, $3)"
        );
    }

    #[test]
    fn test_empty_set_fails() {
        let err = UpdateBuilder::new("users").eq("id", 1i64).build().unwrap_err();
        assert_eq!(err, BuildError::EmptySet);
    }
}
