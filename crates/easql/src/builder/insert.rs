//! INSERT statement builder.

use super::param::{Param, ParamList};
use super::traits::{BuiltQuery, SqlBuilder};
use crate::error::BuildError;
use tokio_postgres::types::ToSql;

#[derive(Clone, Debug)]
enum Value {
    Param(Param),
    /// SQL expression inserted verbatim, e.g. `NOW()`
    Raw(String),
}

/// INSERT statement builder.
///
/// Either pair columns and values with [`set`](Self::set), or declare
/// [`columns`](Self::columns) once and add one or more [`values`](Self::values) rows.
#[derive(Clone, Debug)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    conflict_target: Option<String>,
    returning_cols: Vec<String>,
}

impl InsertBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            conflict_target: None,
            returning_cols: Vec::new(),
        }
    }

    /// Set a column value on the single row being built.
    pub fn set<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> Self {
        self.push_single(column, Value::Param(Param::new(value)))
    }

    /// Set an optional column value (None => column omitted).
    pub fn set_opt<T: ToSql + Send + Sync + 'static>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to a raw SQL expression.
    pub fn set_raw(self, column: &str, expr: &str) -> Self {
        self.push_single(column, Value::Raw(expr.to_string()))
    }

    fn push_single(mut self, column: &str, value: Value) -> Self {
        self.columns.push(column.to_string());
        match self.rows.first_mut() {
            Some(row) => row.push(value),
            None => self.rows.push(vec![value]),
        }
        self
    }

    /// Declare the column list for [`values`](Self::values) rows.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add one row of values, in column order.
    pub fn values(mut self, row: Vec<Param>) -> Self {
        self.rows.push(row.into_iter().map(Value::Param).collect());
        self
    }

    /// Append `ON CONFLICT <target> DO NOTHING`; target may be `"(email)"` or
    /// `"ON CONSTRAINT users_email_key"`.
    pub fn on_conflict_do_nothing(mut self, target: &str) -> Self {
        self.conflict_target = Some(target.to_string());
        self
    }

    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols = vec![cols.to_string()];
        self
    }
}

impl SqlBuilder for InsertBuilder {
    fn build(&self) -> Result<BuiltQuery, BuildError> {
        if self.table.trim().is_empty() {
            return Err(BuildError::MissingTable {
                builder: "InsertBuilder",
            });
        }

        let mut params = ParamList::new();
        let mut sql = if self.columns.is_empty() && self.rows.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else if self.columns.is_empty() {
            return Err(BuildError::InsertWithoutColumns);
        } else {
            let mut tuples = Vec::with_capacity(self.rows.len());
            for (i, row) in self.rows.iter().enumerate() {
                if row.len() != self.columns.len() {
                    return Err(BuildError::RowWidth {
                        row: i,
                        expected: self.columns.len(),
                        got: row.len(),
                    });
                }
                let parts: Vec<String> = row
                    .iter()
                    .map(|value| match value {
                        Value::Param(p) => format!("${}", params.push(p.clone())),
                        Value::Raw(expr) => expr.clone(),
                    })
                    .collect();
                tuples.push(format!("({})", parts.join(", ")));
            }
            if tuples.is_empty() {
                return Err(BuildError::RowWidth {
                    row: 0,
                    expected: self.columns.len(),
                    got: 0,
                });
            }
            format!(
                "INSERT INTO {} ({}) VALUES {}",
                self.table,
                self.columns.join(", "),
                tuples.join(", ")
            )
        };

        if let Some(target) = &self.conflict_target {
            sql.push_str(" ON CONFLICT ");
            sql.push_str(target);
            sql.push_str(" DO NOTHING");
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
    fn test_insert_with_set() {
        let qb = InsertBuilder::new("users")
            .set("username", "alice")
            .set_raw("created_at", "NOW()")
            .set("email", "alice@example.com");
        let built = qb.build().unwrap();
        assert_eq!(
            built.sql,
            "INSERT INTO users (username, created_at, email) VALUES ($1, NOW(), $2)"
        );
        assert_eq!(built.params.len(), 2);
    }

    #[test]
    fn test_insert_multiple_rows() {
        let qb = InsertBuilder::new("users")
            .columns(&["id", "name"])
            .values(vec![Param::new(1i64), Param::new("a")])
            .values(vec![Param::new(2i64), Param::new("b")]);
        assert_eq!(
            qb.to_sql(),
            "INSERT INTO users (id, name) VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn test_insert_default_values_with_returning() {
        let qb = InsertBuilder::new("events").returning("id");
        assert_eq!(qb.to_sql(), "INSERT INTO events DEFAULT VALUES RETURNING id");
    }

    #[test]
    fn test_insert_on_conflict_do_nothing() {
        let qb = InsertBuilder::new("tags")
            .set("name", "rust")
            .on_conflict_do_nothing("(name)");
        assert_eq!(
            qb.to_sql(),
            "INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING"
        );
    }

    #[test]
    fn test_set_opt_skips_none() {
        let nickname: Option<String> = None;
        let qb = InsertBuilder::new("users")
            .set("id", 1i64)
            .set_opt("nickname", nickname);
        assert_eq!(qb.to_sql(), "INSERT INTO users (id) VALUES ($1)");
    }

    #[test]
    fn test_values_without_columns_fails() {
        let err = InsertBuilder::new("t").values(vec![]).build().unwrap_err();
        assert_eq!(err, BuildError::InsertWithoutColumns);

        let err = InsertBuilder::new("t")
            .values(vec![Param::new(1i64)])
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::InsertWithoutColumns);
    }

    #[test]
    fn test_row_width_mismatch_fails() {
        let err = InsertBuilder::new("users")
            .columns(&["id", "name"])
            .values(vec![Param::new(1i64)])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::RowWidth {
                row: 0,
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_columns_without_values_fails() {
        let err = InsertBuilder::new("users").columns(&["id"]).build().unwrap_err();
        assert!(matches!(err, BuildError::RowWidth { got: 0, .. }));
    }
}
