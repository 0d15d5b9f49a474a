//! Boolean expression tree for WHERE/HAVING clauses.
//!
//! Placeholder indices are assigned while rendering, so fragments can be
//! composed in any order and still number `$1..$n` left to right.

use super::param::{Param, ParamList};
use crate::error::BuildError;
use tokio_postgres::types::ToSql;

/// Expression node.
#[derive(Clone, Debug)]
pub enum Expr {
    /// All children must hold.
    And(Vec<Expr>),
    /// At least one child must hold.
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `column op $n`
    Compare {
        column: String,
        op: &'static str,
        value: Param,
    },
    NullCheck {
        column: String,
        is_null: bool,
    },
    InList {
        column: String,
        values: Vec<Param>,
        negated: bool,
    },
    Between {
        column: String,
        from: Param,
        to: Param,
        negated: bool,
    },
    /// SQL with `?` placeholders, one per argument. `??` is a literal `?`.
    Template {
        sql: String,
        params: Vec<Param>,
    },
    Raw(String),
    True,
    False,
}

macro_rules! compare_ctor {
    ($($(#[$doc:meta])* $name:ident => $op:literal;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<T: ToSql + Send + Sync + 'static>(column: impl Into<String>, value: T) -> Self {
                Expr::Compare {
                    column: column.into(),
                    op: $op,
                    value: Param::new(value),
                }
            }
        )*
    };
}

impl Expr {
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    compare_ctor! {
        /// `column = value`
        eq => "=";
        /// `column != value`
        ne => "!=";
        /// `column > value`
        gt => ">";
        /// `column >= value`
        gte => ">=";
        /// `column < value`
        lt => "<";
        /// `column <= value`
        lte => "<=";
        /// `column LIKE pattern`
        like => "LIKE";
        /// `column ILIKE pattern`
        ilike => "ILIKE";
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// `column IN (...)`; an empty list matches nothing.
    pub fn in_list<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        values: Vec<T>,
    ) -> Self {
        if values.is_empty() {
            return Expr::False;
        }
        Expr::InList {
            column: column.into(),
            values: values.into_iter().map(Param::new).collect(),
            negated: false,
        }
    }

    /// `column NOT IN (...)`; an empty list matches everything.
    pub fn not_in<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        values: Vec<T>,
    ) -> Self {
        if values.is_empty() {
            return Expr::True;
        }
        Expr::InList {
            column: column.into(),
            values: values.into_iter().map(Param::new).collect(),
            negated: true,
        }
    }

    pub fn between<T: ToSql + Send + Sync + 'static>(
        column: impl Into<String>,
        from: T,
        to: T,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: Param::new(from),
            to: Param::new(to),
            negated: false,
        }
    }

    /// Template with `?` placeholders, e.g. `Expr::template("a = ? OR b = ?", vec![1, 2])`.
    ///
    /// Write `??` for a literal `?`, such as the jsonb operators
    /// (`"data ?? 'k' AND id = ?"` renders `data ? 'k' AND id = $1`). This also
    /// applies inside string literals.
    pub fn template<T: ToSql + Send + Sync + 'static>(sql: impl Into<String>, values: Vec<T>) -> Self {
        Expr::Template {
            sql: sql.into(),
            params: values.into_iter().map(Param::new).collect(),
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(Expr::is_empty),
            Expr::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Render this node, pushing its arguments onto `params`.
    pub fn build(&self, params: &mut ParamList) -> Result<String, BuildError> {
        let sql = match self {
            Expr::And(exprs) => join_group(exprs, " AND ", params)?,
            Expr::Or(exprs) => join_group(exprs, " OR ", params)?,
            Expr::Not(inner) => {
                let sql = inner.build(params)?;
                if sql.is_empty() {
                    sql
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Compare { column, op, value } => {
                let idx = params.push(value.clone());
                format!("{column} {op} ${idx}")
            }
            Expr::NullCheck { column, is_null } => {
                let check = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                format!("{column} {check}")
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("${}", params.push(v.clone())))
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{column} {op} ({})", placeholders.join(", "))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let lo = params.push(from.clone());
                let hi = params.push(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{column} {op} ${lo} AND ${hi}")
            }
            Expr::Template {
                sql,
                params: values,
            } => {
                let placeholders = count_placeholders(sql);
                if placeholders != values.len() {
                    return Err(BuildError::PlaceholderMismatch {
                        sql: sql.clone(),
                        placeholders,
                        params: values.len(),
                    });
                }
                let mut values = values.iter();
                let mut out = String::with_capacity(sql.len() + 8);
                let mut chars = sql.chars().peekable();
                while let Some(ch) = chars.next() {
                    if ch != '?' {
                        out.push(ch);
                    } else if chars.next_if_eq(&'?').is_some() {
                        out.push('?');
                    } else if let Some(value) = values.next() {
                        out.push('$');
                        out.push_str(&params.push(value.clone()).to_string());
                    }
                }
                out
            }
            Expr::Raw(sql) => sql.clone(),
            Expr::True => "1=1".to_string(),
            Expr::False => "1=0".to_string(),
        };
        Ok(sql)
    }
}

/// Number of `?` placeholders in a template, not counting `??` escapes.
fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '?' && chars.next_if_eq(&'?').is_none() {
            count += 1;
        }
    }
    count
}

fn join_group(exprs: &[Expr], sep: &str, params: &mut ParamList) -> Result<String, BuildError> {
    let mut parts = Vec::with_capacity(exprs.len());
    for expr in exprs.iter().filter(|e| !e.is_empty()) {
        let sql = expr.build(params)?;
        // nested groups keep their own precedence
        if matches!(expr, Expr::And(_) | Expr::Or(_)) {
            parts.push(format!("({sql})"));
        } else {
            parts.push(sql);
        }
    }
    Ok(parts.join(sep))
}

/// WHERE/HAVING conditions accumulated by a builder, ANDed together.
#[derive(Clone, Debug, Default)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.iter().all(Expr::is_empty)
    }

    pub fn push(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    /// Render with placeholders continuing after the arguments already in `params`.
    pub fn build(&self, params: &mut ParamList) -> Result<String, BuildError> {
        join_group(&self.exprs, " AND ", params)
    }
}

/// Generates the WHERE helper methods shared by the select, update and delete builders.
macro_rules! where_methods {
    ($field:ident) => {
        /// Add WHERE: column = value
        pub fn eq<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
            self.$field.push(Expr::eq(column, value));
            self
        }

        /// Add WHERE: column != value
        pub fn ne<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
            self.$field.push(Expr::ne(column, value));
            self
        }

        /// Add WHERE: column > value
        pub fn gt<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
            self.$field.push(Expr::gt(column, value));
            self
        }

        /// Add WHERE: column >= value
        pub fn gte<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
            self.$field.push(Expr::gte(column, value));
            self
        }

        /// Add WHERE: column < value
        pub fn lt<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
            self.$field.push(Expr::lt(column, value));
            self
        }

        /// Add WHERE: column <= value
        pub fn lte<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
            self.$field.push(Expr::lte(column, value));
            self
        }

        /// Add WHERE: column LIKE pattern
        pub fn like<T: ToSql + Send + Sync + 'static>(mut self, column: &str, pattern: T) -> Self {
            self.$field.push(Expr::like(column, pattern));
            self
        }

        /// Add WHERE: column ILIKE pattern
        pub fn ilike<T: ToSql + Send + Sync + 'static>(mut self, column: &str, pattern: T) -> Self {
            self.$field.push(Expr::ilike(column, pattern));
            self
        }

        /// Add WHERE: column IS NULL
        pub fn is_null(mut self, column: &str) -> Self {
            self.$field.push(Expr::is_null(column));
            self
        }

        /// Add WHERE: column IS NOT NULL
        pub fn is_not_null(mut self, column: &str) -> Self {
            self.$field.push(Expr::is_not_null(column));
            self
        }

        /// Add WHERE: column IN (values...)
        pub fn in_list<T: ToSql + Send + Sync + 'static>(mut self, column: &str, values: Vec<T>) -> Self {
            self.$field.push(Expr::in_list(column, values));
            self
        }

        /// Add WHERE: column NOT IN (values...)
        pub fn not_in<T: ToSql + Send + Sync + 'static>(mut self, column: &str, values: Vec<T>) -> Self {
            self.$field.push(Expr::not_in(column, values));
            self
        }

        /// Add WHERE: column BETWEEN from AND to
        pub fn between<T: ToSql + Send + Sync + 'static>(mut self, column: &str, from: T, to: T) -> Self {
            self.$field.push(Expr::between(column, from, to));
            self
        }

        /// Add a raw WHERE fragment without arguments.
        pub fn where_raw(mut self, sql: &str) -> Self {
            self.$field.push(Expr::raw(sql));
            self
        }

        /// Add a WHERE fragment with `?` placeholders.
        pub fn where_template<T: ToSql + Send + Sync + 'static>(mut self, sql: &str, values: Vec<T>) -> Self {
            self.$field.push(Expr::template(sql, values));
            self
        }

        /// Add a composed expression.
        pub fn where_expr(mut self, expr: Expr) -> Self {
            self.$field.push(expr);
            self
        }
    };
}

pub(crate) use where_methods;
