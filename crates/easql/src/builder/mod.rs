//! Statement builders.
//!
//! Every builder renders to a [`BuiltQuery`] (SQL text with `$n`
//! placeholders plus positional arguments) through [`SqlBuilder::build`].
//!
//! ```ignore
//! use easql::builder;
//!
//! let q = builder::select("users").columns(&["id"]).eq("id", 1i64);
//! let ins = builder::insert("users").set("name", "leo");
//! let upd = builder::update("users").set("name", "leo").eq("id", 1i64);
//! let del = builder::delete("users").eq("id", 1i64);
//! ```

mod delete;
mod expr;
mod insert;
mod param;
mod select;
mod traits;
mod update;

pub use delete::DeleteBuilder;
pub use expr::{Expr, ExprGroup};
pub use insert::InsertBuilder;
pub use param::{Param, ParamList};
pub use select::SelectBuilder;
pub use traits::{BuiltQuery, SqlBuilder};
pub use update::UpdateBuilder;

/// Start a SELECT from a table or FROM expression (`"users u"`).
pub fn select(from_expr: &str) -> SelectBuilder {
    SelectBuilder::new(from_expr)
}

pub fn insert(table: &str) -> InsertBuilder {
    InsertBuilder::new(table)
}

pub fn update(table: &str) -> UpdateBuilder {
    UpdateBuilder::new(table)
}

pub fn delete(table: &str) -> DeleteBuilder {
    DeleteBuilder::new(table)
}
