//! Derive macros for easql.
//!
//! Provides `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_row;

/// Derive `FromRow` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use easql::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     #[easql(column = "email_address")]
///     email: Option<String>,
///     #[easql(default)]
///     tags: Vec<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[easql(column = "name")]` - Map field to a different column name
/// - `#[easql(default)]` - Fill the field with `Default::default()` instead of reading a column
#[proc_macro_derive(FromRow, attributes(easql))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
