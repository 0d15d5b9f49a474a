//! Row mapping traits and utilities

use crate::error::DriverError;
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust value.
///
/// Structs usually derive it:
///
/// ```ignore
/// use easql::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     #[easql(column = "user_name")]
///     name: String,
/// }
/// ```
///
/// Scalars read column 0, tuples read columns `0..n` positionally.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, DriverError>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning `DriverError::Decode` on failure
    fn try_get_column<T>(&self, column: &str) -> Result<T, DriverError>
    where
        T: for<'a> FromSql<'a>;

    /// Positional variant of [`RowExt::try_get_column`].
    fn try_get_index<T>(&self, idx: usize) -> Result<T, DriverError>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> Result<T, DriverError>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| DriverError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, idx: usize) -> Result<T, DriverError>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(idx)
            .map_err(|e| DriverError::decode(idx.to_string(), e.to_string()))
    }
}

macro_rules! scalar_from_row {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromRow for $t {
                fn from_row(row: &Row) -> Result<Self, DriverError> {
                    row.try_get_index(0)
                }
            }

            impl FromRow for Option<$t> {
                fn from_row(row: &Row) -> Result<Self, DriverError> {
                    row.try_get_index(0)
                }
            }
        )*
    };
}

scalar_from_row!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    Vec<u8>,
    uuid::Uuid,
    serde_json::Value,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
);

macro_rules! tuple_from_row {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> FromRow for ($($name,)+)
        where
            $($name: for<'a> FromSql<'a>,)+
        {
            fn from_row(row: &Row) -> Result<Self, DriverError> {
                Ok(($(row.try_get_index::<$name>($idx)?,)+))
            }
        }
    };
}

tuple_from_row!(A: 0);
tuple_from_row!(A: 0, B: 1);
tuple_from_row!(A: 0, B: 1, C: 2);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3);
