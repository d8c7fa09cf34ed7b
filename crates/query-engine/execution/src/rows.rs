//! Turn result rows into column name to text maps.

use indexmap::IndexMap;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteRow, SqliteValueRef};
use sqlx::{Column, Decode, Row, TypeInfo, ValueRef};

use crate::error::Error;

/// Stands in for SQL NULL in row maps.
pub const NULL_MARKER: &str = "NULL";

/// One row: column names in select order, each value rendered as text.
pub type RowMap = IndexMap<String, String>;

pub fn rows_to_maps(rows: &[SqliteRow]) -> Result<Vec<RowMap>, Error> {
    rows.iter().map(row_to_map).collect()
}

fn row_to_map(row: &SqliteRow) -> Result<RowMap, Error> {
    row.columns()
        .iter()
        .map(|column| {
            let value = row
                .try_get_raw(column.ordinal())
                .map_err(|err| Error::Scan(Box::new(err)))?;
            let text = column_text(value).map_err(Error::Scan)?;
            Ok((column.name().to_string(), text))
        })
        .collect()
}

/// Render a value as SQLite's own text conversion does, regardless of the declared column type.
fn column_text(value: SqliteValueRef<'_>) -> Result<String, BoxDynError> {
    if value.is_null() {
        return Ok(NULL_MARKER.to_string());
    }
    if value.type_info().name() == "BLOB" {
        return <Vec<u8> as Decode<'_, Sqlite>>::decode(value)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    }
    <String as Decode<'_, Sqlite>>::decode(value)
}
