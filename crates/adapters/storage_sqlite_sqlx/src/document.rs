//! Row mapping shared by the repositories: one JSON document per row.

use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A row decoded from its `document` column.
pub(crate) struct Document<T>(pub T);

impl<'r, T: DeserializeOwned> FromRow<'r, SqliteRow> for Document<T> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let json: String = row.try_get("document")?;
        let value =
            serde_json::from_str(&json).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        Ok(Self(value))
    }
}

/// Zero-based table position as stored in the `position` column.
pub(crate) fn position(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}
