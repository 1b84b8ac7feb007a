//! Query functions, one module per table group.
//!
//! Every statement is a free function over `&Connection` so it can run
//! either on its own (through the `Database` wrappers) or as one step of a
//! `Database::with_tx` transaction.

pub mod blocks;
pub mod friendships;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod users;

use anyhow::Result;
use rusqlite::Row;

use crate::models::ProfileRow;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `?1, ?2, ...` for an `IN (...)` list, starting after `offset` bound params.
pub(crate) fn placeholders(count: usize, offset: usize) -> String {
    (offset + 1..=offset + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps `user_id, username, email, profile_image` selected in that order.
pub(crate) fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        user_id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        profile_image: row.get(3)?,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_respect_offset() {
        assert_eq!(placeholders(3, 0), "?1, ?2, ?3");
        assert_eq!(placeholders(2, 1), "?2, ?3");
        assert_eq!(placeholders(0, 0), "");
    }
}
