use anyhow::Result;
use rusqlite::Connection;

use super::{OptionalExt, profile_from_row};
use crate::models::{BlockRow, ProfileRow};
use crate::{Database, now_timestamp};

impl Database {
    /// True when `a` blocked `b` or `b` blocked `a`.
    pub fn either_blocked(&self, a: i64, b: i64) -> Result<bool> {
        self.with_conn(|conn| blocked_either_way(conn, a, b))
    }

    pub fn list_blocked(&self, blocker_id: i64) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| query_blocked(conn, blocker_id))
    }
}

pub fn is_blocked(conn: &Connection, blocker_id: i64, blocked_id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blockeduser WHERE blocker_id = ?1 AND blocked_id = ?2)",
        [blocker_id, blocked_id],
        |r| r.get(0),
    )?)
}

pub fn blocked_either_way(conn: &Connection, a: i64, b: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM blockeduser
            WHERE (blocker_id = ?1 AND blocked_id = ?2) OR (blocker_id = ?2 AND blocked_id = ?1))",
        [a, b],
        |r| r.get(0),
    )?)
}

pub fn insert_block(conn: &Connection, blocker_id: i64, blocked_id: i64) -> Result<BlockRow> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO blockeduser (blocker_id, blocked_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![blocker_id, blocked_id, created_at],
    )?;
    Ok(BlockRow {
        blocker_id,
        blocked_id,
        created_at,
    })
}

/// Removes the block and hands back the deleted row, if there was one.
pub fn delete_block(conn: &Connection, blocker_id: i64, blocked_id: i64) -> Result<Option<BlockRow>> {
    conn.query_row(
        "DELETE FROM blockeduser WHERE blocker_id = ?1 AND blocked_id = ?2
         RETURNING blocker_id, blocked_id, created_at",
        [blocker_id, blocked_id],
        |row| {
            Ok(BlockRow {
                blocker_id: row.get(0)?,
                blocked_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn query_blocked(conn: &Connection, blocker_id: i64) -> Result<Vec<ProfileRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.user_id, u.username, u.email, u.profile_image
         FROM blockeduser b
         JOIN users u ON u.user_id = b.blocked_id
         WHERE b.blocker_id = ?1
         ORDER BY b.created_at DESC",
    )?;
    let rows = stmt
        .query_map([blocker_id], profile_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
