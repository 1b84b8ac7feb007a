use anyhow::Result;
use rusqlite::Connection;

use crate::models::MessageRow;
use crate::{Database, now_timestamp};

impl Database {
    /// Full history between two users, oldest first.
    pub fn get_conversation(&self, a: i64, b: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_conversation(conn, a, b))
    }
}

/// `content` is stored as given; callers apply the cipher first.
pub fn insert_message(
    conn: &Connection,
    sender_id: i64,
    receiver_id: i64,
    content: &str,
    is_media: bool,
) -> Result<MessageRow> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO message (sender_id, receiver_id, content, is_media, message_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![sender_id, receiver_id, content, is_media, created_at],
    )?;
    let message_id = conn.last_insert_rowid();

    let sender_name: String = conn.query_row(
        "SELECT COALESCE((SELECT username FROM users WHERE user_id = ?1), 'Unknown')",
        [sender_id],
        |r| r.get(0),
    )?;

    Ok(MessageRow {
        message_id,
        sender_id,
        receiver_id,
        sender_name,
        content: content.to_string(),
        is_media,
        created_at,
    })
}

pub fn query_conversation(conn: &Connection, a: i64, b: i64) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.message_id, m.sender_id, m.receiver_id, COALESCE(u.username, 'Unknown'),
                m.content, m.is_media, m.message_time
         FROM message m
         LEFT JOIN users u ON u.user_id = m.sender_id
         WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
            OR (m.sender_id = ?2 AND m.receiver_id = ?1)
         ORDER BY m.message_time ASC, m.message_id ASC",
    )?;

    let rows = stmt
        .query_map([a, b], |row| {
            Ok(MessageRow {
                message_id: row.get(0)?,
                sender_id: row.get(1)?,
                receiver_id: row.get(2)?,
                sender_name: row.get(3)?,
                content: row.get(4)?,
                is_media: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing::seeded;

    #[test]
    fn conversation_is_ordered_and_scoped_to_the_pair() {
        let db = seeded();
        db.with_conn(|conn| {
            insert_message(conn, 1, 2, "first", false)?;
            insert_message(conn, 2, 1, "second", false)?;
            insert_message(conn, 1, 3, "elsewhere", false)?;
            insert_message(conn, 1, 2, "uploads/pic.png", true)?;
            Ok(())
        })
        .unwrap();

        let convo = db.get_conversation(2, 1).unwrap();
        let contents: Vec<_> = convo.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "uploads/pic.png"]);
        assert_eq!(convo[1].sender_name, "bob");
        assert!(convo[2].is_media);
        assert!(!convo[0].is_media);
    }

    #[test]
    fn insert_reports_sender_name() {
        let db = seeded();
        let row = db
            .with_conn(|conn| insert_message(conn, 3, 1, "hey", false))
            .unwrap();
        assert_eq!(row.sender_name, "carol");
        assert_eq!(row.receiver_id, 1);
    }
}
