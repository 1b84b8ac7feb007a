use anyhow::Result;
use rusqlite::Connection;

use crate::models::{NewNotification, NotificationRow};
use crate::{Database, now_timestamp};

impl Database {
    /// Newest first, with the sender's display fields joined in.
    pub fn list_notifications(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT n.notification_id, n.user_id, n.sender_id,
                        COALESCE(u.username, 'Unknown'), u.profile_image,
                        n.type, n.post_id, n.message, n.is_read, n.created_at
                 FROM notifications n
                 LEFT JOIN users u ON u.user_id = n.sender_id
                 WHERE n.user_id = ?1
                 ORDER BY n.created_at DESC, n.notification_id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NotificationRow {
                        notification_id: row.get(0)?,
                        user_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sender_username: row.get(3)?,
                        sender_profile_image: row.get(4)?,
                        kind: row.get(5)?,
                        post_id: row.get(6)?,
                        message: row.get(7)?,
                        is_read: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks one of the user's notifications read. Returns false when the id
    /// does not belong to `user_id`.
    pub fn mark_notification_read(&self, user_id: i64, notification_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1
                 WHERE notification_id = ?1 AND user_id = ?2",
                [notification_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id],
            )?)
        })
    }
}

/// Inserts unless a notification with the same (recipient, sender, type,
/// post) already exists. Returns whether a row was written.
pub fn create_if_not_exists(conn: &Connection, new: &NewNotification<'_>) -> Result<bool> {
    // `IS` so that a NULL post_id matches NULL
    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM notifications
            WHERE user_id = ?1 AND sender_id = ?2 AND type = ?3 AND post_id IS ?4)",
        rusqlite::params![new.user_id, new.actor_id, new.kind, new.post_id],
        |r| r.get(0),
    )?;
    if exists {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO notifications (user_id, sender_id, type, post_id, message, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        rusqlite::params![
            new.user_id,
            new.actor_id,
            new.kind,
            new.post_id,
            new.message,
            now_timestamp()
        ],
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing::seeded;

    fn request_from(actor_id: i64) -> NewNotification<'static> {
        NewNotification {
            user_id: 1,
            actor_id,
            kind: "friend_request",
            post_id: None,
            message: "sent you a friend request",
        }
    }

    #[test]
    fn duplicates_are_skipped_including_null_post() {
        let db = seeded();
        db.with_conn(|conn| {
            assert!(create_if_not_exists(conn, &request_from(2))?);
            assert!(!create_if_not_exists(conn, &request_from(2))?);
            assert!(create_if_not_exists(conn, &request_from(3))?);
            Ok(())
        })
        .unwrap();
        assert_eq!(db.list_notifications(1).unwrap().len(), 2);
    }

    #[test]
    fn post_id_is_part_of_the_key() {
        let db = seeded();
        let p1 = db.create_post_with_images(1, None, &[]).unwrap();
        let p2 = db.create_post_with_images(1, None, &[]).unwrap();
        db.with_conn(|conn| {
            for post_id in [p1, p2, p1] {
                create_if_not_exists(
                    conn,
                    &NewNotification {
                        user_id: 1,
                        actor_id: 2,
                        kind: "like",
                        post_id: Some(post_id),
                        message: "bob liked your post",
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(db.list_notifications(1).unwrap().len(), 2);
    }

    #[test]
    fn list_is_newest_first_with_sender_fields() {
        let db = seeded();
        db.with_conn(|conn| {
            create_if_not_exists(conn, &request_from(2))?;
            create_if_not_exists(conn, &request_from(3))?;
            Ok(())
        })
        .unwrap();

        let list = db.list_notifications(1).unwrap();
        assert_eq!(list[0].sender_username, "carol");
        assert_eq!(list[1].sender_username, "bob");
        assert!(!list[0].is_read);
        assert!(db.list_notifications(2).unwrap().is_empty());
    }

    #[test]
    fn mark_read_is_scoped_to_recipient() {
        let db = seeded();
        db.with_conn(|conn| {
            create_if_not_exists(conn, &request_from(2))?;
            create_if_not_exists(conn, &request_from(3))?;
            Ok(())
        })
        .unwrap();
        let id = db.list_notifications(1).unwrap()[0].notification_id;

        assert!(!db.mark_notification_read(2, id).unwrap());
        assert!(db.mark_notification_read(1, id).unwrap());
        assert_eq!(db.mark_all_notifications_read(1).unwrap(), 1);
        assert!(db.list_notifications(1).unwrap().iter().all(|n| n.is_read));
    }
}
