use anyhow::Result;
use rusqlite::Connection;

use super::{OptionalExt, profile_from_row};
use crate::models::{FriendshipRow, ProfileRow};
use crate::{Database, now_timestamp};

impl Database {
    /// Accepted friendship in either direction.
    pub fn friendship_exists(&self, a: i64, b: i64) -> Result<bool> {
        self.with_conn(|conn| accepted_between(conn, a, b))
    }

    pub fn pending_request_exists(&self, sender_id: i64, receiver_id: i64) -> Result<bool> {
        self.with_conn(|conn| pending_from(conn, sender_id, receiver_id))
    }

    pub fn list_friends(&self, user_id: i64) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| query_friends(conn, user_id))
    }

    /// Requests waiting on `receiver_id`; `user_id` in each row is the sender.
    pub fn list_incoming_requests(&self, receiver_id: i64) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.user_id, u.username, u.email, u.profile_image
                 FROM friendship f
                 JOIN users u ON u.user_id = f.user1_id
                 WHERE f.user2_id = ?1 AND f.status = 'pending'
                 ORDER BY f.created_at DESC",
            )?;
            let rows = stmt
                .query_map([receiver_id], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Requests sent by `sender_id`; `user_id` in each row is the receiver.
    pub fn list_outgoing_requests(&self, sender_id: i64) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.user_id, u.username, u.email, u.profile_image
                 FROM friendship f
                 JOIN users u ON u.user_id = f.user2_id
                 WHERE f.user1_id = ?1 AND f.status = 'pending'
                 ORDER BY f.created_at DESC",
            )?;
            let rows = stmt
                .query_map([sender_id], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn friend_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT CASE WHEN user1_id = ?1 THEN user2_id ELSE user1_id END
                 FROM friendship
                 WHERE (user1_id = ?1 OR user2_id = ?1) AND status = 'accepted'",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }
}

/// Any relationship row for the unordered pair, pending or accepted.
pub fn relationship_between(conn: &Connection, a: i64, b: i64) -> Result<Option<FriendshipRow>> {
    conn.query_row(
        "SELECT friendship_id, user1_id, user2_id, status, created_at
         FROM friendship
         WHERE (user1_id = ?1 AND user2_id = ?2) OR (user1_id = ?2 AND user2_id = ?1)",
        [a, b],
        |row| {
            Ok(FriendshipRow {
                friendship_id: row.get(0)?,
                user1_id: row.get(1)?,
                user2_id: row.get(2)?,
                status: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn accepted_between(conn: &Connection, a: i64, b: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM friendship
            WHERE ((user1_id = ?1 AND user2_id = ?2) OR (user1_id = ?2 AND user2_id = ?1))
              AND status = 'accepted')",
        [a, b],
        |r| r.get(0),
    )?)
}

pub fn pending_from(conn: &Connection, sender_id: i64, receiver_id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM friendship
            WHERE user1_id = ?1 AND user2_id = ?2 AND status = 'pending')",
        [sender_id, receiver_id],
        |r| r.get(0),
    )?)
}

pub fn insert_request(conn: &Connection, sender_id: i64, receiver_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO friendship (user1_id, user2_id, status, created_at)
         VALUES (?1, ?2, 'pending', ?3)",
        rusqlite::params![sender_id, receiver_id, now_timestamp()],
    )?;
    Ok(())
}

/// Returns the number of rows flipped; 0 when no pending request matched.
pub fn accept_request(conn: &Connection, sender_id: i64, receiver_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE friendship SET status = 'accepted'
         WHERE user1_id = ?1 AND user2_id = ?2 AND status = 'pending'",
        [sender_id, receiver_id],
    )?)
}

/// Shared by decline (receiver side) and cancel (sender side).
pub fn delete_pending(conn: &Connection, sender_id: i64, receiver_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM friendship
         WHERE user1_id = ?1 AND user2_id = ?2 AND status = 'pending'",
        [sender_id, receiver_id],
    )?)
}

pub fn delete_accepted(conn: &Connection, a: i64, b: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM friendship
         WHERE ((user1_id = ?1 AND user2_id = ?2) OR (user1_id = ?2 AND user2_id = ?1))
           AND status = 'accepted'",
        [a, b],
    )?)
}

pub fn query_friends(conn: &Connection, user_id: i64) -> Result<Vec<ProfileRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.user_id, u.username, u.email, u.profile_image
         FROM users u
         JOIN friendship f
           ON (f.user1_id = u.user_id AND f.user2_id = ?1)
           OR (f.user2_id = u.user_id AND f.user1_id = ?1)
         WHERE f.status = 'accepted'
         ORDER BY lower(u.username)",
    )?;
    let rows = stmt
        .query_map([user_id], profile_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing::seeded;

    #[test]
    fn request_then_accept() {
        let db = seeded();
        db.with_conn(|conn| insert_request(conn, 1, 2)).unwrap();
        assert!(db.pending_request_exists(1, 2).unwrap());
        assert!(!db.pending_request_exists(2, 1).unwrap());
        assert!(!db.friendship_exists(1, 2).unwrap());

        assert_eq!(db.with_conn(|conn| accept_request(conn, 1, 2)).unwrap(), 1);
        assert!(db.friendship_exists(2, 1).unwrap());
        assert!(!db.pending_request_exists(1, 2).unwrap());

        // A second accept is a no-op
        assert_eq!(db.with_conn(|conn| accept_request(conn, 1, 2)).unwrap(), 0);
    }

    #[test]
    fn pair_is_unique_in_both_directions() {
        let db = seeded();
        db.with_conn(|conn| insert_request(conn, 1, 2)).unwrap();
        assert!(db.with_conn(|conn| insert_request(conn, 2, 1)).is_err());
        assert!(db.with_conn(|conn| insert_request(conn, 1, 2)).is_err());
    }

    #[test]
    fn self_request_violates_check() {
        let db = seeded();
        assert!(db.with_conn(|conn| insert_request(conn, 1, 1)).is_err());
    }

    #[test]
    fn unfriend_from_either_side() {
        let db = seeded();
        db.with_conn(|conn| {
            insert_request(conn, 1, 2)?;
            accept_request(conn, 1, 2)?;
            insert_request(conn, 3, 1)?;
            accept_request(conn, 3, 1)
        })
        .unwrap();

        let names: Vec<_> = db.list_friends(1).unwrap().into_iter().map(|p| p.username).collect();
        assert_eq!(names, ["bob", "carol"]);
        let mut ids = db.friend_ids(1).unwrap();
        ids.sort();
        assert_eq!(ids, [2, 3]);

        assert_eq!(db.with_conn(|conn| delete_accepted(conn, 2, 1)).unwrap(), 1);
        assert!(!db.friendship_exists(1, 2).unwrap());
        assert!(db.with_conn(|conn| relationship_between(conn, 1, 2)).unwrap().is_none());
    }

    #[test]
    fn incoming_and_outgoing_lists() {
        let db = seeded();
        db.with_conn(|conn| {
            insert_request(conn, 2, 1)?;
            insert_request(conn, 1, 3)
        })
        .unwrap();

        let incoming = db.list_incoming_requests(1).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].user_id, 2);

        let outgoing = db.list_outgoing_requests(1).unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].user_id, 3);

        assert_eq!(db.with_conn(|conn| delete_pending(conn, 1, 3)).unwrap(), 1);
        assert!(db.list_outgoing_requests(1).unwrap().is_empty());
    }
}
