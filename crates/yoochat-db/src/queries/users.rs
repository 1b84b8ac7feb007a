use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, profile_from_row};
use crate::models::{ProfileRow, UserRow};
use crate::{Database, now_timestamp};

/// Columns to change on a profile update; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProfileUpdate<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub profile_image: Option<&'a str>,
}

impl Database {
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        profile_image: Option<&str>,
    ) -> Result<UserRow> {
        self.with_conn(|conn| insert_user(conn, username, email, password_hash, profile_image))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, user_id))
    }

    pub fn search_users(
        &self,
        text: &str,
        exclude_user_id: Option<i64>,
        alphabetical: bool,
        limit: u32,
    ) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| query_search(conn, text, exclude_user_id, alphabetical, limit))
    }
}

const USER_COLUMNS: &str = "user_id, username, email, password, profile_image, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user_id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        profile_image: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
    profile_image: Option<&str>,
) -> Result<UserRow> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO users (username, email, password, profile_image, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![username, email, password_hash, profile_image, created_at],
    )?;

    Ok(UserRow {
        user_id: conn.last_insert_rowid(),
        username: username.to_string(),
        email: email.to_string(),
        password: password_hash.to_string(),
        profile_image: profile_image.map(str::to_string),
        created_at,
    })
}

pub fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    conn.query_row(&sql, [username], user_from_row).optional()
}

/// Case-insensitive, surrounding whitespace ignored.
pub fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)");
    conn.query_row(&sql, [email.trim()], user_from_row).optional()
}

pub fn query_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
    conn.query_row(&sql, [user_id], user_from_row).optional()
}

pub fn user_exists(conn: &Connection, user_id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
        [user_id],
        |r| r.get(0),
    )?)
}

pub fn update_profile(
    conn: &Connection,
    user_id: i64,
    update: &ProfileUpdate<'_>,
) -> Result<Option<UserRow>> {
    let Some(current) = query_user_by_id(conn, user_id)? else {
        return Ok(None);
    };

    let username = update.username.unwrap_or(&current.username);
    let email = update.email.unwrap_or(&current.email);
    let password = update.password_hash.unwrap_or(&current.password);
    let profile_image = update.profile_image.or(current.profile_image.as_deref());

    conn.execute(
        "UPDATE users SET username = ?1, email = ?2, password = ?3, profile_image = ?4
         WHERE user_id = ?5",
        rusqlite::params![username, email, password, profile_image, user_id],
    )?;

    query_user_by_id(conn, user_id)
}

/// Partial, case-insensitive username match. `%` and `_` in the input are
/// matched literally.
pub fn query_search(
    conn: &Connection,
    text: &str,
    exclude_user_id: Option<i64>,
    alphabetical: bool,
    limit: u32,
) -> Result<Vec<ProfileRow>> {
    let escaped = text
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{escaped}%");

    let order = if alphabetical {
        "ORDER BY lower(username) ASC"
    } else {
        "ORDER BY user_id ASC"
    };
    let sql = format!(
        "SELECT user_id, username, email, profile_image
         FROM users
         WHERE lower(username) LIKE ?1 ESCAPE '\\'
           AND (?2 IS NULL OR user_id <> ?2)
         {order}
         LIMIT ?3"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![pattern, exclude_user_id, limit], profile_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testing::seeded;

    #[test]
    fn email_lookup_ignores_case_and_whitespace() {
        let db = seeded();
        let user = db.get_user_by_email("  ALICE@Example.com ").unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_differing_in_case_violates_index() {
        let db = seeded();
        assert!(db.create_user("alice2", "Alice@Example.com", "h", None).is_err());
        assert!(db.create_user("alice", "other@example.com", "h", None).is_err());
    }

    #[test]
    fn search_excludes_caller_and_orders() {
        let db = seeded();
        db.create_user("Alicia", "alicia@example.com", "h", None).unwrap();

        let ordered = db.search_users("LI", Some(1), true, 20).unwrap();
        let names: Vec<_> = ordered.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["Alicia"]);

        let all = db.search_users("a", None, true, 20).unwrap();
        let names: Vec<_> = all.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["alice", "Alicia", "carol"]);

        let unordered = db.search_users("a", None, false, 2).unwrap();
        assert_eq!(unordered.len(), 2);
        assert_eq!(unordered[0].user_id, 1);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let db = seeded();
        db.create_user("under_score", "u@example.com", "h", None).unwrap();
        assert!(db.search_users("%", None, true, 20).unwrap().is_empty());
        assert_eq!(db.search_users("_", None, true, 20).unwrap().len(), 1);
    }

    #[test]
    fn update_keeps_unspecified_columns() {
        let db = seeded();
        let update = ProfileUpdate {
            profile_image: Some("uploads/bob.png"),
            ..Default::default()
        };
        let updated = db
            .with_conn(|conn| update_profile(conn, 2, &update))
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "bob");
        assert_eq!(updated.email, "bob@example.com");
        assert_eq!(updated.profile_image.as_deref(), Some("uploads/bob.png"));

        let missing = db
            .with_conn(|conn| update_profile(conn, 99, &ProfileUpdate::default()))
            .unwrap();
        assert!(missing.is_none());
    }
}
