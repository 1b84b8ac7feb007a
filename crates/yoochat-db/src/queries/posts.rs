use std::collections::{HashMap, HashSet};

use anyhow::Result;
use rusqlite::{Connection, Row, params_from_iter};

use super::{OptionalExt, placeholders};
use crate::models::{PostRow, ReactionCountRow};
use crate::{Database, now_timestamp};

impl Database {
    /// Post row plus one image row per url, committed together.
    pub fn create_post_with_images(
        &self,
        user_id: i64,
        caption: Option<&str>,
        image_urls: &[String],
    ) -> Result<i64> {
        self.with_tx(|tx| {
            let post_id = insert_post(tx, user_id, caption)?;
            for url in image_urls {
                insert_post_image(tx, post_id, url)?;
            }
            Ok(post_id)
        })
    }

    pub fn get_post(&self, post_id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, post_id))
    }

    /// Newest first.
    pub fn posts_by_authors(&self, author_ids: &[i64]) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts_by_authors(conn, author_ids))
    }
}

const POST_SELECT: &str = "SELECT p.post_id, p.user_id, u.username, u.profile_image, p.caption, p.created_at
     FROM posts p
     JOIN users u ON u.user_id = p.user_id";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        post_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        profile_image: row.get(3)?,
        caption: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_post(conn: &Connection, user_id: i64, caption: Option<&str>) -> Result<i64> {
    conn.execute(
        "INSERT INTO posts (user_id, caption, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, caption, now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_post_image(conn: &Connection, post_id: i64, image_url: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO post_images (post_id, image_url) VALUES (?1, ?2)",
        rusqlite::params![post_id, image_url],
    )?;
    Ok(())
}

pub fn query_post(conn: &Connection, post_id: i64) -> Result<Option<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE p.post_id = ?1");
    conn.query_row(&sql, [post_id], post_from_row).optional()
}

pub fn query_posts_by_authors(conn: &Connection, author_ids: &[i64]) -> Result<Vec<PostRow>> {
    if author_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "{POST_SELECT} WHERE p.user_id IN ({}) ORDER BY p.created_at DESC, p.post_id DESC",
        placeholders(author_ids.len(), 0)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(author_ids), post_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Image urls keyed by post, in upload order. Posts without images are absent.
pub fn images_for_posts(conn: &Connection, post_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
    let mut map: HashMap<i64, Vec<String>> = HashMap::new();
    if post_ids.is_empty() {
        return Ok(map);
    }

    let sql = format!(
        "SELECT post_id, image_url FROM post_images WHERE post_id IN ({}) ORDER BY image_id",
        placeholders(post_ids.len(), 0)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(post_ids), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (post_id, url) = row?;
        map.entry(post_id).or_default().push(url);
    }
    Ok(map)
}

/// Total reactions per post, any type.
pub fn reaction_totals(conn: &Connection, post_ids: &[i64]) -> Result<HashMap<i64, i64>> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT post_id, COUNT(*) FROM post_reactions WHERE post_id IN ({}) GROUP BY post_id",
        placeholders(post_ids.len(), 0)
    );
    let mut stmt = conn.prepare(&sql)?;
    let map = stmt
        .query_map(params_from_iter(post_ids), |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<HashMap<i64, i64>, _>>()?;
    Ok(map)
}

/// Subset of `post_ids` the viewer has reacted to.
pub fn reacted_by(conn: &Connection, viewer_id: i64, post_ids: &[i64]) -> Result<HashSet<i64>> {
    if post_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let sql = format!(
        "SELECT post_id FROM post_reactions WHERE user_id = ?1 AND post_id IN ({})",
        placeholders(post_ids.len(), 1)
    );
    let params = std::iter::once(viewer_id).chain(post_ids.iter().copied());
    let mut stmt = conn.prepare(&sql)?;
    let set = stmt
        .query_map(params_from_iter(params), |row| row.get(0))?
        .collect::<std::result::Result<HashSet<i64>, _>>()?;
    Ok(set)
}

pub fn reaction_counts_by_type(conn: &Connection, post_id: i64) -> Result<Vec<ReactionCountRow>> {
    let mut stmt = conn.prepare(
        "SELECT reaction_type, COUNT(*) FROM post_reactions
         WHERE post_id = ?1
         GROUP BY reaction_type
         ORDER BY reaction_type",
    )?;
    let rows = stmt
        .query_map([post_id], |row| {
            Ok(ReactionCountRow {
                reaction_type: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Reaction id for (post, user), if one exists.
pub fn find_reaction(conn: &Connection, post_id: i64, user_id: i64) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT reaction_id FROM post_reactions WHERE post_id = ?1 AND user_id = ?2",
        [post_id, user_id],
        |r| r.get(0),
    )
    .optional()
}

pub fn insert_reaction(
    conn: &Connection,
    post_id: i64,
    user_id: i64,
    reaction_type: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO post_reactions (post_id, user_id, reaction_type, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![post_id, user_id, reaction_type, now_timestamp()],
    )?;
    Ok(())
}

pub fn delete_reaction(conn: &Connection, reaction_id: i64) -> Result<()> {
    conn.execute("DELETE FROM post_reactions WHERE reaction_id = ?1", [reaction_id])?;
    Ok(())
}

pub fn count_reactions(conn: &Connection, post_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM post_reactions WHERE post_id = ?1",
        [post_id],
        |r| r.get(0),
    )?)
}
