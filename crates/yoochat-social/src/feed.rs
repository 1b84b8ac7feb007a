use tracing::info;

use yoochat_db::models::PostRow;
use yoochat_db::queries::posts;
use yoochat_db::{Connection, Database, parse_timestamp};
use yoochat_types::api::{FeedPost, PostDetail, ReactResponse, ReactionCount};
use yoochat_types::models::NotificationKind;

use crate::friends::acting_user;
use crate::notifications::record;
use crate::validation::{non_blank, require_id};
use crate::{Social, SocialError, SocialResult};

pub const MAX_POST_IMAGES: usize = 10;
pub const DEFAULT_REACTION: &str = "like";

impl Social {
    /// `image_urls` are paths of files already written to the upload dir.
    pub async fn create_post(
        &self,
        user_id: i64,
        caption: Option<String>,
        image_urls: Vec<String>,
    ) -> SocialResult<i64> {
        if image_urls.is_empty() {
            return Err(SocialError::invalid("At least one image is required"));
        }
        if image_urls.len() > MAX_POST_IMAGES {
            return Err(SocialError::invalid(format!(
                "A post can have at most {MAX_POST_IMAGES} images"
            )));
        }
        let caption = non_blank(caption);

        self.blocking(move |db| {
            let post_id = db.create_post_with_images(user_id, caption.as_deref(), &image_urls)?;
            info!("User {} created post {} ({} images)", user_id, post_id, image_urls.len());
            Ok(post_id)
        })
        .await
    }

    /// Posts by the caller's accepted friends, newest first.
    pub async fn friends_posts(&self, user_id: i64) -> SocialResult<Vec<FeedPost>> {
        self.blocking(move |db| {
            let friends = db.friend_ids(user_id)?;
            let rows = db.posts_by_authors(&friends)?;
            decorate(db, user_id, rows)
        })
        .await
    }

    pub async fn my_posts(&self, user_id: i64) -> SocialResult<Vec<FeedPost>> {
        self.blocking(move |db| {
            let rows = db.posts_by_authors(&[user_id])?;
            decorate(db, user_id, rows)
        })
        .await
    }

    pub async fn post_detail(&self, post_id: i64) -> SocialResult<PostDetail> {
        self.blocking(move |db| {
            let post = db
                .get_post(post_id)?
                .ok_or_else(|| SocialError::not_found("Post not found"))?;

            db.with_conn(|conn| {
                let mut images = posts::images_for_posts(conn, &[post_id])?;
                let reactions = posts::reaction_counts_by_type(conn, post_id)?
                    .into_iter()
                    .map(|r| ReactionCount {
                        reaction_type: r.reaction_type,
                        count: r.count,
                    })
                    .collect();

                Ok(PostDetail {
                    post_id: post.post_id,
                    user_id: post.user_id,
                    username: post.username,
                    caption: post.caption,
                    created_at: parse_timestamp(&post.created_at),
                    images: images.remove(&post_id).unwrap_or_default(),
                    reactions,
                })
            })
            .map_err(SocialError::from)
        })
        .await
    }

    /// Toggle the caller's reaction on a post. A new reaction on someone
    /// else's post notifies the author in the same transaction.
    pub async fn react_to_post(
        &self,
        user_id: i64,
        post_id: Option<i64>,
        reaction_type: Option<String>,
    ) -> SocialResult<ReactResponse> {
        let post_id = require_id(post_id, "post_id")?;
        let reaction_type = non_blank(reaction_type).unwrap_or_else(|| DEFAULT_REACTION.to_string());

        self.blocking(move |db| {
            db.with_tx(|tx| {
                let post = posts::query_post(tx, post_id)?
                    .ok_or_else(|| SocialError::not_found("Post not found"))?;

                let liked = match posts::find_reaction(tx, post_id, user_id)? {
                    Some(reaction_id) => {
                        posts::delete_reaction(tx, reaction_id)?;
                        false
                    }
                    None => {
                        posts::insert_reaction(tx, post_id, user_id, &reaction_type)?;
                        if post.user_id != user_id {
                            notify_author(tx, &post, user_id)?;
                        }
                        true
                    }
                };

                let total_likes = posts::count_reactions(tx, post_id)?;
                Ok(ReactResponse {
                    message: if liked { "Post liked" } else { "Post unliked" }.to_string(),
                    liked,
                    total_likes,
                })
            })
        })
        .await
    }
}

fn notify_author(conn: &Connection, post: &PostRow, reactor_id: i64) -> SocialResult<()> {
    let reactor = acting_user(conn, reactor_id)?;
    record(
        conn,
        post.user_id,
        reactor_id,
        &reactor.username,
        NotificationKind::Like,
        Some(post.post_id),
    )
}

/// Attach images, reaction totals and the viewer's own like to each post.
fn decorate(db: &Database, viewer_id: i64, rows: Vec<PostRow>) -> SocialResult<Vec<FeedPost>> {
    let ids: Vec<i64> = rows.iter().map(|p| p.post_id).collect();

    let (mut images, totals, liked) = db.with_conn(|conn| {
        Ok((
            posts::images_for_posts(conn, &ids)?,
            posts::reaction_totals(conn, &ids)?,
            posts::reacted_by(conn, viewer_id, &ids)?,
        ))
    })?;

    Ok(rows
        .into_iter()
        .map(|p| FeedPost {
            images: images.remove(&p.post_id).unwrap_or_default(),
            liked: liked.contains(&p.post_id),
            reaction_count: totals.get(&p.post_id).copied().unwrap_or(0),
            created_at: parse_timestamp(&p.created_at),
            post_id: p.post_id,
            user_id: p.user_id,
            username: p.username,
            profile_image: p.profile_image,
            caption: p.caption,
        })
        .collect())
}
