//! Plain row structs returned by the query modules. The API layer maps
//! them onto `yoochat-types` responses.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_image: Option<String>,
    pub created_at: String,
}

/// Public user columns, used by every list that joins against `users`.
#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FriendshipRow {
    pub friendship_id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct BlockRow {
    pub blocker_id: i64,
    pub blocked_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub message_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub sender_name: String,
    pub content: String,
    pub is_media: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub profile_image: Option<String>,
    pub caption: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PostImageRow {
    pub post_id: i64,
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub struct ReactionCountRow {
    pub reaction_type: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub notification_id: i64,
    pub user_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub sender_profile_image: Option<String>,
    pub kind: String,
    pub post_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

/// Insert parameters for `notifications::create_if_not_exists`.
#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub user_id: i64,
    pub actor_id: i64,
    pub kind: &'a str,
    pub post_id: Option<i64>,
    pub message: &'a str,
}
