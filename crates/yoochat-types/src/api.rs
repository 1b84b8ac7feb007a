use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the websocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

/// Plain `{ "message": ... }` body used for acknowledgements and errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

/// Registration fields. All optional at the wire level so that a missing
/// field is reported as a validation error instead of a parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub profile_image: Option<String>,
    pub user_email: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub username: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    /// Older clients send `search` instead of `q`.
    #[serde(default)]
    pub search: Option<String>,
}

impl SearchQuery {
    pub fn text(&self) -> &str {
        self.q
            .as_deref()
            .or(self.search.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub users: Vec<UserSummary>,
}

// -- Friendship --

#[derive(Debug, Default, Deserialize)]
pub struct ReceiverBody {
    #[serde(default)]
    pub receiver_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SenderBody {
    #[serde(default)]
    pub sender_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnfriendBody {
    #[serde(default)]
    pub user2_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendsResponse {
    pub message: String,
    pub friends: Vec<UserProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    pub sender_id: i64,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingRequestsResponse {
    pub pending_requests: Vec<PendingRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentRequest {
    pub receiver_id: i64,
    pub username: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SentRequestsResponse {
    pub sent_requests: Vec<SentRequest>,
}

// -- Blocking --

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockedUsersResponse {
    pub blocked_users: Vec<UserProfile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockBody {
    #[serde(default)]
    pub blocked_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub blocker_id: i64,
    pub blocked_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockResponse {
    pub message: String,
    pub blocked: BlockRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnblockResponse {
    pub message: String,
    pub unblocked: BlockRecord,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub receiver_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_media: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub receiver_id: i64,
    pub content: String,
    pub is_media: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation: Vec<ConversationMessage>,
}

// -- Feed --

/// Text part of the create-post form; images arrive as multipart files.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPost {
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub profile_image: Option<String>,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub images: Vec<String>,
    pub liked: bool,
    pub reaction_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub posts: Vec<FeedPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionCount {
    pub reaction_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub images: Vec<String>,
    pub reactions: Vec<ReactionCount>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReactRequest {
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub reaction_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactResponse {
    pub message: String,
    pub liked: bool,
    pub total_likes: i64,
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub notification_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub sender_id: i64,
    pub sender_username: String,
    pub sender_profile_image: Option<String>,
    pub post_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub message: String,
    pub updated: usize,
}
