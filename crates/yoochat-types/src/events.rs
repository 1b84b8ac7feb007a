use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events pushed to clients over the websocket gateway. Each event is
/// delivered to the room of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Server confirms the connection is authenticated and joined its room
    Ready { user_id: i64, username: String },

    /// A direct message. The recipient gets the stored (enciphered) content,
    /// the sender gets a plaintext echo.
    ReceiveMessage {
        message_id: i64,
        sender_id: i64,
        sender_name: String,
        receiver_id: i64,
        content: String,
        is_media: bool,
        timestamp: DateTime<Utc>,
    },

    NewFriendRequest { sender_id: i64, sender_name: String },

    FriendRequestAccepted { user_id: i64, username: String },

    FriendRequestDeclined { user_id: i64, username: String },

    FriendRequestCancelled { user_id: i64 },

    Unfriended { user_id: i64 },

    /// A command from this connection was rejected
    Error { action: String, message: String },
}

/// Commands sent FROM client TO server over the websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GatewayCommand {
    SendMessage {
        to: i64,
        content: String,
        #[serde(default)]
        is_media: bool,
    },

    SendFriendRequest { receiver_id: i64 },

    AcceptFriendRequest { sender_id: i64 },

    DeclineFriendRequest { sender_id: i64 },

    CancelFriendRequest { receiver_id: i64 },

    Unfriend { user2_id: i64 },
}

impl GatewayCommand {
    /// Wire name of the command, echoed back in `Error` events.
    pub fn action(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::SendFriendRequest { .. } => "send_friend_request",
            Self::AcceptFriendRequest { .. } => "accept_friend_request",
            Self::DeclineFriendRequest { .. } => "decline_friend_request",
            Self::CancelFriendRequest { .. } => "cancel_friend_request",
            Self::Unfriend { .. } => "unfriend",
        }
    }
}
