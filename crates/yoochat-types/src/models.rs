use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a friendship row. Declined and cancelled requests are
/// deleted rather than given a status of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequest,
    FriendAccept,
    FriendDecline,
    Like,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FriendRequest => "friend_request",
            Self::FriendAccept => "friend_accept",
            Self::FriendDecline => "friend_decline",
            Self::Like => "like",
        }
    }

    /// Human readable text stored alongside the notification.
    pub fn message(&self, actor_username: &str) -> String {
        match self {
            Self::FriendRequest => format!("{actor_username} sent you a friend request"),
            Self::FriendAccept => format!("{actor_username} accepted your friend request"),
            Self::FriendDecline => format!("{actor_username} declined your friend request"),
            Self::Like => format!("{actor_username} liked your post"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friend_request" => Ok(Self::FriendRequest),
            "friend_accept" => Ok(Self::FriendAccept),
            "friend_decline" => Ok(Self::FriendDecline),
            "like" => Ok(Self::Like),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Which user-search validation path the server runs.
///
/// `Strict` requires at least two characters and sorts by username.
/// `Lenient` searches on any non-blank query and keeps storage order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    Strict,
    Lenient,
}

impl SearchMode {
    pub fn min_query_len(&self) -> usize {
        match self {
            Self::Strict => 2,
            Self::Lenient => 1,
        }
    }
}

impl FromStr for SearchMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_mode_parses_case_insensitively() {
        assert_eq!("STRICT".parse::<SearchMode>().unwrap(), SearchMode::Strict);
        assert_eq!(" lenient ".parse::<SearchMode>().unwrap(), SearchMode::Lenient);
        assert!("fuzzy".parse::<SearchMode>().is_err());
    }

    #[test]
    fn notification_kind_roundtrips_through_str() {
        for kind in [
            NotificationKind::FriendRequest,
            NotificationKind::FriendAccept,
            NotificationKind::FriendDecline,
            NotificationKind::Like,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
    }
}
