use tracing::info;

use yoochat_db::Connection;
use yoochat_db::models::UserRow;
use yoochat_db::queries::{blocks, friendships, users};
use yoochat_types::api::{PendingRequest, SentRequest, UserProfile, UserSummary};
use yoochat_types::events::GatewayEvent;
use yoochat_types::models::{NotificationKind, SearchMode};

use crate::auth::{profile_view, summary_view};
use crate::notifications::record;
use crate::validation::require_id;
use crate::{Delivery, Social, SocialError, SocialResult};

pub const SEARCH_LIMIT: u32 = 20;

impl Social {
    /// `user_id` asks `receiver_id` to be friends.
    pub async fn send_friend_request(
        &self,
        user_id: i64,
        receiver_id: Option<i64>,
    ) -> SocialResult<Delivery> {
        let receiver_id = require_id(receiver_id, "receiver_id")?;
        if receiver_id == user_id {
            return Err(SocialError::invalid(
                "You cannot send a friend request to yourself",
            ));
        }

        self.blocking(move |db| {
            db.with_tx(|tx| {
                let sender = acting_user(tx, user_id)?;
                if !users::user_exists(tx, receiver_id)? {
                    return Err(SocialError::not_found("User not found"));
                }
                if blocks::blocked_either_way(tx, user_id, receiver_id)? {
                    return Err(SocialError::forbidden(
                        "You cannot send a friend request to this user",
                    ));
                }
                if friendships::relationship_between(tx, user_id, receiver_id)?.is_some() {
                    return Err(SocialError::invalid("Friendship already exists or pending"));
                }

                friendships::insert_request(tx, user_id, receiver_id)?;
                record(
                    tx,
                    receiver_id,
                    user_id,
                    &sender.username,
                    NotificationKind::FriendRequest,
                    None,
                )?;

                info!("Friend request {} -> {}", user_id, receiver_id);
                Ok(Delivery {
                    to: receiver_id,
                    event: GatewayEvent::NewFriendRequest {
                        sender_id: user_id,
                        sender_name: sender.username,
                    },
                })
            })
        })
        .await
    }

    /// `user_id` accepts the pending request sent by `sender_id`.
    pub async fn accept_friend_request(
        &self,
        user_id: i64,
        sender_id: Option<i64>,
    ) -> SocialResult<Delivery> {
        let sender_id = require_id(sender_id, "sender_id")?;
        reject_self(user_id, sender_id)?;

        self.blocking(move |db| {
            db.with_tx(|tx| {
                let me = acting_user(tx, user_id)?;
                if friendships::accept_request(tx, sender_id, user_id)? == 0 {
                    return Err(SocialError::invalid("No pending friend request found"));
                }
                record(
                    tx,
                    sender_id,
                    user_id,
                    &me.username,
                    NotificationKind::FriendAccept,
                    None,
                )?;

                info!("Friend request {} -> {} accepted", sender_id, user_id);
                Ok(Delivery {
                    to: sender_id,
                    event: GatewayEvent::FriendRequestAccepted {
                        user_id,
                        username: me.username,
                    },
                })
            })
        })
        .await
    }

    /// `user_id` turns down the pending request sent by `sender_id`.
    pub async fn decline_friend_request(
        &self,
        user_id: i64,
        sender_id: Option<i64>,
    ) -> SocialResult<Delivery> {
        let sender_id = require_id(sender_id, "sender_id")?;
        reject_self(user_id, sender_id)?;

        self.blocking(move |db| {
            db.with_tx(|tx| {
                let me = acting_user(tx, user_id)?;
                if friendships::delete_pending(tx, sender_id, user_id)? == 0 {
                    return Err(SocialError::invalid("No pending friend request found"));
                }
                record(
                    tx,
                    sender_id,
                    user_id,
                    &me.username,
                    NotificationKind::FriendDecline,
                    None,
                )?;

                info!("Friend request {} -> {} declined", sender_id, user_id);
                Ok(Delivery {
                    to: sender_id,
                    event: GatewayEvent::FriendRequestDeclined {
                        user_id,
                        username: me.username,
                    },
                })
            })
        })
        .await
    }

    /// `user_id` withdraws their own pending request to `receiver_id`.
    pub async fn cancel_friend_request(
        &self,
        user_id: i64,
        receiver_id: Option<i64>,
    ) -> SocialResult<Delivery> {
        let receiver_id = require_id(receiver_id, "receiver_id")?;
        reject_self(user_id, receiver_id)?;

        self.blocking(move |db| {
            db.with_tx(|tx| {
                if friendships::delete_pending(tx, user_id, receiver_id)? == 0 {
                    return Err(SocialError::invalid("No pending friend request to cancel"));
                }

                info!("Friend request {} -> {} cancelled", user_id, receiver_id);
                Ok(Delivery {
                    to: receiver_id,
                    event: GatewayEvent::FriendRequestCancelled { user_id },
                })
            })
        })
        .await
    }

    pub async fn unfriend(&self, user_id: i64, other_id: Option<i64>) -> SocialResult<Delivery> {
        let other_id = require_id(other_id, "user2_id")?;
        reject_self(user_id, other_id)?;

        self.blocking(move |db| {
            db.with_tx(|tx| {
                if friendships::delete_accepted(tx, user_id, other_id)? == 0 {
                    return Err(SocialError::invalid("No friendship found to unfriend"));
                }

                info!("Users {} and {} are no longer friends", user_id, other_id);
                Ok(Delivery {
                    to: other_id,
                    event: GatewayEvent::Unfriended { user_id },
                })
            })
        })
        .await
    }

    /// Accepted friends of the named user.
    pub async fn list_friends(&self, username: String) -> SocialResult<Vec<UserProfile>> {
        self.blocking(move |db| {
            let user = db
                .get_user_by_username(username.trim())?
                .ok_or_else(|| SocialError::not_found("User not found"))?;
            let friends = db.list_friends(user.user_id)?;
            Ok(friends.into_iter().map(profile_view).collect())
        })
        .await
    }

    /// Requests waiting on `user_id`.
    pub async fn pending_requests(&self, user_id: i64) -> SocialResult<Vec<PendingRequest>> {
        self.blocking(move |db| {
            let rows = db.list_incoming_requests(user_id)?;
            Ok(rows
                .into_iter()
                .map(|r| PendingRequest {
                    sender_id: r.user_id,
                    username: r.username,
                    email: r.email,
                    profile_image: r.profile_image,
                })
                .collect())
        })
        .await
    }

    /// Requests `user_id` has sent that are still pending.
    pub async fn sent_requests(&self, user_id: i64) -> SocialResult<Vec<SentRequest>> {
        self.blocking(move |db| {
            let rows = db.list_outgoing_requests(user_id)?;
            Ok(rows
                .into_iter()
                .map(|r| SentRequest {
                    receiver_id: r.user_id,
                    username: r.username,
                    profile_image: r.profile_image,
                })
                .collect())
        })
        .await
    }

    /// Username search, excluding the caller. Queries too short for the
    /// configured mode yield an empty list rather than an error.
    pub async fn search_users(&self, user_id: i64, query: &str) -> SocialResult<Vec<UserSummary>> {
        let mode = self.search_mode;
        let text = query.trim().to_string();
        if text.chars().count() < mode.min_query_len() {
            return Ok(Vec::new());
        }

        self.blocking(move |db| {
            let alphabetical = mode == SearchMode::Strict;
            let rows = db.search_users(&text, Some(user_id), alphabetical, SEARCH_LIMIT)?;
            Ok(rows.into_iter().map(summary_view).collect())
        })
        .await
    }
}

/// The caller's own row. A token can outlive its user only if the row was
/// removed out of band, which is reported as not found.
pub(crate) fn acting_user(conn: &Connection, user_id: i64) -> SocialResult<UserRow> {
    users::query_user_by_id(conn, user_id)?.ok_or_else(|| SocialError::not_found("User not found"))
}

fn reject_self(user_id: i64, other_id: i64) -> SocialResult<()> {
    if user_id == other_id {
        Err(SocialError::invalid("You cannot target yourself"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{befriend, social, social_with};

    #[tokio::test]
    async fn self_request_is_always_rejected() {
        let social = social();
        assert!(matches!(
            social.send_friend_request(1, Some(1)).await,
            Err(SocialError::Invalid(_))
        ));
        befriend(&social, 1, 2).await;
        assert!(matches!(
            social.send_friend_request(1, Some(1)).await,
            Err(SocialError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn send_then_accept_makes_friends() {
        let social = social();
        let delivery = social.send_friend_request(1, Some(2)).await.unwrap();
        assert_eq!(delivery.to, 2);
        assert!(matches!(
            delivery.event,
            GatewayEvent::NewFriendRequest { sender_id: 1, ref sender_name } if sender_name == "alice"
        ));

        let delivery = social.accept_friend_request(2, Some(1)).await.unwrap();
        assert_eq!(delivery.to, 1);

        assert!(social.db().friendship_exists(1, 2).unwrap());
        assert!(!social.db().pending_request_exists(1, 2).unwrap());
        assert!(social.pending_requests(2).await.unwrap().is_empty());

        let friends = social.list_friends("alice".into()).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].username, "bob");

        let kinds: Vec<_> = social
            .notifications(1)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(kinds, ["friend_accept"]);
    }

    #[tokio::test]
    async fn reverse_request_while_pending_is_rejected() {
        let social = social();
        social.send_friend_request(1, Some(2)).await.unwrap();
        let err = social.send_friend_request(2, Some(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Friendship already exists or pending");
    }

    #[tokio::test]
    async fn missing_and_unknown_counterparts() {
        let social = social();
        let err = social.send_friend_request(1, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing receiver_id");
        assert!(matches!(
            social.send_friend_request(1, Some(99)).await,
            Err(SocialError::NotFound(_))
        ));
        assert!(matches!(
            social.accept_friend_request(2, Some(1)).await,
            Err(SocialError::Invalid(_))
        ));
        assert!(matches!(
            social.list_friends("nobody".into()).await,
            Err(SocialError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn decline_and_cancel_remove_the_request() {
        let social = social();
        social.send_friend_request(1, Some(2)).await.unwrap();
        social.send_friend_request(1, Some(3)).await.unwrap();
        assert_eq!(social.sent_requests(1).await.unwrap().len(), 2);

        let declined = social.decline_friend_request(2, Some(1)).await.unwrap();
        assert!(matches!(declined.event, GatewayEvent::FriendRequestDeclined { user_id: 2, .. }));

        let cancelled = social.cancel_friend_request(1, Some(3)).await.unwrap();
        assert_eq!(cancelled.to, 3);
        assert!(social.sent_requests(1).await.unwrap().is_empty());

        // Receiver cannot cancel on the sender's behalf
        social.send_friend_request(1, Some(2)).await.unwrap();
        assert!(social.cancel_friend_request(2, Some(1)).await.is_err());
    }

    #[tokio::test]
    async fn unfriend_requires_an_accepted_friendship() {
        let social = social();
        social.send_friend_request(1, Some(2)).await.unwrap();
        let err = social.unfriend(1, Some(2)).await.unwrap_err();
        assert_eq!(err.to_string(), "No friendship found to unfriend");

        social.accept_friend_request(2, Some(1)).await.unwrap();
        let delivery = social.unfriend(2, Some(1)).await.unwrap();
        assert!(matches!(delivery.event, GatewayEvent::Unfriended { user_id: 2 }));
        assert!(!social.db().friendship_exists(1, 2).unwrap());
    }

    #[tokio::test]
    async fn blocked_users_cannot_request() {
        let social = social();
        social.block_user(2, Some(1)).await.unwrap();
        assert!(matches!(
            social.send_friend_request(1, Some(2)).await,
            Err(SocialError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn search_modes_differ_on_short_queries() {
        let strict = social();
        assert!(strict.search_users(2, "a").await.unwrap().is_empty());
        let names: Vec<_> = strict
            .search_users(2, "ar")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["carol"]);

        let lenient = social_with(SearchMode::Lenient);
        let names: Vec<_> = lenient
            .search_users(2, "a")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["alice", "carol"]);
        assert!(lenient.search_users(2, "   ").await.unwrap().is_empty());
    }
}
