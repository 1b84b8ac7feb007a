use anyhow::anyhow;
use tracing::{debug, error};

use yoochat_db::models::MessageRow;
use yoochat_db::parse_timestamp;
use yoochat_db::queries::{blocks, friendships, messages};
use yoochat_types::api::ConversationMessage;
use yoochat_types::events::GatewayEvent;

use crate::validation::require_id;
use crate::{Delivery, Social, SocialError, SocialResult};

const NOT_FRIENDS: &str = "You are not friends with this user";

impl Social {
    /// Store a direct message and return the two pushes it produces: the
    /// stored form to the recipient and a plaintext echo to the sender.
    ///
    /// Text is enciphered before it is written. Media messages carry an
    /// upload path and are stored as given.
    pub async fn send_message(
        &self,
        user_id: i64,
        receiver_id: Option<i64>,
        content: Option<String>,
        is_media: bool,
    ) -> SocialResult<Vec<Delivery>> {
        let (Some(receiver_id), Some(content)) =
            (receiver_id, content.filter(|c| !c.trim().is_empty()))
        else {
            return Err(SocialError::invalid("Receiver and content are required"));
        };

        let stored = if is_media {
            content.clone()
        } else {
            self.cipher
                .encrypt(&content)
                .map_err(|e| SocialError::invalid(format!("Message cannot be sent: {e}")))?
        };

        self.blocking(move |db| {
            let row = db.with_tx(|tx| {
                if blocks::blocked_either_way(tx, user_id, receiver_id)? {
                    return Err(SocialError::forbidden("You cannot message this user"));
                }
                if !friendships::accepted_between(tx, user_id, receiver_id)? {
                    return Err(SocialError::forbidden(NOT_FRIENDS));
                }
                Ok(messages::insert_message(
                    tx,
                    user_id,
                    receiver_id,
                    &stored,
                    is_media,
                )?)
            })?;

            debug!("Message {} from {} to {}", row.message_id, user_id, receiver_id);
            let to_recipient = receive_event(&row, row.content.clone());
            let echo = receive_event(&row, content);
            Ok(vec![
                Delivery {
                    to: receiver_id,
                    event: to_recipient,
                },
                Delivery {
                    to: user_id,
                    event: echo,
                },
            ])
        })
        .await
    }

    /// Full history with a friend, oldest first, text deciphered.
    pub async fn conversation(
        &self,
        user_id: i64,
        friend_id: Option<i64>,
    ) -> SocialResult<Vec<ConversationMessage>> {
        let friend_id = require_id(friend_id, "friend_id")?;
        let cipher = self.cipher.clone();

        self.blocking(move |db| {
            if !db.friendship_exists(user_id, friend_id)? {
                return Err(SocialError::forbidden(NOT_FRIENDS));
            }

            db.get_conversation(user_id, friend_id)?
                .into_iter()
                .map(|row| -> SocialResult<ConversationMessage> {
                    let content = if row.is_media {
                        row.content.clone()
                    } else {
                        cipher.decrypt(&row.content).map_err(|e| {
                            error!("Message {} cannot be deciphered: {}", row.message_id, e);
                            SocialError::Internal(anyhow!(e))
                        })?
                    };
                    Ok(ConversationMessage {
                        message_id: row.message_id,
                        sender_id: row.sender_id,
                        sender_name: row.sender_name,
                        receiver_id: row.receiver_id,
                        content,
                        is_media: row.is_media,
                        timestamp: parse_timestamp(&row.created_at),
                    })
                })
                .collect::<SocialResult<Vec<_>>>()
        })
        .await
    }
}

fn receive_event(row: &MessageRow, content: String) -> GatewayEvent {
    GatewayEvent::ReceiveMessage {
        message_id: row.message_id,
        sender_id: row.sender_id,
        sender_name: row.sender_name.clone(),
        receiver_id: row.receiver_id,
        content,
        is_media: row.is_media,
        timestamp: parse_timestamp(&row.created_at),
    }
}
