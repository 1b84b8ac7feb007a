use tracing::debug;

use yoochat_db::Connection;
use yoochat_db::models::{NewNotification, NotificationRow};
use yoochat_db::parse_timestamp;
use yoochat_db::queries::notifications::create_if_not_exists;
use yoochat_types::api::NotificationView;
use yoochat_types::models::NotificationKind;

use crate::{Social, SocialError, SocialResult};

impl Social {
    pub async fn notifications(&self, user_id: i64) -> SocialResult<Vec<NotificationView>> {
        self.blocking(move |db| {
            let rows = db.list_notifications(user_id)?;
            Ok(rows.into_iter().map(notification_view).collect())
        })
        .await
    }

    pub async fn mark_notification_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> SocialResult<()> {
        self.blocking(move |db| {
            if db.mark_notification_read(user_id, notification_id)? {
                Ok(())
            } else {
                Err(SocialError::not_found("Notification not found"))
            }
        })
        .await
    }

    /// Returns how many notifications were unread.
    pub async fn mark_all_notifications_read(&self, user_id: i64) -> SocialResult<usize> {
        self.blocking(move |db| Ok(db.mark_all_notifications_read(user_id)?))
            .await
    }
}

/// Record a notification for `recipient_id` unless an identical one exists.
/// Runs on the caller's connection so it shares the caller's transaction.
pub(crate) fn record(
    conn: &Connection,
    recipient_id: i64,
    actor_id: i64,
    actor_name: &str,
    kind: NotificationKind,
    post_id: Option<i64>,
) -> SocialResult<()> {
    let message = kind.message(actor_name);
    let created = create_if_not_exists(
        conn,
        &NewNotification {
            user_id: recipient_id,
            actor_id,
            kind: kind.as_str(),
            post_id,
            message: &message,
        },
    )?;
    if !created {
        debug!(
            "Skipped duplicate {} notification for user {}",
            kind.as_str(),
            recipient_id
        );
    }
    Ok(())
}

fn notification_view(row: NotificationRow) -> NotificationView {
    NotificationView {
        notification_id: row.notification_id,
        kind: row.kind,
        sender_id: row.sender_id,
        sender_username: row.sender_username,
        sender_profile_image: row.sender_profile_image,
        post_id: row.post_id,
        message: row.message,
        is_read: row.is_read,
        created_at: parse_timestamp(&row.created_at),
    }
}
