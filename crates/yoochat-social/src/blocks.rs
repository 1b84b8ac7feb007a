use tracing::info;

use yoochat_db::models::BlockRow;
use yoochat_db::parse_timestamp;
use yoochat_db::queries::{blocks, users};
use yoochat_types::api::{BlockRecord, UserProfile};

use crate::auth::profile_view;
use crate::validation::require_id;
use crate::{Social, SocialError, SocialResult};

impl Social {
    pub async fn block_user(&self, user_id: i64, blocked_id: Option<i64>) -> SocialResult<BlockRecord> {
        let blocked_id = require_id(blocked_id, "blocked_id")?;
        if blocked_id == user_id {
            return Err(SocialError::invalid("You cannot block yourself"));
        }

        self.blocking(move |db| {
            db.with_tx(|tx| {
                if !users::user_exists(tx, blocked_id)? {
                    return Err(SocialError::not_found("User not found"));
                }
                if blocks::is_blocked(tx, user_id, blocked_id)? {
                    return Err(SocialError::invalid("User already blocked"));
                }
                let row = blocks::insert_block(tx, user_id, blocked_id)?;
                info!("User {} blocked {}", user_id, blocked_id);
                Ok(block_record(row))
            })
        })
        .await
    }

    pub async fn unblock_user(
        &self,
        user_id: i64,
        blocked_id: Option<i64>,
    ) -> SocialResult<BlockRecord> {
        let blocked_id = require_id(blocked_id, "blocked_id")?;

        self.blocking(move |db| {
            let row = db
                .with_conn(|conn| blocks::delete_block(conn, user_id, blocked_id))?
                .ok_or_else(|| SocialError::not_found("Block not found"))?;
            info!("User {} unblocked {}", user_id, blocked_id);
            Ok(block_record(row))
        })
        .await
    }

    pub async fn blocked_users(&self, user_id: i64) -> SocialResult<Vec<UserProfile>> {
        self.blocking(move |db| {
            let rows = db.list_blocked(user_id)?;
            Ok(rows.into_iter().map(profile_view).collect())
        })
        .await
    }
}

fn block_record(row: BlockRow) -> BlockRecord {
    BlockRecord {
        blocker_id: row.blocker_id,
        blocked_id: row.blocked_id,
        created_at: parse_timestamp(&row.created_at),
    }
}
