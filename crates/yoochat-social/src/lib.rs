//! Business rules shared by the HTTP handlers and the websocket gateway.
//!
//! Every operation takes the acting user's id (from the verified token),
//! runs its SQL on the blocking pool and returns typed results from
//! `yoochat-types`. Mutations that a connected peer should hear about also
//! return the [`Delivery`] to push, so both transports emit the same events.

pub mod auth;
pub mod blocks;
pub mod error;
pub mod feed;
pub mod friends;
pub mod messaging;
pub mod notifications;
pub mod validation;

use std::sync::Arc;

use anyhow::anyhow;

use yoochat_crypto::MessageCipher;
use yoochat_db::Database;
use yoochat_types::events::GatewayEvent;
use yoochat_types::models::SearchMode;

pub use auth::{NewUser, ProfileChanges, UpdatedProfile};
pub use error::{SocialError, SocialResult};

/// An event addressed to every connection of one user.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub to: i64,
    pub event: GatewayEvent,
}

pub struct Social {
    db: Arc<Database>,
    cipher: Arc<dyn MessageCipher>,
    search_mode: SearchMode,
    jwt_secret: String,
}

impl Social {
    pub fn new(
        db: Arc<Database>,
        cipher: Arc<dyn MessageCipher>,
        search_mode: SearchMode,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            db,
            cipher,
            search_mode,
            jwt_secret: jwt_secret.into(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Run `f` against the database on tokio's blocking pool.
    async fn blocking<F, T>(&self, f: F) -> SocialResult<T>
    where
        F: FnOnce(&Database) -> SocialResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| SocialError::Internal(anyhow!("blocking task failed: {e}")))?
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use yoochat_crypto::HillCipher;

    pub const SECRET: &str = "test-secret";

    /// Service over a fresh in-memory database with users `alice`, `bob`
    /// and `carol` (ids 1, 2, 3). The stored hashes are not valid argon2,
    /// so these users cannot log in.
    pub fn social_with(mode: SearchMode) -> Social {
        let db = Database::open_in_memory().unwrap();
        for name in ["alice", "bob", "carol"] {
            db.create_user(name, &format!("{name}@example.com"), "hash", None)
                .unwrap();
        }
        let cipher = Arc::new(HillCipher::from_key("GYBNQKURP").unwrap());
        Social::new(Arc::new(db), cipher, mode, SECRET)
    }

    pub fn social() -> Social {
        social_with(SearchMode::Strict)
    }

    /// Make `a` and `b` friends.
    pub async fn befriend(social: &Social, a: i64, b: i64) {
        social.send_friend_request(a, Some(b)).await.unwrap();
        social.accept_friend_request(b, Some(a)).await.unwrap();
    }
}
