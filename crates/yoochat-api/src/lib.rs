//! HTTP surface of the YooChat server.

pub mod auth;
pub mod blocks;
pub mod error;
pub mod extract;
pub mod feed;
pub mod friendships;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod uploads;
pub mod users;
pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::services::ServeDir;

use yoochat_gateway::Dispatcher;
use yoochat_social::{Delivery, Social};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub social: Arc<Social>,
    pub dispatcher: Dispatcher,
    pub upload_dir: PathBuf,
}

impl AppStateInner {
    /// Push a mutation's event to the affected user's open connections.
    pub async fn emit(&self, delivery: Delivery) {
        self.dispatcher.deliver(delivery).await;
    }
}

/// Every route the server exposes. Logging and CORS layers are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/users/{username}", get(users::get_by_username))
        .route("/gateway", get(ws::ws_upgrade))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/search", get(users::search))
        .route("/users/blocked", get(blocks::list_blocked))
        .route("/users/update", put(users::update_profile))
        .route("/friendship/sendRequest", post(friendships::send_request))
        .route("/friendship/acceptRequest", post(friendships::accept_request))
        .route("/friendship/declineRequest", post(friendships::decline_request))
        .route("/friendship/cancelRequest", post(friendships::cancel_request))
        .route("/friendship/unfriend", post(friendships::unfriend))
        .route("/friendship/list/{username}", get(friendships::list_friends))
        .route("/friendship/pendingRequests", get(friendships::pending_requests))
        .route("/friendship/sentRequests", get(friendships::sent_requests))
        .route("/message/send", post(messages::send_message))
        .route("/message/conversation/{friend_id}", get(messages::get_conversation))
        .route("/block", post(blocks::block_user))
        .route("/unblock", post(blocks::unblock_user))
        .route("/blocked", get(blocks::list_blocked))
        .route("/feed/createPost", post(feed::create_post))
        .route("/feed/posts", get(feed::friends_posts))
        .route("/feed/myPosts", get(feed::my_posts))
        .route("/feed/post/{post_id}", get(feed::get_post))
        .route("/feed/like", post(feed::react))
        .route("/notifications", get(notifications::list))
        .route("/notifications/read", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let upload_files = ServeDir::new(&state.upload_dir);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", upload_files)
        .layer(DefaultBodyLimit::max(uploads::MAX_BODY_SIZE))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
