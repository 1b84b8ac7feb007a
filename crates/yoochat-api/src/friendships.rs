//! Friend request lifecycle. Every successful mutation is also pushed to
//! the counterpart's gateway room, same as the websocket commands.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use yoochat_types::api::{
    Claims, FriendsResponse, MessageBody, PendingRequestsResponse, ReceiverBody, SenderBody,
    SentRequestsResponse, UnfriendBody,
};

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::ApiJson;

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<ReceiverBody>,
) -> ApiResult<impl IntoResponse> {
    let delivery = state
        .social
        .send_friend_request(claims.sub, body.receiver_id)
        .await?;
    state.emit(delivery).await;
    Ok((StatusCode::CREATED, Json(MessageBody::new("Friend request sent"))))
}

pub async fn accept_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<SenderBody>,
) -> ApiResult<impl IntoResponse> {
    let delivery = state
        .social
        .accept_friend_request(claims.sub, body.sender_id)
        .await?;
    state.emit(delivery).await;
    Ok(Json(MessageBody::new("Friend request accepted")))
}

pub async fn decline_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<SenderBody>,
) -> ApiResult<impl IntoResponse> {
    let delivery = state
        .social
        .decline_friend_request(claims.sub, body.sender_id)
        .await?;
    state.emit(delivery).await;
    Ok(Json(MessageBody::new("Friend request declined")))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<ReceiverBody>,
) -> ApiResult<impl IntoResponse> {
    let delivery = state
        .social
        .cancel_friend_request(claims.sub, body.receiver_id)
        .await?;
    state.emit(delivery).await;
    Ok(Json(MessageBody::new("Friend request cancelled")))
}

pub async fn unfriend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<UnfriendBody>,
) -> ApiResult<impl IntoResponse> {
    let delivery = state.social.unfriend(claims.sub, body.user2_id).await?;
    state.emit(delivery).await;
    Ok(Json(MessageBody::new("Unfriended successfully")))
}

pub async fn list_friends(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let friends = state.social.list_friends(username).await?;
    Ok(Json(FriendsResponse {
        message: "Friends list retrieved successfully".to_string(),
        friends,
    }))
}

pub async fn pending_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let pending_requests = state.social.pending_requests(claims.sub).await?;
    Ok(Json(PendingRequestsResponse { pending_requests }))
}

pub async fn sent_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let sent_requests = state.social.sent_requests(claims.sub).await?;
    Ok(Json(SentRequestsResponse { sent_requests }))
}
