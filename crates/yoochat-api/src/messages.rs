use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use yoochat_types::api::{Claims, ConversationResponse, MessageBody, SendMessageRequest};

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::ApiJson;

/// Store a message and push it to both rooms; the HTTP reply is only an
/// acknowledgement.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let deliveries = state
        .social
        .send_message(claims.sub, req.receiver_id, req.content, req.is_media)
        .await?;
    state.dispatcher.deliver_all(deliveries).await;

    Ok((
        StatusCode::CREATED,
        Json(MessageBody::new("Message sent successfully")),
    ))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(friend_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let conversation = state.social.conversation(claims.sub, Some(friend_id)).await?;
    Ok(Json(ConversationResponse { conversation }))
}
