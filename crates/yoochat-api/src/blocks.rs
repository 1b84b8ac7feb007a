use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use yoochat_types::api::{BlockBody, BlockResponse, BlockedUsersResponse, Claims, UnblockResponse};

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::ApiJson;

pub async fn block_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<BlockBody>,
) -> ApiResult<impl IntoResponse> {
    let blocked = state.social.block_user(claims.sub, body.blocked_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BlockResponse {
            message: "User blocked successfully".to_string(),
            blocked,
        }),
    ))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<BlockBody>,
) -> ApiResult<impl IntoResponse> {
    let unblocked = state.social.unblock_user(claims.sub, body.blocked_id).await?;
    Ok(Json(UnblockResponse {
        message: "User unblocked successfully".to_string(),
        unblocked,
    }))
}

pub async fn list_blocked(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let blocked_users = state.social.blocked_users(claims.sub).await?;
    Ok(Json(BlockedUsersResponse { blocked_users }))
}
