use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use yoochat_types::api::{Claims, MarkReadResponse, NotificationsResponse};

use crate::AppState;
use crate::error::ApiResult;

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let notifications = state.social.notifications(claims.sub).await?;
    Ok(Json(NotificationsResponse { notifications }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    state
        .social
        .mark_notification_read(claims.sub, notification_id)
        .await?;
    Ok(Json(MarkReadResponse {
        message: "Notification marked as read".to_string(),
        updated: 1,
    }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let updated = state.social.mark_all_notifications_read(claims.sub).await?;
    Ok(Json(MarkReadResponse {
        message: "Notifications marked as read".to_string(),
        updated,
    }))
}
