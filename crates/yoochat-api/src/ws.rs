use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;
use tracing::warn;

use yoochat_gateway::connection;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct GatewayQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Browsers cannot set headers on a websocket handshake, so the token may
/// also come as `?token=`. The header wins when both are present.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let token = bearer
        .map(|TypedHeader(auth)| auth.token().to_string())
        .or(query.token)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.social.verify_token(&token).map_err(|_| {
        warn!("Gateway handshake with an invalid token");
        ApiError::InvalidToken
    })?;

    let social = state.social.clone();
    let dispatcher = state.dispatcher.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, social, claims)
    }))
}
