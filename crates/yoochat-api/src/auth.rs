use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
};

use yoochat_social::NewUser;
use yoochat_types::api::{LoginRequest, RegisterRequest, RegisterResponse};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::uploads::read_form;

pub const PROFILE_IMAGE_FIELD: &str = "profileImage";

/// Multipart (with an optional `profileImage` file) or JSON.
pub async fn register(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(request, &state.upload_dir, &[PROFILE_IMAGE_FIELD], 1).await?;

    let result = async {
        let req: RegisterRequest = form.parse()?;
        let new_user = NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
            profile_image: form.first_url(PROFILE_IMAGE_FIELD),
        };
        let user = state.social.register(new_user).await?;
        Ok::<_, ApiError>(user)
    }
    .await;

    match result {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(RegisterResponse {
                message: "User registered successfully".to_string(),
                user,
            }),
        )),
        Err(e) => {
            form.discard(&state.upload_dir).await;
            Err(e)
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state.social.login(req.email, req.password).await?;
    Ok(Json(response))
}
