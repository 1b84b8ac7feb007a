use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
};

use yoochat_social::feed::MAX_POST_IMAGES;
use yoochat_types::api::{
    Claims, CreatePostRequest, CreatePostResponse, FeedResponse, ReactRequest,
};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::uploads::read_form;

pub const IMAGES_FIELD: &str = "images";

/// Multipart form: optional `caption` plus one to ten `images` files.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    request: Request,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(request, &state.upload_dir, &[IMAGES_FIELD], MAX_POST_IMAGES).await?;

    let result = async {
        let req: CreatePostRequest = form.parse()?;
        let post_id = state
            .social
            .create_post(claims.sub, req.caption, form.urls(IMAGES_FIELD))
            .await?;
        Ok::<_, ApiError>(post_id)
    }
    .await;

    match result {
        Ok(post_id) => Ok((
            StatusCode::CREATED,
            Json(CreatePostResponse {
                message: "Post created successfully".to_string(),
                post_id,
            }),
        )),
        Err(e) => {
            form.discard(&state.upload_dir).await;
            Err(e)
        }
    }
}

pub async fn friends_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let posts = state.social.friends_posts(claims.sub).await?;
    Ok(Json(FeedResponse { posts }))
}

pub async fn my_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let posts = state.social.my_posts(claims.sub).await?;
    Ok(Json(FeedResponse { posts }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.social.post_detail(post_id).await?))
}

pub async fn react(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ReactRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state
        .social
        .react_to_post(claims.sub, req.post_id, req.reaction_type)
        .await?;
    Ok(Json(response))
}
