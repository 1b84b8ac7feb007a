use axum::{
    Extension, Json,
    extract::{Path, Query, Request, State},
    response::IntoResponse,
};

use yoochat_social::ProfileChanges;
use yoochat_types::api::{
    Claims, SearchQuery, SearchResponse, UpdateProfileRequest, UpdateProfileResponse,
};

use crate::AppState;
use crate::auth::PROFILE_IMAGE_FIELD;
use crate::error::{ApiError, ApiResult};
use crate::uploads::{read_form, remove_stored};

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.social.profile(claims.sub).await?))
}

pub async fn get_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.social.user_by_username(username).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let users = state.social.search_users(claims.sub, query.text()).await?;
    Ok(Json(SearchResponse { users }))
}

/// Any subset of username, email, password and a new `profileImage` file.
/// A replaced image is deleted once the update has committed.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    request: Request,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(request, &state.upload_dir, &[PROFILE_IMAGE_FIELD], 1).await?;

    let result = async {
        let req: UpdateProfileRequest = form.parse()?;
        let changes = ProfileChanges {
            username: req.username,
            email: req.email,
            password: req.password,
            profile_image: form.first_url(PROFILE_IMAGE_FIELD),
        };
        let user = state.social.update_profile(claims.sub, changes).await?;
        Ok::<_, ApiError>(user)
    }
    .await;

    match result {
        Ok(updated) => {
            if let Some(old) = &updated.replaced_image {
                remove_stored(&state.upload_dir, old).await;
            }
            Ok(Json(UpdateProfileResponse {
                message: "Profile updated successfully".to_string(),
                user: updated.user,
            }))
        }
        Err(e) => {
            form.discard(&state.upload_dir).await;
            Err(e)
        }
    }
}
