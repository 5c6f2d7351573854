use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{UserRead, UserUpdate},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    nutrition::{calculate, ProfileAttributes, Recommendation},
    pictures::{image_response, read_file_field, MAX_PICTURE_BYTES},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).put(update_me).delete(delete_me))
        .route("/users/me/nutrients", get(my_nutrients))
        .route("/users/find/:login_or_email", get(find_user))
        .route("/nutrients/calculate", post(calculate_nutrients))
}

pub fn picture_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me/picture", post(upload_picture).get(get_picture))
        .layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES + 64 * 1024))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UserRead>> {
    Ok(Json(services::get_user(&state, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<UserRead>> {
    Ok(Json(services::update_user(&state, user_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    services::delete_user(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn find_user(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(login_or_email): Path<String>,
) -> AppResult<Json<UserRead>> {
    Ok(Json(services::find_user(&state, &login_or_email).await?))
}

#[instrument(skip(state))]
pub async fn my_nutrients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Recommendation>> {
    Ok(Json(services::nutrients(&state, user_id).await?))
}

/// Stateless calculator over the posted attributes.
#[instrument(skip(payload))]
pub async fn calculate_nutrients(
    AuthUser(_): AuthUser,
    Json(payload): Json<ProfileAttributes>,
) -> AppResult<Json<Recommendation>> {
    Ok(Json(calculate(&payload)?))
}

#[instrument(skip(state, mp))]
pub async fn upload_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> AppResult<StatusCode> {
    let (content_type, data) = read_file_field(mp).await?;
    services::set_picture(&state, user_id, content_type, data).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Response> {
    let pic = services::picture(&state, user_id).await?;
    Ok(image_response(&pic.content_type, pic.data))
}
