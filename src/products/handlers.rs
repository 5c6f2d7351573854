use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ProductCreate, ProductRead, ProductUpdate, SearchQuery},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    pictures::{image_response, read_file_field, MAX_PICTURE_BYTES},
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/mine", get(my_products))
        .route("/products/mine/:id", get(my_product))
        .route("/products/search", get(search_products))
        .route("/products/by-name/:name", get(product_by_name))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub fn picture_routes() -> Router<AppState> {
    Router::new()
        .route("/products/:id/picture", post(upload_picture).get(get_picture))
        .layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES + 64 * 1024))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<ProductRead>>> {
    Ok(Json(services::list_visible(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn my_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<ProductRead>>> {
    Ok(Json(services::list_personal(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn my_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductRead>> {
    Ok(Json(services::get_personal(&state, user_id, id).await?))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<ProductRead>>> {
    Ok(Json(services::search(&state, user_id, &q.query).await?))
}

#[instrument(skip(state))]
pub async fn product_by_name(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(name): Path<String>,
) -> AppResult<Json<ProductRead>> {
    Ok(Json(services::get_by_name(&state, user_id, &name).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductRead>> {
    Ok(Json(services::get_by_id(&state, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProductCreate>,
) -> AppResult<(StatusCode, Json<ProductRead>)> {
    let product = services::create(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<ProductRead>> {
    Ok(Json(services::update(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, mp))]
pub async fn upload_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> AppResult<StatusCode> {
    let (content_type, data) = read_file_field(mp).await?;
    services::set_picture(&state, user_id, id, content_type, data).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let img = services::picture(&state, user_id, id).await?;
    Ok(image_response(&img.content_type, img.data))
}
