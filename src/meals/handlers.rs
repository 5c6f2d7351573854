use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        MealCreate, MealProductInput, MealProductRead, MealRead, MealUpdate, MealWithProducts,
        ProductWeightUpdate,
    },
    services,
};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/history", get(meal_history))
        .route("/meals/date/:date", get(meals_on_date))
        .route("/meals/date/:date/products", get(meals_with_products_on_date))
        .route("/meals/:id", get(get_meal).put(update_meal).delete(delete_meal))
        .route("/meals/:id/products", get(meal_products).post(add_product))
        .route(
            "/meals/:id/products/:product_id",
            put(change_product_weight).delete(remove_product),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<MealCreate>,
) -> AppResult<(StatusCode, Json<MealWithProducts>)> {
    let meal = services::create_meal(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(meal)))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<MealRead>>> {
    Ok(Json(services::list_meals(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn meal_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<MealRead>>> {
    Ok(Json(services::history(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn meals_on_date(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> AppResult<Json<Vec<MealRead>>> {
    Ok(Json(services::meals_on(&state, user_id, &date).await?))
}

#[instrument(skip(state))]
pub async fn meals_with_products_on_date(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> AppResult<Json<Vec<MealWithProducts>>> {
    Ok(Json(
        services::meals_with_products_on(&state, user_id, &date).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MealWithProducts>> {
    Ok(Json(services::get_meal(&state, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MealUpdate>,
) -> AppResult<Json<MealWithProducts>> {
    Ok(Json(services::update_meal(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MealRead>> {
    Ok(Json(services::delete_meal(&state, user_id, id).await?))
}

#[instrument(skip(state))]
pub async fn meal_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<MealProductRead>>> {
    Ok(Json(services::meal_products(&state, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MealProductInput>,
) -> AppResult<(StatusCode, Json<MealWithProducts>)> {
    let meal = services::add_product(&state, user_id, id, payload).await?;
    Ok((StatusCode::CREATED, Json(meal)))
}

#[instrument(skip(state, payload))]
pub async fn change_product_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ProductWeightUpdate>,
) -> AppResult<Json<MealWithProducts>> {
    Ok(Json(
        services::change_product_weight(&state, user_id, id, product_id, payload.product_weight)
            .await?,
    ))
}

#[instrument(skip(state))]
pub async fn remove_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<MealWithProducts>> {
    Ok(Json(
        services::remove_product(&state, user_id, id, product_id).await?,
    ))
}
