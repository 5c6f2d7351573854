use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{WeightRead, WeightUpdate},
    services,
};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn weight_routes() -> Router<AppState> {
    Router::new()
        .route("/weights/me", put(save_weight))
        .route("/weights/me/history", get(weight_history))
        .route("/weights/me/:date", get(weight_on_date))
}

#[instrument(skip(state, payload))]
pub async fn save_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<WeightUpdate>,
) -> AppResult<Json<WeightRead>> {
    Ok(Json(services::save_today(&state, user_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn weight_on_date(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> AppResult<Json<Option<WeightRead>>> {
    Ok(Json(services::weight_on(&state, user_id, &date).await?))
}

#[instrument(skip(state))]
pub async fn weight_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<WeightRead>>> {
    Ok(Json(services::history(&state, user_id).await?))
}
