use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        AuthResponse, LoginRequest, LogoutResponse, OAuthCallback, RefreshRequest,
        RegisterRequest, TokenValidation,
    },
    extractors::{AccessClaims, AuthUser},
    services,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/validate-token", post(validate_token))
}

pub fn google_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::register(&state, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::login(&state, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip(state, claims))]
pub async fn logout(
    State(state): State<AppState>,
    AccessClaims(claims): AccessClaims,
) -> Json<LogoutResponse> {
    services::logout(&state, &claims).await;
    Json(LogoutResponse {
        message: "Successfully logged out",
    })
}

#[instrument(skip(state))]
pub async fn validate_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<TokenValidation>> {
    Ok(Json(services::validate_token(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn google_start(State(state): State<AppState>) -> AppResult<Redirect> {
    let url = services::begin_google_login(&state).await?;
    info!("redirecting to google authorization");
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, params))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallback>,
) -> AppResult<Json<AuthResponse>> {
    if let Some(err) = params.error {
        warn!(error = %err, "google authorization denied");
        return Err(AppError::unauthorized("Google authorization was denied"));
    }
    services::consume_oauth_state(&state, params.state.as_deref()).await?;
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::validation("Authorization code not found"))?;

    let access_token = state.google.exchange_code(&code).await?;
    let info = state.google.user_info(&access_token).await?;
    Ok(Json(services::login_with_google(&state, info).await?))
}
