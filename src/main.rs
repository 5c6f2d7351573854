use std::sync::Arc;

mod app;
mod auth;
mod cache;
mod cleanup;
mod config;
mod dates;
mod error;
mod meals;
mod notify;
mod nutrition;
mod pictures;
mod products;
mod state;
mod users;
mod weights;

use crate::notify::{LogMailer, Mailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "food_diary=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    if let Some(path) = &app_state.config.seed_products_path {
        if let Err(e) = products::seed::load_seed_products(&app_state.db, path).await {
            tracing::warn!(error = %e, %path, "seeding products failed; continuing");
        }
    }

    tokio::spawn(cleanup::run_cleanup_loop(
        app_state.db.clone(),
        app_state.config.cleanup.clone(),
    ));
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    tokio::spawn(notify::consumer::run_welcome_consumer(
        app_state.config.redis_url.clone(),
        mailer,
    ));

    app::serve(app::build_app(app_state)).await
}
