use time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{WeightRead, WeightUpdate},
    repo_types::UserWeight,
};
use crate::{
    cache::{keys, Mutation},
    dates::{parse_date, today},
    error::{AppError, AppResult},
    state::AppState,
};

pub const HISTORY_DAYS: i64 = 30;

pub fn validate_body_weight(weight: f64) -> AppResult<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(AppError::validation("Weight must be a positive number"));
    }
    Ok(())
}

/// Records today's weight, replacing an earlier record of the same day.
pub async fn save_today(state: &AppState, user_id: Uuid, body: WeightUpdate) -> AppResult<WeightRead> {
    validate_body_weight(body.weight)?;
    let date = today();

    let mut conn = state.db.acquire().await?;
    let saved = UserWeight::upsert(&mut *conn, user_id, body.weight, date).await?;
    drop(conn);

    state
        .cache
        .invalidate(&Mutation::WeightSaved { user_id, date })
        .await;
    info!(%user_id, weight = body.weight, "weight saved");
    Ok(saved.into())
}

pub async fn weight_on(state: &AppState, user_id: Uuid, date: &str) -> AppResult<Option<WeightRead>> {
    let date = parse_date(date)?;
    state
        .cache
        .get_or_load(&keys::user_weight(user_id, date), || async move {
            let row = UserWeight::find_on(&state.db, user_id, date).await?;
            Ok(row.map(WeightRead::from))
        })
        .await
}

pub async fn history(state: &AppState, user_id: Uuid) -> AppResult<Vec<WeightRead>> {
    let since = today() - Duration::days(HISTORY_DAYS);
    state
        .cache
        .get_or_load(&keys::user_weights(user_id), || async move {
            let rows = UserWeight::history_since(&state.db, user_id, since).await?;
            Ok(rows.into_iter().map(WeightRead::from).collect())
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn body_weight_must_be_positive_and_finite() {
        assert!(validate_body_weight(71.2).is_ok());
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(validate_body_weight(bad), Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn cached_history_is_served_without_database() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let cached = vec![WeightRead {
            id: Uuid::new_v4(),
            weight: 70.0,
            recorded_at: date!(2024 - 05 - 01),
        }];
        state.cache.set(&keys::user_weights(user_id), &cached).await;

        let got = history(&state, user_id).await.unwrap();
        assert_eq!(got, cached);
    }

    #[tokio::test]
    async fn bad_date_is_rejected_before_any_lookup() {
        let state = AppState::fake();
        let err = weight_on(&state, Uuid::new_v4(), "yesterday").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn invalid_weight_is_rejected_before_any_write() {
        let state = AppState::fake();
        let err = save_today(&state, Uuid::new_v4(), WeightUpdate { weight: -1.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
