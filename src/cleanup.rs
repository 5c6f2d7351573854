use std::time::Duration;

use sqlx::PgPool;
use time::Date;
use tracing::{info, warn};

use crate::{
    config::CleanupConfig, dates::today, meals::repo_types::Meal, weights::repo_types::UserWeight,
};

/// Background task that prunes weight records and meals past retention.
/// Cached entries for pruned rows are left to expire by TTL.
pub async fn run_cleanup_loop(db: PgPool, config: CleanupConfig) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_seconds.max(1)));

    loop {
        interval.tick().await;

        match cleanup_expired(&db, &config, today()).await {
            Ok((weights, meals)) => {
                if weights + meals > 0 {
                    info!(weights, meals, "cleanup pruned old records");
                }
            }
            Err(e) => {
                warn!(error = %e, "cleanup failed");
            }
        }
    }
}

/// Returns `(weight_cutoff, meal_cutoff)`: rows dated strictly before these go.
pub fn cutoffs(config: &CleanupConfig, now: Date) -> (Date, Date) {
    (
        now - time::Duration::days(config.weight_retention_days),
        now - time::Duration::days(config.meal_retention_days),
    )
}

async fn cleanup_expired(db: &PgPool, config: &CleanupConfig, now: Date) -> anyhow::Result<(u64, u64)> {
    let (weight_cutoff, meal_cutoff) = cutoffs(config, now);
    let weights = UserWeight::delete_older_than(db, weight_cutoff).await?;
    let meals = Meal::delete_older_than(db, meal_cutoff).await?;
    Ok((weights, meals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn cutoffs_follow_retention() {
        let config = CleanupConfig {
            interval_seconds: 86400,
            weight_retention_days: 30,
            meal_retention_days: 7,
        };
        let (w, m) = cutoffs(&config, date!(2024 - 03 - 01));
        assert_eq!(w, date!(2024 - 01 - 31));
        assert_eq!(m, date!(2024 - 02 - 23));
    }
}
