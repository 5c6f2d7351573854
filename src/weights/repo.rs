use sqlx::{PgConnection, PgPool};
use time::Date;
use uuid::Uuid;

use super::repo_types::UserWeight;

impl UserWeight {
    /// One record per user per day; a second write on the same day replaces the value.
    pub async fn upsert(
        conn: &mut PgConnection,
        user_id: Uuid,
        weight: f64,
        recorded_at: Date,
    ) -> sqlx::Result<UserWeight> {
        sqlx::query_as::<_, UserWeight>(
            r#"
            INSERT INTO user_weights (user_id, weight, recorded_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, recorded_at) DO UPDATE SET weight = EXCLUDED.weight
            RETURNING id, user_id, weight, recorded_at
            "#,
        )
        .bind(user_id)
        .bind(weight)
        .bind(recorded_at)
        .fetch_one(conn)
        .await
    }

    pub async fn find_on(db: &PgPool, user_id: Uuid, date: Date) -> sqlx::Result<Option<UserWeight>> {
        sqlx::query_as::<_, UserWeight>(
            r#"
            SELECT id, user_id, weight, recorded_at
            FROM user_weights
            WHERE user_id = $1 AND recorded_at = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(db)
        .await
    }

    pub async fn history_since(db: &PgPool, user_id: Uuid, since: Date) -> sqlx::Result<Vec<UserWeight>> {
        sqlx::query_as::<_, UserWeight>(
            r#"
            SELECT id, user_id, weight, recorded_at
            FROM user_weights
            WHERE user_id = $1 AND recorded_at >= $2
            ORDER BY recorded_at
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(db)
        .await
    }

    pub async fn delete_older_than(db: &PgPool, cutoff: Date) -> sqlx::Result<u64> {
        let res = sqlx::query("DELETE FROM user_weights WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }
}
