use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct UserWeight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weight: f64,
    pub recorded_at: Date,
}
