use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::UserWeight;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRead {
    pub id: Uuid,
    pub weight: f64,
    #[serde(with = "crate::dates::iso_date")]
    pub recorded_at: Date,
}

impl From<UserWeight> for WeightRead {
    fn from(w: UserWeight) -> Self {
        Self {
            id: w.id,
            weight: w.weight,
            recorded_at: w.recorded_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeightUpdate {
    pub weight: f64,
}
