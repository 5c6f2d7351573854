use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::User;

/// Public view of a user. Cached under `user:{id}` and `user_lookup:{..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRead {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub age: Option<i32>,
    pub height: Option<i32>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub aim: Option<String>,
    pub activity_level: Option<String>,
    pub recommended_calories: Option<f64>,
    pub has_profile_picture: bool,
    #[serde(with = "crate::dates::iso_date")]
    pub registered_at: Date,
}

impl From<User> for UserRead {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            login: u.login,
            email: u.email,
            firstname: u.firstname,
            lastname: u.lastname,
            age: u.age,
            height: u.height,
            weight: u.weight,
            gender: u.gender,
            aim: u.aim,
            activity_level: u.activity_level,
            recommended_calories: u.recommended_calories,
            has_profile_picture: u.has_profile_picture,
            registered_at: u.registered_at,
        }
    }
}

/// Partial profile update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub login: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub age: Option<i32>,
    pub height: Option<i32>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub aim: Option<String>,
    pub activity_level: Option<String>,
}
