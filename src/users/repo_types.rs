use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

use crate::nutrition::ProfileAttributes;

/// Row of `users` without the picture bytes.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub password_hash: Option<String>, // None for federated accounts
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
    pub registered_at: Date,
}

impl User {
    pub fn profile_attributes(&self) -> ProfileAttributes {
        ProfileAttributes {
            age: self.age,
            height: self.height,
            weight: self.weight,
            gender: self.gender.clone(),
            aim: self.aim.clone(),
            activity_level: self.activity_level.clone(),
        }
    }
}

/// Full set of writable profile columns after merging an update.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub login: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub age: Option<i32>,
    pub height: Option<i32>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub aim: Option<String>,
    pub activity_level: Option<String>,
    pub recommended_calories: Option<f64>,
}

#[derive(Debug, FromRow)]
pub struct Picture {
    pub data: Vec<u8>,
    pub content_type: String,
}
