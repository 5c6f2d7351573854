use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

use crate::nutrition::{NutrientProfile, PortionInput};

#[derive(Debug, Clone, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub recorded_at: Date,
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

/// A meal-product link joined with the product's per-100 profile.
#[derive(Debug, Clone, FromRow)]
pub struct MealProductRow {
    pub meal_id: Uuid,
    pub product_id: Uuid,
    pub product_weight: f64,
    pub name: String,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

impl MealProductRow {
    pub fn portion(&self) -> PortionInput {
        PortionInput {
            profile: NutrientProfile {
                calories: self.calories,
                proteins: self.proteins,
                fats: self.fats,
                carbohydrates: self.carbohydrates,
            },
            product_weight: self.product_weight,
        }
    }
}
