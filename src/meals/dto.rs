use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{Meal, MealProductRow};
use crate::nutrition::ScaledNutrients;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRead {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "crate::dates::iso_date")]
    pub recorded_at: Date,
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

impl From<Meal> for MealRead {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            name: m.name,
            recorded_at: m.recorded_at,
            weight: m.weight,
            calories: m.calories,
            proteins: m.proteins,
            fats: m.fats,
            carbohydrates: m.carbohydrates,
        }
    }
}

/// A product inside a meal with nutrients scaled to the portion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealProductRead {
    pub product_id: Uuid,
    pub name: String,
    pub product_weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

impl MealProductRead {
    pub fn new(row: &MealProductRow, scaled: &ScaledNutrients) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name.clone(),
            product_weight: scaled.weight,
            calories: scaled.calories,
            proteins: scaled.proteins,
            fats: scaled.fats,
            carbohydrates: scaled.carbohydrates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealWithProducts {
    #[serde(flatten)]
    pub meal: MealRead,
    pub products: Vec<MealProductRead>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MealProductInput {
    pub product_id: Uuid,
    pub product_weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct MealCreate {
    pub name: String,
    #[serde(default, with = "crate::dates::iso_date::option")]
    pub recorded_at: Option<Date>,
    #[serde(default)]
    pub products: Vec<MealProductInput>,
}

/// `products`, when present, is the complete new set of links.
#[derive(Debug, Default, Deserialize)]
pub struct MealUpdate {
    pub name: Option<String>,
    pub products: Option<Vec<MealProductInput>>,
}

#[derive(Debug, Deserialize)]
pub struct ProductWeightUpdate {
    pub product_weight: f64,
}
