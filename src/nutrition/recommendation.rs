use serde::{Deserialize, Serialize};

use super::scaler::round2;
use crate::{
    error::{AppError, AppResult},
    weights::services::validate_body_weight,
};

/// Profile attributes the recommendation is derived from. All are optional on
/// the way in; the calculator rejects incomplete input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileAttributes {
    pub age: Option<i32>,
    pub height: Option<i32>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub aim: Option<String>,
    pub activity_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Loss,
    Maintain,
    Gain,
}

struct MacroRatios {
    protein: f64,
    fat: f64,
    carbohydrates: f64,
}

const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;
const KCAL_PER_GRAM_CARBOHYDRATES: f64 = 4.0;

impl Gender {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(AppError::validation(
                "Invalid gender. Allowed: 'male', 'female'",
            )),
        }
    }

    fn bmr_constant(self) -> f64 {
        match self {
            Gender::Male => 5.0,
            Gender::Female => -161.0,
        }
    }
}

impl ActivityLevel {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => Err(AppError::validation(
                "Invalid activity level. Allowed: 'sedentary', 'light', 'moderate', 'active', 'very_active'",
            )),
        }
    }

    fn factor(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

impl Goal {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "loss" => Ok(Goal::Loss),
            "maintain" => Ok(Goal::Maintain),
            "gain" => Ok(Goal::Gain),
            _ => Err(AppError::validation(
                "Invalid aim. Allowed: 'loss', 'maintain', 'gain'",
            )),
        }
    }

    fn factor(self) -> f64 {
        match self {
            Goal::Loss => 0.8,
            Goal::Maintain => 1.0,
            Goal::Gain => 1.2,
        }
    }

    fn ratios(self) -> MacroRatios {
        match self {
            Goal::Loss => MacroRatios {
                protein: 0.4,
                fat: 0.3,
                carbohydrates: 0.3,
            },
            Goal::Maintain => MacroRatios {
                protein: 0.3,
                fat: 0.3,
                carbohydrates: 0.4,
            },
            Goal::Gain => MacroRatios {
                protein: 0.25,
                fat: 0.25,
                carbohydrates: 0.5,
            },
        }
    }
}

impl ProfileAttributes {
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
            && self.height.is_some()
            && self.weight.is_some()
            && self.gender.is_some()
            && self.aim.is_some()
            && self.activity_level.is_some()
    }

    /// Rejects out-of-range values among the attributes that are present.
    pub fn check_ranges(&self) -> AppResult<()> {
        if let Some(age) = self.age {
            if !(1..=150).contains(&age) {
                return Err(AppError::validation("Age must be between 1 and 150"));
            }
        }
        if let Some(height) = self.height {
            if !(1..=300).contains(&height) {
                return Err(AppError::validation("Height must be between 1 and 300"));
            }
        }
        if let Some(weight) = self.weight {
            validate_body_weight(weight)?;
        }
        Ok(())
    }
}

/// Mifflin-St Jeor BMR, scaled by activity and goal, split into macros.
pub fn calculate(attrs: &ProfileAttributes) -> AppResult<Recommendation> {
    let (Some(age), Some(height), Some(weight), Some(gender), Some(aim), Some(activity)) = (
        attrs.age,
        attrs.height,
        attrs.weight,
        attrs.gender.as_deref(),
        attrs.aim.as_deref(),
        attrs.activity_level.as_deref(),
    ) else {
        return Err(AppError::validation(
            "Weight, height, age, gender, aim and activity level are required",
        ));
    };
    attrs.check_ranges()?;

    let gender = Gender::parse(gender)?;
    let activity = ActivityLevel::parse(activity)?;
    let goal = Goal::parse(aim)?;

    let bmr = 10.0 * weight + 6.25 * f64::from(height) - 5.0 * f64::from(age)
        + gender.bmr_constant();
    let tdee = bmr * activity.factor();
    let calories = round2(tdee * goal.factor());

    let ratios = goal.ratios();
    Ok(Recommendation {
        calories,
        protein: round2(calories * ratios.protein / KCAL_PER_GRAM_PROTEIN),
        fat: round2(calories * ratios.fat / KCAL_PER_GRAM_FAT),
        carbohydrates: round2(calories * ratios.carbohydrates / KCAL_PER_GRAM_CARBOHYDRATES),
    })
}
