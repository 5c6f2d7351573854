use serde::{Deserialize, Serialize};

/// Nutrients of a product per 100 weight units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

/// Nutrients of a concrete portion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaledNutrients {
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

/// Rounds to two decimals using the exact binary value of `x`.
///
/// Must not go through `x * 100.0`: 3066.6749999999997 * 100.0 is exactly
/// 306667.5 and would round up.
pub fn round2(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    format!("{:.2}", x).parse::<f64>().unwrap_or(x)
}

/// Scales a per-100 profile to `weight`.
pub fn scale(profile: &NutrientProfile, weight: f64) -> ScaledNutrients {
    let factor = weight / 100.0;
    ScaledNutrients {
        weight,
        calories: round2(profile.calories * factor),
        proteins: round2(profile.proteins * factor),
        fats: round2(profile.fats * factor),
        carbohydrates: round2(profile.carbohydrates * factor),
    }
}
