use serde::{Deserialize, Serialize};

use super::scaler::{scale, NutrientProfile, ScaledNutrients};

/// One product inside a meal: its per-100 profile and the portion weight.
#[derive(Debug, Clone, Copy)]
pub struct PortionInput {
    pub profile: NutrientProfile,
    pub product_weight: f64,
}

/// Derived totals stored on a meal row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MealTotals {
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

impl MealTotals {
    fn add(&mut self, s: &ScaledNutrients) {
        self.weight += s.weight;
        self.calories += s.calories;
        self.proteins += s.proteins;
        self.fats += s.fats;
        self.carbohydrates += s.carbohydrates;
    }
}

/// Scales every portion and sums the results.
///
/// Returns the totals together with the per-portion breakdown, in input order.
pub fn aggregate<I>(portions: I) -> (MealTotals, Vec<ScaledNutrients>)
where
    I: IntoIterator<Item = PortionInput>,
{
    let mut totals = MealTotals::default();
    let breakdown: Vec<ScaledNutrients> = portions
        .into_iter()
        .map(|p| {
            let scaled = scale(&p.profile, p.product_weight);
            totals.add(&scaled);
            scaled
        })
        .collect();
    (totals, breakdown)
}
