//! Pure nutrient arithmetic: portion scaling, meal aggregation and daily
//! intake recommendations. Nothing here touches the database or the cache.

pub mod aggregator;
pub mod recommendation;
pub mod scaler;

pub use aggregator::{aggregate, MealTotals, PortionInput};
pub use recommendation::{calculate, ProfileAttributes, Recommendation};
pub use scaler::{round2, scale, NutrientProfile, ScaledNutrients};
