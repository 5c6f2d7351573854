use std::collections::{HashMap, HashSet};

use sqlx::PgConnection;
use time::{Date, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    dto::{
        MealCreate, MealProductInput, MealProductRead, MealRead, MealUpdate, MealWithProducts,
    },
    repo_types::{Meal, MealProductRow},
};
use crate::{
    cache::{keys, Mutation},
    dates::{parse_date, today},
    error::{AppError, AppResult},
    nutrition::aggregate,
    products::repo_types::Product,
    state::AppState,
};

pub const HISTORY_DAYS: i64 = 7;

fn meal_not_found() -> AppError {
    AppError::not_found("Meal not found")
}

fn meal_changed(meal: &Meal) -> Mutation {
    Mutation::MealChanged {
        user_id: meal.user_id,
        meal_id: meal.id,
        date: meal.recorded_at,
    }
}

pub fn validate_meal_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Meal name must not be empty"));
    }
    Ok(name.to_string())
}

pub fn validate_portion(product_weight: f64) -> AppResult<()> {
    if !product_weight.is_finite() || product_weight < 0.0 {
        return Err(AppError::validation(
            "product_weight must be a finite, non-negative number",
        ));
    }
    Ok(())
}

fn validate_inputs(inputs: &[MealProductInput]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for input in inputs {
        validate_portion(input.product_weight)?;
        if !seen.insert(input.product_id) {
            return Err(AppError::conflict(format!(
                "Product {} is listed twice",
                input.product_id
            )));
        }
    }
    Ok(())
}

/// Builds the read view of a meal from its stored row and links.
pub fn assemble(meal: Meal, rows: &[MealProductRow]) -> MealWithProducts {
    let (_, breakdown) = aggregate(rows.iter().map(MealProductRow::portion));
    let products = rows
        .iter()
        .zip(breakdown.iter())
        .map(|(row, scaled)| MealProductRead::new(row, scaled))
        .collect();
    MealWithProducts {
        meal: meal.into(),
        products,
    }
}

/// Re-derives and stores the meal's totals from its current links.
/// The caller must hold the meal row lock.
pub(crate) async fn recalculate(conn: &mut PgConnection, meal_id: Uuid) -> AppResult<MealWithProducts> {
    let rows = MealProductRow::for_meal(&mut *conn, meal_id).await?;
    let (totals, _) = aggregate(rows.iter().map(MealProductRow::portion));
    let meal = Meal::store_totals(conn, meal_id, &totals).await?;
    debug!(%meal_id, calories = totals.calories, links = rows.len(), "meal totals recalculated");
    Ok(assemble(meal, &rows))
}

/// Re-aggregates meals already locked by the caller, typically through
/// `Meal::lock_linking_product`.
pub(crate) async fn recalculate_locked(conn: &mut PgConnection, meals: &[Meal]) -> AppResult<()> {
    for meal in meals {
        recalculate(&mut *conn, meal.id).await?;
    }
    Ok(())
}

pub fn meal_changes(meals: &[Meal]) -> Vec<Mutation> {
    meals.iter().map(meal_changed).collect()
}

async fn ensure_visible(conn: &mut PgConnection, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
    if Product::find_visible(&mut *conn, user_id, product_id).await?.is_none() {
        warn!(%user_id, %product_id, "product not visible to user");
        return Err(AppError::not_found(format!("Product {product_id} not found")));
    }
    Ok(())
}

async fn link_product(
    conn: &mut PgConnection,
    user_id: Uuid,
    meal_id: Uuid,
    input: &MealProductInput,
) -> AppResult<()> {
    ensure_visible(conn, user_id, input.product_id).await?;
    MealProductRow::link(conn, meal_id, input.product_id, input.product_weight)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::conflict("Product is already in the meal"),
            other => other,
        })
}

pub async fn create_meal(state: &AppState, user_id: Uuid, body: MealCreate) -> AppResult<MealWithProducts> {
    let name = validate_meal_name(&body.name)?;
    validate_inputs(&body.products)?;
    let date = body.recorded_at.unwrap_or_else(today);

    let mut tx = state.db.begin().await?;
    let meal = Meal::insert(&mut *tx, user_id, &name, date).await?;
    for input in &body.products {
        link_product(&mut *tx, user_id, meal.id, input).await?;
    }
    let view = recalculate(&mut *tx, meal.id).await?;
    tx.commit().await?;

    state.cache.invalidate(&meal_changed(&meal)).await;
    info!(%user_id, meal_id = %meal.id, products = body.products.len(), "meal created");
    Ok(view)
}

pub async fn get_meal(state: &AppState, user_id: Uuid, meal_id: Uuid) -> AppResult<MealWithProducts> {
    state
        .cache
        .get_or_load(&keys::user_meal(user_id, meal_id), || async move {
            let meal = Meal::find_owned(&state.db, user_id, meal_id)
                .await?
                .ok_or_else(meal_not_found)?;
            let rows = MealProductRow::for_meal(&state.db, meal_id).await?;
            Ok(assemble(meal, &rows))
        })
        .await
}

pub async fn list_meals(state: &AppState, user_id: Uuid) -> AppResult<Vec<MealRead>> {
    state
        .cache
        .get_or_load(&keys::user_meals(user_id), || async move {
            let meals = Meal::list(&state.db, user_id).await?;
            Ok(meals.into_iter().map(MealRead::from).collect())
        })
        .await
}

pub async fn meals_on(state: &AppState, user_id: Uuid, date: &str) -> AppResult<Vec<MealRead>> {
    let date = parse_date(date)?;
    state
        .cache
        .get_or_load(&keys::user_meals_on(user_id, date), || async move {
            let meals = Meal::list_on(&state.db, user_id, date).await?;
            Ok(meals.into_iter().map(MealRead::from).collect())
        })
        .await
}

pub async fn meals_with_products_on(
    state: &AppState,
    user_id: Uuid,
    date: &str,
) -> AppResult<Vec<MealWithProducts>> {
    let date = parse_date(date)?;
    state
        .cache
        .get_or_load(&keys::user_meals_products_on(user_id, date), || async move {
            let meals = Meal::list_on(&state.db, user_id, date).await?;
            with_products(state, meals).await
        })
        .await
}

/// Meals of the last seven days, newest first.
pub async fn history(state: &AppState, user_id: Uuid) -> AppResult<Vec<MealRead>> {
    let since: Date = today() - Duration::days(HISTORY_DAYS);
    state
        .cache
        .get_or_load(&keys::user_meals_history(user_id), || async move {
            let meals = Meal::list_since(&state.db, user_id, since).await?;
            Ok(meals.into_iter().map(MealRead::from).collect())
        })
        .await
}

async fn with_products(state: &AppState, meals: Vec<Meal>) -> AppResult<Vec<MealWithProducts>> {
    let ids: Vec<Uuid> = meals.iter().map(|m| m.id).collect();
    let mut by_meal: HashMap<Uuid, Vec<MealProductRow>> = HashMap::new();
    for row in MealProductRow::for_meals(&state.db, &ids).await? {
        by_meal.entry(row.meal_id).or_default().push(row);
    }
    Ok(meals
        .into_iter()
        .map(|meal| {
            let rows = by_meal.remove(&meal.id).unwrap_or_default();
            assemble(meal, &rows)
        })
        .collect())
}

pub async fn meal_products(state: &AppState, user_id: Uuid, meal_id: Uuid) -> AppResult<Vec<MealProductRead>> {
    state
        .cache
        .get_or_load(&keys::meal_products(user_id, meal_id), || async move {
            let meal = Meal::find_owned(&state.db, user_id, meal_id)
                .await?
                .ok_or_else(meal_not_found)?;
            let rows = MealProductRow::for_meal(&state.db, meal.id).await?;
            Ok(assemble(meal, &rows).products)
        })
        .await
}

pub async fn update_meal(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    body: MealUpdate,
) -> AppResult<MealWithProducts> {
    let name = body.name.as_deref().map(validate_meal_name).transpose()?;
    if let Some(products) = &body.products {
        validate_inputs(products)?;
    }

    let mut tx = state.db.begin().await?;
    let meal = Meal::lock_owned(&mut *tx, user_id, meal_id)
        .await?
        .ok_or_else(meal_not_found)?;

    if let Some(name) = &name {
        Meal::rename(&mut *tx, meal_id, name).await?;
    }

    if let Some(products) = &body.products {
        let current: HashSet<Uuid> = MealProductRow::for_meal(&mut *tx, meal_id)
            .await?
            .into_iter()
            .map(|r| r.product_id)
            .collect();
        let wanted: HashSet<Uuid> = products.iter().map(|p| p.product_id).collect();

        for removed in current.difference(&wanted) {
            MealProductRow::unlink(&mut *tx, meal_id, *removed).await?;
        }
        for input in products {
            if current.contains(&input.product_id) {
                MealProductRow::set_weight(&mut *tx, meal_id, input.product_id, input.product_weight)
                    .await?;
            } else {
                link_product(&mut *tx, user_id, meal_id, input).await?;
            }
        }
    }

    let view = recalculate(&mut *tx, meal_id).await?;
    tx.commit().await?;

    state.cache.invalidate(&meal_changed(&meal)).await;
    info!(%user_id, %meal_id, "meal updated");
    Ok(view)
}

pub async fn delete_meal(state: &AppState, user_id: Uuid, meal_id: Uuid) -> AppResult<MealRead> {
    let mut tx = state.db.begin().await?;
    let meal = Meal::lock_owned(&mut *tx, user_id, meal_id)
        .await?
        .ok_or_else(meal_not_found)?;
    Meal::delete(&mut *tx, meal_id).await?;
    tx.commit().await?;

    state.cache.invalidate(&meal_changed(&meal)).await;
    info!(%user_id, %meal_id, "meal deleted");
    Ok(meal.into())
}

pub async fn add_product(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    input: MealProductInput,
) -> AppResult<MealWithProducts> {
    validate_portion(input.product_weight)?;

    let mut tx = state.db.begin().await?;
    let meal = Meal::lock_owned(&mut *tx, user_id, meal_id)
        .await?
        .ok_or_else(meal_not_found)?;
    link_product(&mut *tx, user_id, meal_id, &input).await?;
    let view = recalculate(&mut *tx, meal_id).await?;
    tx.commit().await?;

    state.cache.invalidate(&meal_changed(&meal)).await;
    info!(%user_id, %meal_id, product_id = %input.product_id, "product added to meal");
    Ok(view)
}

pub async fn change_product_weight(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    product_id: Uuid,
    product_weight: f64,
) -> AppResult<MealWithProducts> {
    validate_portion(product_weight)?;

    let mut tx = state.db.begin().await?;
    let meal = Meal::lock_owned(&mut *tx, user_id, meal_id)
        .await?
        .ok_or_else(meal_not_found)?;
    if !MealProductRow::set_weight(&mut *tx, meal_id, product_id, product_weight).await? {
        return Err(AppError::not_found("Product is not in the meal"));
    }
    let view = recalculate(&mut *tx, meal_id).await?;
    tx.commit().await?;

    state.cache.invalidate(&meal_changed(&meal)).await;
    info!(%user_id, %meal_id, %product_id, product_weight, "meal product weight changed");
    Ok(view)
}

pub async fn remove_product(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    product_id: Uuid,
) -> AppResult<MealWithProducts> {
    let mut tx = state.db.begin().await?;
    let meal = Meal::lock_owned(&mut *tx, user_id, meal_id)
        .await?
        .ok_or_else(meal_not_found)?;
    if !MealProductRow::unlink(&mut *tx, meal_id, product_id).await? {
        return Err(AppError::not_found("Product is not in the meal"));
    }
    let view = recalculate(&mut *tx, meal_id).await?;
    tx.commit().await?;

    state.cache.invalidate(&meal_changed(&meal)).await;
    info!(%user_id, %meal_id, %product_id, "product removed from meal");
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn meal() -> Meal {
        Meal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Lunch".into(),
            recorded_at: date!(2024 - 04 - 02),
            weight: 350.0,
            calories: 408.0,
            proteins: 62.45,
            fats: 7.5,
            carbohydrates: 21.0,
        }
    }

    fn row(meal_id: Uuid, name: &str, w: f64, c: f64, p: f64, f: f64, carbs: f64) -> MealProductRow {
        MealProductRow {
            meal_id,
            product_id: Uuid::new_v4(),
            product_weight: w,
            name: name.into(),
            calories: c,
            proteins: p,
            fats: f,
            carbohydrates: carbs,
        }
    }

    #[test]
    fn assemble_scales_each_link() {
        let m = meal();
        let rows = vec![
            row(m.id, "Apple", 150.0, 52.0, 0.3, 0.2, 14.0),
            row(m.id, "Chicken breast", 200.0, 165.0, 31.0, 3.6, 0.0),
        ];
        let view = assemble(m, &rows);
        assert_eq!(view.products.len(), 2);
        assert_eq!(view.products[0].name, "Apple");
        assert_eq!(view.products[0].calories, 78.0);
        assert_eq!(view.products[1].proteins, 62.0);
        assert_eq!(view.products[1].product_weight, 200.0);
    }

    #[test]
    fn portion_must_be_finite_and_non_negative() {
        assert!(validate_portion(0.0).is_ok());
        assert!(validate_portion(125.5).is_ok());
        for bad in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(validate_portion(bad), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn duplicate_products_in_one_request_conflict() {
        let id = Uuid::new_v4();
        let inputs = vec![
            MealProductInput { product_id: id, product_weight: 10.0 },
            MealProductInput { product_id: id, product_weight: 20.0 },
        ];
        assert!(matches!(validate_inputs(&inputs), Err(AppError::Conflict(_))));
    }

    #[test]
    fn blank_meal_name_is_rejected() {
        assert!(validate_meal_name("   ").is_err());
        assert_eq!(validate_meal_name(" Dinner ").unwrap(), "Dinner");
    }

    #[tokio::test]
    async fn cached_meal_is_served_without_database() {
        let state = AppState::fake();
        let m = meal();
        let view = assemble(m.clone(), &[]);
        state.cache.set(&keys::user_meal(m.user_id, m.id), &view).await;
        assert_eq!(get_meal(&state, m.user_id, m.id).await.unwrap(), view);
    }

    #[tokio::test]
    async fn invalid_input_fails_before_any_transaction() {
        let state = AppState::fake();
        let err = create_meal(
            &state,
            Uuid::new_v4(),
            MealCreate {
                name: "".into(),
                recorded_at: None,
                products: vec![],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = meals_on(&state, Uuid::new_v4(), "02/04/2024").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
