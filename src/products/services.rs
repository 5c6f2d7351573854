use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{ProductCreate, ProductRead, ProductUpdate},
    repo_types::{Product, ProductFields, ProductImage},
};
use crate::{
    cache::{keys, Mutation},
    error::{AppError, AppResult},
    meals::{
        repo_types::Meal,
        services::{meal_changes, recalculate_locked},
    },
    pictures::{validate_upload, PRODUCT_PICTURE_TYPES},
    state::AppState,
};

fn product_not_found() -> AppError {
    AppError::not_found("Product not found")
}

fn duplicate_name(e: sqlx::Error, name: &str) -> AppError {
    match AppError::from(e) {
        AppError::Conflict(_) => AppError::conflict(format!("Product '{name}' already exists")),
        other => other,
    }
}

fn check_amount(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a finite, non-negative number"
        )));
    }
    Ok(())
}

pub fn validate_fields(mut f: ProductFields) -> AppResult<ProductFields> {
    f.name = f.name.trim().to_string();
    if f.name.is_empty() {
        return Err(AppError::validation("Product name must not be empty"));
    }
    if !f.weight.is_finite() || f.weight <= 0.0 {
        return Err(AppError::validation("weight must be a positive number"));
    }
    check_amount("calories", f.calories)?;
    check_amount("proteins", f.proteins)?;
    check_amount("fats", f.fats)?;
    check_amount("carbohydrates", f.carbohydrates)?;
    Ok(f)
}

impl From<ProductCreate> for ProductFields {
    fn from(c: ProductCreate) -> Self {
        Self {
            name: c.name,
            weight: c.weight,
            calories: c.calories,
            proteins: c.proteins,
            fats: c.fats,
            carbohydrates: c.carbohydrates,
            description: c.description,
        }
    }
}

fn merge(current: &Product, upd: ProductUpdate) -> ProductFields {
    ProductFields {
        name: upd.name.unwrap_or_else(|| current.name.clone()),
        weight: upd.weight.unwrap_or(current.weight),
        calories: upd.calories.unwrap_or(current.calories),
        proteins: upd.proteins.unwrap_or(current.proteins),
        fats: upd.fats.unwrap_or(current.fats),
        carbohydrates: upd.carbohydrates.unwrap_or(current.carbohydrates),
        description: upd.description.or_else(|| current.description.clone()),
    }
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Prefix ILIKE pattern with the wildcard characters of `query` escaped.
pub fn prefix_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 1);
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn read_all(products: Vec<Product>) -> Vec<ProductRead> {
    products.into_iter().map(ProductRead::from).collect()
}

pub async fn list_visible(state: &AppState, user_id: Uuid) -> AppResult<Vec<ProductRead>> {
    state
        .cache
        .get_or_load(&keys::products(user_id), || async move {
            Ok(read_all(Product::list_visible(&state.db, user_id).await?))
        })
        .await
}

pub async fn list_personal(state: &AppState, user_id: Uuid) -> AppResult<Vec<ProductRead>> {
    state
        .cache
        .get_or_load(&keys::personal_products(user_id), || async move {
            Ok(read_all(Product::list_personal(&state.db, user_id).await?))
        })
        .await
}

pub async fn get_by_id(state: &AppState, user_id: Uuid, product_id: Uuid) -> AppResult<ProductRead> {
    state
        .cache
        .get_or_load(&keys::product(user_id, product_id), || async move {
            Product::find_visible(&state.db, user_id, product_id)
                .await?
                .map(ProductRead::from)
                .ok_or_else(product_not_found)
        })
        .await
}

pub async fn get_personal(state: &AppState, user_id: Uuid, product_id: Uuid) -> AppResult<ProductRead> {
    state
        .cache
        .get_or_load(&keys::personal_product(user_id, product_id), || async move {
            Product::find_personal(&state.db, user_id, product_id)
                .await?
                .map(ProductRead::from)
                .ok_or_else(product_not_found)
        })
        .await
}

pub async fn get_by_name(state: &AppState, user_id: Uuid, name: &str) -> AppResult<ProductRead> {
    let name = name.trim();
    state
        .cache
        .get_or_load(&keys::product_exact(user_id, name), || async move {
            Product::find_visible_by_name(&state.db, user_id, name)
                .await?
                .map(ProductRead::from)
                .ok_or_else(|| AppError::not_found(format!("Product '{name}' not found")))
        })
        .await
}

/// Case-insensitive prefix search over visible products. An empty query
/// returns the whole visible list.
pub async fn search(state: &AppState, user_id: Uuid, query: &str) -> AppResult<Vec<ProductRead>> {
    let query = capitalize(query.trim());
    if query.is_empty() {
        return list_visible(state, user_id).await;
    }
    let pattern = prefix_pattern(&query);
    state
        .cache
        .get_or_load(&keys::product_search(user_id, &query), || async move {
            Ok(read_all(Product::search(&state.db, user_id, &pattern).await?))
        })
        .await
}

pub async fn create(state: &AppState, user_id: Uuid, body: ProductCreate) -> AppResult<ProductRead> {
    let fields = validate_fields(body.into())?;
    let product = Product::create_personal(&state.db, user_id, &fields)
        .await
        .map_err(|e| duplicate_name(e, &fields.name))?;

    state
        .cache
        .invalidate(&Mutation::ProductCreated {
            user_id,
            name: product.name.clone(),
        })
        .await;
    info!(%user_id, product_id = %product.id, name = %product.name, "product created");
    Ok(product.into())
}

/// The product's own invalidation plus one `MealChanged` per re-aggregated meal.
fn product_write_mutations(product: Mutation, meals: &[Meal]) -> Vec<Mutation> {
    let mut mutations = meal_changes(meals);
    mutations.push(product);
    mutations
}

/// Updates one of the caller's private products and re-derives the totals
/// of every meal that uses it, in one transaction.
pub async fn update(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    upd: ProductUpdate,
) -> AppResult<ProductRead> {
    let mut tx = state.db.begin().await?;
    let current = Product::lock_personal(&mut *tx, user_id, product_id)
        .await?
        .ok_or_else(product_not_found)?;
    let fields = validate_fields(merge(&current, upd))?;

    let updated = Product::update(&mut *tx, product_id, &fields)
        .await
        .map_err(|e| duplicate_name(e, &fields.name))?;
    let meals = Meal::lock_linking_product(&mut *tx, product_id).await?;
    recalculate_locked(&mut *tx, &meals).await?;
    tx.commit().await?;

    let product = Mutation::ProductUpdated {
        user_id,
        product_id,
        old_name: current.name,
        new_name: updated.name.clone(),
    };
    state
        .cache
        .invalidate_all(&product_write_mutations(product, &meals))
        .await;
    info!(%user_id, %product_id, meals = meals.len(), "product updated");
    Ok(updated.into())
}

pub async fn delete(state: &AppState, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
    let mut tx = state.db.begin().await?;
    let current = Product::lock_personal(&mut *tx, user_id, product_id)
        .await?
        .ok_or_else(product_not_found)?;
    // Lock the meals before the cascade removes the links that find them.
    let meals = Meal::lock_linking_product(&mut *tx, product_id).await?;
    Product::delete(&mut *tx, product_id).await?;
    recalculate_locked(&mut *tx, &meals).await?;
    tx.commit().await?;

    let product = Mutation::ProductDeleted {
        user_id,
        product_id,
        name: current.name,
    };
    state
        .cache
        .invalidate_all(&product_write_mutations(product, &meals))
        .await;
    info!(%user_id, %product_id, meals = meals.len(), "product deleted");
    Ok(())
}

pub async fn set_picture(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    content_type: Option<String>,
    data: bytes::Bytes,
) -> AppResult<()> {
    let upload = validate_upload(content_type, data, PRODUCT_PICTURE_TYPES)?;
    if !Product::set_image(&state.db, user_id, product_id, &upload.data, &upload.content_type).await? {
        warn!(%user_id, %product_id, "picture upload for a product the user does not own");
        return Err(product_not_found());
    }
    state
        .cache
        .invalidate(&Mutation::ProductPictureChanged {
            user_id,
            product_id,
        })
        .await;
    info!(%user_id, %product_id, bytes = upload.data.len(), "product picture stored");
    Ok(())
}

pub async fn picture(state: &AppState, user_id: Uuid, product_id: Uuid) -> AppResult<ProductImage> {
    Product::image(&state.db, user_id, product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product picture not found"))
}
