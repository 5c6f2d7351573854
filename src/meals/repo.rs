use sqlx::{PgConnection, PgExecutor, PgPool};
use time::Date;
use uuid::Uuid;

use super::repo_types::{Meal, MealProductRow};
use crate::nutrition::MealTotals;

const MEAL_COLUMNS: &str =
    "id, user_id, name, recorded_at, weight, calories, proteins, fats, carbohydrates";

const LINK_COLUMNS: &str = r#"
    mp.meal_id, mp.product_id, mp.product_weight,
    p.name, p.calories, p.proteins, p.fats, p.carbohydrates
"#;

impl Meal {
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        name: &str,
        recorded_at: Date,
    ) -> sqlx::Result<Meal> {
        sqlx::query_as::<_, Meal>(&format!(
            "INSERT INTO meals (user_id, name, recorded_at) VALUES ($1, $2, $3) RETURNING {MEAL_COLUMNS}"
        ))
        .bind(user_id)
        .bind(name)
        .bind(recorded_at)
        .fetch_one(conn)
        .await
    }

    pub async fn find_owned(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<Meal>> {
        sqlx::query_as::<_, Meal>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Locks the meal row until the transaction ends; totals are recomputed under this lock.
    pub async fn lock_owned(
        conn: &mut PgConnection,
        user_id: Uuid,
        id: Uuid,
    ) -> sqlx::Result<Option<Meal>> {
        sqlx::query_as::<_, Meal>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    /// Locks every meal that links `product_id`, in id order.
    pub async fn lock_linking_product(
        conn: &mut PgConnection,
        product_id: Uuid,
    ) -> sqlx::Result<Vec<Meal>> {
        sqlx::query_as::<_, Meal>(
            r#"
            SELECT m.id, m.user_id, m.name, m.recorded_at, m.weight, m.calories,
                   m.proteins, m.fats, m.carbohydrates
            FROM meals m
            JOIN meal_products mp ON mp.meal_id = m.id
            WHERE mp.product_id = $1
            ORDER BY m.id
            FOR UPDATE OF m
            "#,
        )
        .bind(product_id)
        .fetch_all(conn)
        .await
    }

    pub async fn list(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Meal>> {
        sqlx::query_as::<_, Meal>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = $1 ORDER BY recorded_at DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn list_on(db: &PgPool, user_id: Uuid, date: Date) -> sqlx::Result<Vec<Meal>> {
        sqlx::query_as::<_, Meal>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = $1 AND recorded_at = $2 ORDER BY created_at"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(db)
        .await
    }

    pub async fn list_since(db: &PgPool, user_id: Uuid, since: Date) -> sqlx::Result<Vec<Meal>> {
        sqlx::query_as::<_, Meal>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = $1 AND recorded_at >= $2 \
             ORDER BY recorded_at DESC, created_at DESC"
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(db)
        .await
    }

    pub async fn rename(conn: &mut PgConnection, id: Uuid, name: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE meals SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn store_totals(
        conn: &mut PgConnection,
        id: Uuid,
        t: &MealTotals,
    ) -> sqlx::Result<Meal> {
        sqlx::query_as::<_, Meal>(&format!(
            r#"
            UPDATE meals
            SET weight = $2, calories = $3, proteins = $4, fats = $5, carbohydrates = $6
            WHERE id = $1
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(t.weight)
        .bind(t.calories)
        .bind(t.proteins)
        .bind(t.fats)
        .bind(t.carbohydrates)
        .fetch_one(conn)
        .await
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete_older_than(db: &PgPool, cutoff: Date) -> sqlx::Result<u64> {
        let res = sqlx::query("DELETE FROM meals WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }
}

impl MealProductRow {
    pub async fn for_meal<'e, E: PgExecutor<'e>>(
        exec: E,
        meal_id: Uuid,
    ) -> sqlx::Result<Vec<MealProductRow>> {
        sqlx::query_as::<_, MealProductRow>(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM meal_products mp
            JOIN products p ON p.id = mp.product_id
            WHERE mp.meal_id = $1
            ORDER BY mp.created_at, mp.product_id
            "#
        ))
        .bind(meal_id)
        .fetch_all(exec)
        .await
    }

    pub async fn for_meals(db: &PgPool, meal_ids: &[Uuid]) -> sqlx::Result<Vec<MealProductRow>> {
        sqlx::query_as::<_, MealProductRow>(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM meal_products mp
            JOIN products p ON p.id = mp.product_id
            WHERE mp.meal_id = ANY($1)
            ORDER BY mp.created_at, mp.product_id
            "#
        ))
        .bind(meal_ids)
        .fetch_all(db)
        .await
    }

    pub async fn link(
        conn: &mut PgConnection,
        meal_id: Uuid,
        product_id: Uuid,
        product_weight: f64,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO meal_products (meal_id, product_id, product_weight) VALUES ($1, $2, $3)",
        )
        .bind(meal_id)
        .bind(product_id)
        .bind(product_weight)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_weight(
        conn: &mut PgConnection,
        meal_id: Uuid,
        product_id: Uuid,
        product_weight: f64,
    ) -> sqlx::Result<bool> {
        let res = sqlx::query(
            "UPDATE meal_products SET product_weight = $3 WHERE meal_id = $1 AND product_id = $2",
        )
        .bind(meal_id)
        .bind(product_id)
        .bind(product_weight)
        .execute(conn)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn unlink(conn: &mut PgConnection, meal_id: Uuid, product_id: Uuid) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM meal_products WHERE meal_id = $1 AND product_id = $2")
            .bind(meal_id)
            .bind(product_id)
            .execute(conn)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
