use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::repo_types::{Product, ProductFields, ProductImage};

const PRODUCT_COLUMNS: &str = r#"
    id, name, weight, calories, proteins, fats, carbohydrates, description,
    (image IS NOT NULL) AS has_picture, is_public, user_id
"#;

/// Public products plus the user's own private ones.
const VISIBLE: &str = "(is_public OR user_id = $1)";

fn lock_personal_sql() -> String {
    format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE user_id = $1 AND NOT is_public AND id = $2 FOR UPDATE"
    )
}

impl Product {
    pub async fn list_visible(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {VISIBLE} ORDER BY name, id"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn list_personal(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1 AND NOT is_public ORDER BY name"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn find_visible<'e, E: PgExecutor<'e>>(
        exec: E,
        user_id: Uuid,
        id: Uuid,
    ) -> sqlx::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {VISIBLE} AND id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(exec)
        .await
    }

    pub async fn find_personal(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1 AND NOT is_public AND id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Exact name match; the user's own product wins over a public one.
    pub async fn find_visible_by_name(
        db: &PgPool,
        user_id: Uuid,
        name: &str,
    ) -> sqlx::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {VISIBLE} AND name = $2 \
             ORDER BY is_public LIMIT 1"
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(db)
        .await
    }

    /// `pattern` is an ILIKE pattern, already escaped.
    pub async fn search(db: &PgPool, user_id: Uuid, pattern: &str) -> sqlx::Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {VISIBLE} AND name ILIKE $2 \
             ORDER BY name, id"
        ))
        .bind(user_id)
        .bind(pattern)
        .fetch_all(db)
        .await
    }

    /// Locks one of the user's private products until the transaction ends.
    /// New `meal_products` links to it wait for the commit.
    pub async fn lock_personal(
        conn: &mut PgConnection,
        user_id: Uuid,
        id: Uuid,
    ) -> sqlx::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(&lock_personal_sql())
        .bind(user_id)
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn create_personal(
        db: &PgPool,
        user_id: Uuid,
        f: &ProductFields,
    ) -> sqlx::Result<Product> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products
                (name, weight, calories, proteins, fats, carbohydrates, description, is_public, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&f.name)
        .bind(f.weight)
        .bind(f.calories)
        .bind(f.proteins)
        .bind(f.fats)
        .bind(f.carbohydrates)
        .bind(&f.description)
        .bind(user_id)
        .fetch_one(db)
        .await
    }

    /// Inserts a public catalogue product unless one with that name exists.
    pub async fn insert_public(
        db: &PgPool,
        f: &ProductFields,
        image: Option<(&[u8], &str)>,
    ) -> sqlx::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO products
                (name, weight, calories, proteins, fats, carbohydrates, description,
                 image, image_type, is_public, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, NULL)
            ON CONFLICT (name) WHERE is_public DO NOTHING
            "#,
        )
        .bind(&f.name)
        .bind(f.weight)
        .bind(f.calories)
        .bind(f.proteins)
        .bind(f.fats)
        .bind(f.carbohydrates)
        .bind(&f.description)
        .bind(image.map(|(data, _)| data))
        .bind(image.map(|(_, ct)| ct))
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn update(conn: &mut PgConnection, id: Uuid, f: &ProductFields) -> sqlx::Result<Product> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = $2, weight = $3, calories = $4, proteins = $5, fats = $6,
                carbohydrates = $7, description = $8
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&f.name)
        .bind(f.weight)
        .bind(f.calories)
        .bind(f.proteins)
        .bind(f.fats)
        .bind(f.carbohydrates)
        .bind(&f.description)
        .fetch_one(conn)
        .await
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_image(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        data: &[u8],
        content_type: &str,
    ) -> sqlx::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE products SET image = $3, image_type = $4
            WHERE id = $2 AND user_id = $1 AND NOT is_public
            "#,
        )
        .bind(user_id)
        .bind(id)
        .bind(data)
        .bind(content_type)
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn image(db: &PgPool, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<ProductImage>> {
        sqlx::query_as::<_, ProductImage>(&format!(
            r#"
            SELECT image AS data, COALESCE(image_type, 'application/octet-stream') AS content_type
            FROM products
            WHERE {VISIBLE} AND id = $2 AND image IS NOT NULL
            "#
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
