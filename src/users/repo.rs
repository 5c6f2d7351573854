use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::repo_types::{Picture, User, UserChanges};

const USER_COLUMNS: &str = r#"
    id, login, email, password_hash, firstname, lastname, age, height, weight,
    gender, aim, activity_level, recommended_calories,
    (profile_picture IS NOT NULL) AS has_profile_picture, registered_at
"#;

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Row-locks the user for the rest of the transaction.
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn find_by_login_or_email(db: &PgPool, value: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1 OR email = $1 LIMIT 1"
        ))
        .bind(value)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// True if another user already holds `login` or `email`.
    pub async fn login_taken(db: &PgPool, login: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM users WHERE login = $1 AND ($2::uuid IS NULL OR id <> $2))"#,
        )
        .bind(login)
        .bind(except)
        .fetch_one(db)
        .await
    }

    pub async fn email_taken(db: &PgPool, email: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))"#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        login: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (login, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(login)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn update(conn: &mut PgConnection, id: Uuid, c: &UserChanges) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET login = $2, email = $3, password_hash = $4, firstname = $5, lastname = $6,
                age = $7, height = $8, weight = $9, gender = $10, aim = $11,
                activity_level = $12, recommended_calories = $13
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&c.login)
        .bind(&c.email)
        .bind(&c.password_hash)
        .bind(&c.firstname)
        .bind(&c.lastname)
        .bind(c.age)
        .bind(c.height)
        .bind(c.weight)
        .bind(&c.gender)
        .bind(&c.aim)
        .bind(&c.activity_level)
        .bind(c.recommended_calories)
        .fetch_one(conn)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_picture(
        db: &PgPool,
        id: Uuid,
        data: &[u8],
        content_type: &str,
    ) -> sqlx::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE users SET profile_picture = $2, profile_picture_type = $3 WHERE id = $1"#,
        )
        .bind(id)
        .bind(data)
        .bind(content_type)
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn picture(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Picture>> {
        sqlx::query_as::<_, Picture>(
            r#"
            SELECT profile_picture AS data,
                   COALESCE(profile_picture_type, 'application/octet-stream') AS content_type
            FROM users
            WHERE id = $1 AND profile_picture IS NOT NULL
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
