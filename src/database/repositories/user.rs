use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction, types::Json};
use uuid::Uuid;

use crate::database::{
    models::{Permission, User},
    utils::sql,
};

const USER_COLUMNS: &str = r#"
    id,
    email,
    password_hash,
    name,
    role_id,
    custom_permissions,
    is_active,
    last_login_at,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: &User,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            INSERT INTO
                users (
                    id,
                    email,
                    password_hash,
                    name,
                    role_id,
                    is_active,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
        "#
        )))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role_id)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM
                users
            WHERE
                LOWER(email) = LOWER(?)
        "#
        )))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM
                users
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM
                users
            ORDER BY
                created_at DESC
            LIMIT ? OFFSET ?
        "#
        )))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        name: &str,
        email: &str,
        is_active: Option<bool>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            UPDATE users
            SET
                name = ?,
                email = ?,
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE
                id = ?
            RETURNING {USER_COLUMNS}
        "#
        )))
        .bind(name)
        .bind(email)
        .bind(is_active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn assign_role(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            UPDATE users
            SET
                role_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {USER_COLUMNS}
        "#
        )))
        .bind(role_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// `None` clears the overrides so the user falls back to the role's permissions.
    pub async fn set_custom_permissions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        permissions: Option<Vec<Permission>>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&sql(&format!(
            r#"
            UPDATE users
            SET
                custom_permissions = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {USER_COLUMNS}
        "#
        )))
        .bind(permissions.map(Json))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM users
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(&sql(r#"
            SELECT
                COUNT(*)
            FROM
                users
            WHERE
                LOWER(email) = LOWER(?)
        "#))
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn count_with_role(&self, role_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&sql(r#"
            SELECT
                COUNT(*)
            FROM
                users
            WHERE
                role_id = ?
        "#))
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_password(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&sql(r#"
            UPDATE users
            SET
                password_hash = ?,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn touch_last_login(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(&sql(r#"
            UPDATE users
            SET
                last_login_at = ?
            WHERE
                id = ?
        "#))
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
