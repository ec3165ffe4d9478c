use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction, types::Json};
use uuid::Uuid;

use crate::database::{
    models::{Permission, Role},
    utils::sql,
};

const ROLE_COLUMNS: &str = r#"
    id,
    name,
    description,
    permissions,
    is_system,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_role(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        description: Option<&str>,
        permissions: Vec<Permission>,
    ) -> Result<Role, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Role>(&sql(&format!(
            r#"
            INSERT INTO
                roles (
                    id,
                    name,
                    description,
                    permissions,
                    is_system,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, FALSE, ?, ?)
            RETURNING {ROLE_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(Json(permissions))
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(&sql(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM
                roles
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(&sql(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM
                roles
            WHERE
                name = ?
        "#
        )))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(&sql(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM
                roles
            ORDER BY
                is_system DESC,
                name
        "#
        )))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_role(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        permissions: Vec<Permission>,
    ) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(&sql(&format!(
            r#"
            UPDATE roles
            SET
                name = ?,
                description = ?,
                permissions = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {ROLE_COLUMNS}
        "#
        )))
        .bind(name)
        .bind(description)
        .bind(Json(permissions))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_role(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM roles
            WHERE
                id = ?
                AND is_system = FALSE
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
