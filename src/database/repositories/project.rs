use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Project, ProjectFilter, ProjectInput, ProjectStatus},
    utils::sql,
};

const PROJECT_COLUMNS: &str = r#"
    id,
    name,
    description,
    status,
    start_date,
    end_date,
    budget,
    owner_id,
    team_id,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_project(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: ProjectInput,
    ) -> Result<Project, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Project>(&sql(&format!(
            r#"
            INSERT INTO
                projects (
                    id,
                    name,
                    description,
                    status,
                    start_date,
                    end_date,
                    budget,
                    owner_id,
                    team_id,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PROJECT_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.name)
        .bind(input.description)
        .bind(input.status.unwrap_or(ProjectStatus::Planning))
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.budget)
        .bind(input.owner_id)
        .bind(input.team_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&sql(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM
                projects
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_projects(
        &self,
        filter: &ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE TRUE"
        ));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(owner_id) = filter.owner_id {
            query.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(team_id) = filter.team_id {
            query.push(" AND team_id = ").push_bind(team_id);
        }

        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Project>().fetch_all(&self.pool).await
    }

    pub async fn update_project(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: ProjectInput,
    ) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&sql(&format!(
            r#"
            UPDATE projects
            SET
                name = ?,
                description = ?,
                status = COALESCE(?, status),
                start_date = ?,
                end_date = ?,
                budget = ?,
                owner_id = ?,
                team_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {PROJECT_COLUMNS}
        "#
        )))
        .bind(input.name)
        .bind(input.description)
        .bind(input.status)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.budget)
        .bind(input.owner_id)
        .bind(input.team_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_project(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM projects
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
