use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Task, TaskFilter, TaskInput, TaskPriority, TaskStatus},
    utils::sql,
};

const TASK_COLUMNS: &str = r#"
    id,
    project_id,
    title,
    description,
    status,
    priority,
    assignee_id,
    due_date,
    created_by,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_task(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: TaskInput,
        created_by: Uuid,
    ) -> Result<Task, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Task>(&sql(&format!(
            r#"
            INSERT INTO
                tasks (
                    id,
                    project_id,
                    title,
                    description,
                    status,
                    priority,
                    assignee_id,
                    due_date,
                    created_by,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {TASK_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.project_id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.status.unwrap_or(TaskStatus::Todo))
        .bind(input.priority.unwrap_or(TaskPriority::Medium))
        .bind(input.assignee_id)
        .bind(input.due_date)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&sql(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM
                tasks
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_tasks(
        &self,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE"));

        if let Some(project_id) = filter.project_id {
            query.push(" AND project_id = ").push_bind(project_id);
        }
        if let Some(assignee_id) = filter.assignee_id {
            query.push(" AND assignee_id = ").push_bind(assignee_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority);
        }

        query
            .push(" ORDER BY due_date ASC NULLS LAST, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Task>().fetch_all(&self.pool).await
    }

    pub async fn update_task(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: TaskInput,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&sql(&format!(
            r#"
            UPDATE tasks
            SET
                project_id = ?,
                title = ?,
                description = ?,
                status = COALESCE(?, status),
                priority = COALESCE(?, priority),
                assignee_id = ?,
                due_date = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {TASK_COLUMNS}
        "#
        )))
        .bind(input.project_id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.status)
        .bind(input.priority)
        .bind(input.assignee_id)
        .bind(input.due_date)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&sql(&format!(
            r#"
            UPDATE tasks
            SET
                status = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {TASK_COLUMNS}
        "#
        )))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_task(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM tasks
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
