use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Leave, LeaveFilter, LeaveInput, LeaveStatus},
    utils::sql,
};

const LEAVE_COLUMNS: &str = r#"
    id,
    employee_id,
    leave_type,
    start_date,
    end_date,
    reason,
    status,
    reviewed_by,
    reviewed_at,
    review_note,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct LeaveRepository {
    pool: PgPool,
}

impl LeaveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_leave(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        employee_id: Uuid,
        input: LeaveInput,
    ) -> Result<Leave, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Leave>(&sql(&format!(
            r#"
            INSERT INTO
                leaves (
                    id,
                    employee_id,
                    leave_type,
                    start_date,
                    end_date,
                    reason,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {LEAVE_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(input.leave_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.reason)
        .bind(LeaveStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Leave>, sqlx::Error> {
        sqlx::query_as::<_, Leave>(&sql(&format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM
                leaves
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_leaves(
        &self,
        filter: &LeaveFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Leave>, sqlx::Error> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {LEAVE_COLUMNS} FROM leaves WHERE TRUE"));

        if let Some(employee_id) = filter.employee_id {
            query.push(" AND employee_id = ").push_bind(employee_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(leave_type) = filter.leave_type {
            query.push(" AND leave_type = ").push_bind(leave_type);
        }
        // Overlap with the requested window
        if let Some(from) = filter.from {
            query.push(" AND end_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND start_date <= ").push_bind(to);
        }

        query
            .push(" ORDER BY start_date DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Leave>().fetch_all(&self.pool).await
    }

    /// Moves a leave out of `expected` into `next`. Returns `None` if the row
    /// was not in `expected` anymore, so concurrent reviews cannot both win.
    pub async fn transition_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        expected: LeaveStatus,
        next: LeaveStatus,
        reviewed_by: Option<Uuid>,
        review_note: Option<String>,
    ) -> Result<Option<Leave>, sqlx::Error> {
        let now = Utc::now();
        let reviewed_at = reviewed_by.map(|_| now);

        sqlx::query_as::<_, Leave>(&sql(&format!(
            r#"
            UPDATE leaves
            SET
                status = ?,
                reviewed_by = COALESCE(?, reviewed_by),
                reviewed_at = COALESCE(?, reviewed_at),
                review_note = COALESCE(?, review_note),
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING {LEAVE_COLUMNS}
        "#
        )))
        .bind(next)
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(review_note)
        .bind(now)
        .bind(id)
        .bind(expected)
        .fetch_optional(&mut **tx)
        .await
    }
}
