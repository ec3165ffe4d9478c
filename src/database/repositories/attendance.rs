use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Attendance, AttendanceFilter, AttendanceInput},
    utils::sql,
};

const ATTENDANCE_COLUMNS: &str = r#"
    id,
    employee_id,
    date,
    check_in,
    check_out,
    status,
    notes,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_attendance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: AttendanceInput,
    ) -> Result<Attendance, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Attendance>(&sql(&format!(
            r#"
            INSERT INTO
                attendance (
                    id,
                    employee_id,
                    date,
                    check_in,
                    check_out,
                    status,
                    notes,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {ATTENDANCE_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.employee_id)
        .bind(input.date)
        .bind(input.check_in)
        .bind(input.check_out)
        .bind(input.status)
        .bind(input.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Attendance>, sqlx::Error> {
        sqlx::query_as::<_, Attendance>(&sql(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS}
            FROM
                attendance
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_for_day(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        sqlx::query_as::<_, Attendance>(&sql(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS}
            FROM
                attendance
            WHERE
                employee_id = ?
                AND date = ?
        "#
        )))
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
    }

    /// Latest record still waiting for a check-out, regardless of its date.
    pub async fn find_open(&self, employee_id: Uuid) -> Result<Option<Attendance>, sqlx::Error> {
        sqlx::query_as::<_, Attendance>(&sql(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS}
            FROM
                attendance
            WHERE
                employee_id = ?
                AND check_in IS NOT NULL
                AND check_out IS NULL
            ORDER BY
                check_in DESC
            LIMIT 1
        "#
        )))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE TRUE"
        ));

        if let Some(employee_id) = filter.employee_id {
            query.push(" AND employee_id = ").push_bind(employee_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.from {
            query.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND date <= ").push_bind(to);
        }

        query
            .push(" ORDER BY date DESC, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query
            .build_query_as::<Attendance>()
            .fetch_all(&self.pool)
            .await
    }

    pub async fn update_attendance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: AttendanceInput,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        sqlx::query_as::<_, Attendance>(&sql(&format!(
            r#"
            UPDATE attendance
            SET
                employee_id = ?,
                date = ?,
                check_in = ?,
                check_out = ?,
                status = ?,
                notes = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {ATTENDANCE_COLUMNS}
        "#
        )))
        .bind(input.employee_id)
        .bind(input.date)
        .bind(input.check_in)
        .bind(input.check_out)
        .bind(input.status)
        .bind(input.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Stamps check-out on an open record; `None` when already checked out.
    pub async fn record_check_out(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Attendance>(&sql(&format!(
            r#"
            UPDATE attendance
            SET
                check_out = ?,
                updated_at = ?
            WHERE
                id = ?
                AND check_out IS NULL
            RETURNING {ATTENDANCE_COLUMNS}
        "#
        )))
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_attendance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM attendance
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
