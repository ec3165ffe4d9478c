use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Payroll, PayrollFilter, PayrollInput, PayrollStatus},
    utils::sql,
};

const PAYROLL_COLUMNS: &str = r#"
    id,
    employee_id,
    period_start,
    period_end,
    basic_salary,
    allowances,
    deductions,
    net_salary,
    status,
    paid_at,
    notes,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PayrollRepository {
    pool: PgPool,
}

impl PayrollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_payroll(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: PayrollInput,
    ) -> Result<Payroll, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Payroll>(&sql(&format!(
            r#"
            INSERT INTO
                payroll (
                    id,
                    employee_id,
                    period_start,
                    period_end,
                    basic_salary,
                    allowances,
                    deductions,
                    net_salary,
                    status,
                    notes,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PAYROLL_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.employee_id)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(input.basic_salary)
        .bind(input.allowances)
        .bind(input.deductions)
        .bind(input.net_salary)
        .bind(PayrollStatus::Draft)
        .bind(input.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payroll>, sqlx::Error> {
        sqlx::query_as::<_, Payroll>(&sql(&format!(
            r#"
            SELECT {PAYROLL_COLUMNS}
            FROM
                payroll
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_payroll(
        &self,
        filter: &PayrollFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Payroll>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE TRUE"
        ));

        if let Some(employee_id) = filter.employee_id {
            query.push(" AND employee_id = ").push_bind(employee_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.from {
            query.push(" AND period_end >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND period_start <= ").push_bind(to);
        }

        query
            .push(" ORDER BY period_start DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Payroll>().fetch_all(&self.pool).await
    }

    /// Only draft records can be edited.
    pub async fn update_payroll(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: PayrollInput,
    ) -> Result<Option<Payroll>, sqlx::Error> {
        sqlx::query_as::<_, Payroll>(&sql(&format!(
            r#"
            UPDATE payroll
            SET
                employee_id = ?,
                period_start = ?,
                period_end = ?,
                basic_salary = ?,
                allowances = ?,
                deductions = ?,
                net_salary = ?,
                notes = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = 'draft'
            RETURNING {PAYROLL_COLUMNS}
        "#
        )))
        .bind(input.employee_id)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(input.basic_salary)
        .bind(input.allowances)
        .bind(input.deductions)
        .bind(input.net_salary)
        .bind(input.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn transition_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        expected: PayrollStatus,
        next: PayrollStatus,
    ) -> Result<Option<Payroll>, sqlx::Error> {
        let now = Utc::now();
        let paid_at = (next == PayrollStatus::Paid).then_some(now);

        sqlx::query_as::<_, Payroll>(&sql(&format!(
            r#"
            UPDATE payroll
            SET
                status = ?,
                paid_at = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING {PAYROLL_COLUMNS}
        "#
        )))
        .bind(next)
        .bind(paid_at)
        .bind(now)
        .bind(id)
        .bind(expected)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Paid records are kept for the books.
    pub async fn delete_payroll(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM payroll
            WHERE
                id = ?
                AND status <> 'paid'
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
