use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Employee, EmployeeFilter, EmployeeInput, EmployeeStatus},
    utils::sql,
};

const EMPLOYEE_COLUMNS: &str = r#"
    id,
    user_id,
    employee_code,
    first_name,
    last_name,
    email,
    phone,
    department,
    designation,
    date_of_joining,
    status,
    manager_id,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_employee(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: EmployeeInput,
    ) -> Result<Employee, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Employee>(&sql(&format!(
            r#"
            INSERT INTO
                employees (
                    id,
                    user_id,
                    employee_code,
                    first_name,
                    last_name,
                    email,
                    phone,
                    department,
                    designation,
                    date_of_joining,
                    status,
                    manager_id,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {EMPLOYEE_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.employee_code)
        .bind(input.first_name)
        .bind(input.last_name)
        .bind(input.email)
        .bind(input.phone)
        .bind(input.department)
        .bind(input.designation)
        .bind(input.date_of_joining)
        .bind(input.status.unwrap_or(EmployeeStatus::Active))
        .bind(input.manager_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql(&format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS}
            FROM
                employees
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql(&format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS}
            FROM
                employees
            WHERE
                user_id = ?
        "#
        )))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Employee>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE TRUE"
        ));

        if let Some(department) = &filter.department {
            query.push(" AND department = ").push_bind(department.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(manager_id) = filter.manager_id {
            query.push(" AND manager_id = ").push_bind(manager_id);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.trim());
            query
                .push(" AND (first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR employee_code ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query
            .push(" ORDER BY last_name, first_name LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query
            .build_query_as::<Employee>()
            .fetch_all(&self.pool)
            .await
    }

    pub async fn update_employee(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: EmployeeInput,
    ) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&sql(&format!(
            r#"
            UPDATE employees
            SET
                user_id = ?,
                employee_code = ?,
                first_name = ?,
                last_name = ?,
                email = ?,
                phone = ?,
                department = ?,
                designation = ?,
                date_of_joining = ?,
                status = COALESCE(?, status),
                manager_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {EMPLOYEE_COLUMNS}
        "#
        )))
        .bind(input.user_id)
        .bind(input.employee_code)
        .bind(input.first_name)
        .bind(input.last_name)
        .bind(input.email)
        .bind(input.phone)
        .bind(input.department)
        .bind(input.designation)
        .bind(input.date_of_joining)
        .bind(input.status)
        .bind(input.manager_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_employee(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM employees
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
