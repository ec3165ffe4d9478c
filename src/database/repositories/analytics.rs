use sqlx::PgPool;

use crate::database::models::OverviewCounts;

#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn overview_counts(&self) -> Result<OverviewCounts, sqlx::Error> {
        sqlx::query_as::<_, OverviewCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE is_active) AS active_users,
                (SELECT COUNT(*) FROM employees) AS total_employees,
                (SELECT COUNT(*) FROM employees WHERE status = 'active') AS active_employees,
                (SELECT COUNT(*) FROM attendance
                    WHERE date = CURRENT_DATE AND status IN ('present', 'late', 'remote', 'half_day')
                ) AS present_today,
                (SELECT COUNT(*) FROM leaves WHERE status = 'pending') AS pending_leaves,
                (SELECT COUNT(*) FROM projects WHERE status = 'active') AS active_projects,
                (SELECT COUNT(*) FROM tasks WHERE status <> 'done') AS open_tasks,
                (SELECT COUNT(*) FROM contents WHERE status = 'published') AS published_content,
                (SELECT COUNT(*) FROM payroll WHERE status <> 'paid') AS pending_payroll
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }
}
