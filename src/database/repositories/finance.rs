use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{FinanceSummaryRow, FinanceTransaction, TransactionFilter, TransactionInput},
    utils::sql,
};

const TRANSACTION_COLUMNS: &str = r#"
    id,
    kind,
    category,
    amount,
    currency,
    description,
    reference,
    transaction_date,
    project_id,
    recorded_by,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

/// Appends the WHERE conditions shared by listing and summarising.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    if let Some(kind) = filter.kind {
        query.push(" AND kind = ").push_bind(kind);
    }
    if let Some(category) = &filter.category {
        query.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(project_id) = filter.project_id {
        query.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(from) = filter.from {
        query.push(" AND transaction_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND transaction_date <= ").push_bind(to);
    }
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: TransactionInput,
        recorded_by: Uuid,
    ) -> Result<FinanceTransaction, sqlx::Error> {
        let now = Utc::now();
        let currency = input.currency();

        sqlx::query_as::<_, FinanceTransaction>(&sql(&format!(
            r#"
            INSERT INTO
                finance_transactions (
                    id,
                    kind,
                    category,
                    amount,
                    currency,
                    description,
                    reference,
                    transaction_date,
                    project_id,
                    recorded_by,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {TRANSACTION_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.kind)
        .bind(input.category)
        .bind(input.amount)
        .bind(currency)
        .bind(input.description)
        .bind(input.reference)
        .bind(input.transaction_date)
        .bind(input.project_id)
        .bind(recorded_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<FinanceTransaction>, sqlx::Error> {
        sqlx::query_as::<_, FinanceTransaction>(&sql(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM
                finance_transactions
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FinanceTransaction>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM finance_transactions WHERE TRUE"
        ));
        push_filter(&mut query, filter);

        query
            .push(" ORDER BY transaction_date DESC, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query
            .build_query_as::<FinanceTransaction>()
            .fetch_all(&self.pool)
            .await
    }

    /// Income and expense totals per currency for the filtered window.
    pub async fn summarize(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<FinanceSummaryRow>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                currency::TEXT AS currency,
                COALESCE(SUM(amount) FILTER (WHERE kind = 'income'), 0) AS total_income,
                COALESCE(SUM(amount) FILTER (WHERE kind = 'expense'), 0) AS total_expense,
                COUNT(*) AS transaction_count
            FROM
                finance_transactions
            WHERE TRUE
            "#,
        );
        push_filter(&mut query, filter);
        query.push(" GROUP BY currency ORDER BY currency");

        query
            .build_query_as::<FinanceSummaryRow>()
            .fetch_all(&self.pool)
            .await
    }

    pub async fn update_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: TransactionInput,
    ) -> Result<Option<FinanceTransaction>, sqlx::Error> {
        let currency = input.currency();

        sqlx::query_as::<_, FinanceTransaction>(&sql(&format!(
            r#"
            UPDATE finance_transactions
            SET
                kind = ?,
                category = ?,
                amount = ?,
                currency = ?,
                description = ?,
                reference = ?,
                transaction_date = ?,
                project_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {TRANSACTION_COLUMNS}
        "#
        )))
        .bind(input.kind)
        .bind(input.category)
        .bind(input.amount)
        .bind(currency)
        .bind(input.description)
        .bind(input.reference)
        .bind(input.transaction_date)
        .bind(input.project_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM finance_transactions
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
