use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use crate::database::{
    models::{AuditLog, AuditLogFilter, CreateAuditLogInput},
    utils::sql,
};

const AUDIT_LOG_COLUMNS: &str = r#"
    id,
    user_id,
    user_email,
    action,
    module,
    entity_type,
    entity_id,
    description,
    metadata,
    ip_address,
    user_agent,
    created_at
"#;

/// Insert and read only; the table rejects updates and deletes.
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(module) = filter.module {
        query.push(" AND module = ").push_bind(module);
    }
    if let Some(action) = filter.action {
        query.push(" AND action = ").push_bind(action);
    }
    if let Some(entity_type) = &filter.entity_type {
        query.push(" AND entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(entity_id) = filter.entity_id {
        query.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(from) = filter.from {
        query.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND created_at <= ").push_bind(to);
    }
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Works with a pool or with `&mut **tx` so entries can join the caller's transaction.
    pub async fn insert<'e, E>(
        executor: E,
        input: CreateAuditLogInput,
    ) -> Result<AuditLog, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuditLog>(&sql(&format!(
            r#"
            INSERT INTO
                audit_logs (
                    id,
                    user_id,
                    user_email,
                    action,
                    module,
                    entity_type,
                    entity_id,
                    description,
                    metadata,
                    ip_address,
                    user_agent
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {AUDIT_LOG_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.user_email)
        .bind(input.action)
        .bind(input.module)
        .bind(input.entity_type)
        .bind(input.entity_id)
        .bind(input.description)
        .bind(input.metadata.map(Json))
        .bind(input.ip_address)
        .bind(input.user_agent)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditLog>, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(&sql(&format!(
            r#"
            SELECT {AUDIT_LOG_COLUMNS}
            FROM
                audit_logs
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list(
        &self,
        filter: &AuditLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {AUDIT_LOG_COLUMNS} FROM audit_logs WHERE TRUE"
        ));
        push_filter(&mut query, filter);

        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<AuditLog>().fetch_all(&self.pool).await
    }

    pub async fn count(&self, filter: &AuditLogFilter) -> Result<i64, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs WHERE TRUE");
        push_filter(&mut query, filter);

        query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
    }
}
