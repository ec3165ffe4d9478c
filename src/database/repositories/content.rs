use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Content, ContentFilter, ContentInput, ContentStatus},
    utils::sql,
};

const CONTENT_COLUMNS: &str = r#"
    id,
    title,
    kind,
    body,
    url,
    tags,
    status,
    author_id,
    published_at,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_content(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: ContentInput,
        author_id: Uuid,
    ) -> Result<Content, sqlx::Error> {
        let now = Utc::now();
        let tags = input.normalized_tags();

        sqlx::query_as::<_, Content>(&sql(&format!(
            r#"
            INSERT INTO
                contents (
                    id,
                    title,
                    kind,
                    body,
                    url,
                    tags,
                    status,
                    author_id,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {CONTENT_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.title)
        .bind(input.kind)
        .bind(input.body)
        .bind(input.url)
        .bind(tags)
        .bind(ContentStatus::Draft)
        .bind(author_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Content>, sqlx::Error> {
        sqlx::query_as::<_, Content>(&sql(&format!(
            r#"
            SELECT {CONTENT_COLUMNS}
            FROM
                contents
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_content(
        &self,
        filter: &ContentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Content>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE TRUE"
        ));

        if let Some(kind) = filter.kind {
            query.push(" AND kind = ").push_bind(kind);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(author_id) = filter.author_id {
            query.push(" AND author_id = ").push_bind(author_id);
        }
        if let Some(tag) = &filter.tag {
            query
                .push(" AND ")
                .push_bind(tag.trim().to_lowercase())
                .push(" = ANY(tags)");
        }

        query
            .push(" ORDER BY updated_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        query.build_query_as::<Content>().fetch_all(&self.pool).await
    }

    /// `None` when the content is gone or no longer in the `expected` status.
    pub async fn update_content(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        expected: ContentStatus,
        input: ContentInput,
    ) -> Result<Option<Content>, sqlx::Error> {
        let tags = input.normalized_tags();

        sqlx::query_as::<_, Content>(&sql(&format!(
            r#"
            UPDATE contents
            SET
                title = ?,
                kind = ?,
                body = ?,
                url = ?,
                tags = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING {CONTENT_COLUMNS}
        "#
        )))
        .bind(input.title)
        .bind(input.kind)
        .bind(input.body)
        .bind(input.url)
        .bind(tags)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn transition_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        expected: ContentStatus,
        next: ContentStatus,
    ) -> Result<Option<Content>, sqlx::Error> {
        let now = Utc::now();
        let published_at = (next == ContentStatus::Published).then_some(now);

        sqlx::query_as::<_, Content>(&sql(&format!(
            r#"
            UPDATE contents
            SET
                status = ?,
                published_at = COALESCE(?, published_at),
                updated_at = ?
            WHERE
                id = ?
                AND status = ?
            RETURNING {CONTENT_COLUMNS}
        "#
        )))
        .bind(next)
        .bind(published_at)
        .bind(now)
        .bind(id)
        .bind(expected)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_content(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM contents
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
