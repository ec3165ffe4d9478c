use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{Team, TeamInput, TeamMember},
    utils::sql,
};

const TEAM_COLUMNS: &str = r#"
    id,
    name,
    description,
    lead_id,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_team(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: TeamInput,
    ) -> Result<Team, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, Team>(&sql(&format!(
            r#"
            INSERT INTO
                teams (
                    id,
                    name,
                    description,
                    lead_id,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?)
            RETURNING {TEAM_COLUMNS}
        "#
        )))
        .bind(Uuid::new_v4())
        .bind(input.name)
        .bind(input.description)
        .bind(input.lead_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(&sql(&format!(
            r#"
            SELECT {TEAM_COLUMNS}
            FROM
                teams
            WHERE
                id = ?
        "#
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_teams(&self, limit: i64, offset: i64) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(&sql(&format!(
            r#"
            SELECT {TEAM_COLUMNS}
            FROM
                teams
            ORDER BY
                name
            LIMIT ? OFFSET ?
        "#
        )))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_team(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: TeamInput,
    ) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(&sql(&format!(
            r#"
            UPDATE teams
            SET
                name = ?,
                description = ?,
                lead_id = ?,
                updated_at = ?
            WHERE
                id = ?
            RETURNING {TEAM_COLUMNS}
        "#
        )))
        .bind(input.name)
        .bind(input.description)
        .bind(input.lead_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_team(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM teams
            WHERE
                id = ?
        "#))
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` when the user was already a member.
    pub async fn add_member(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            INSERT INTO
                team_members (team_id, user_id, joined_at)
            VALUES
                (?, ?, ?)
            ON CONFLICT (team_id, user_id) DO NOTHING
        "#))
        .bind(team_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_member(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM team_members
            WHERE
                team_id = ?
                AND user_id = ?
        "#))
        .bind(team_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(&sql(r#"
            SELECT
                tm.team_id,
                tm.user_id,
                u.name,
                u.email,
                tm.joined_at
            FROM
                team_members tm
                INNER JOIN users u ON u.id = tm.user_id
            WHERE
                tm.team_id = ?
            ORDER BY
                u.name
        "#))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
    }
}
