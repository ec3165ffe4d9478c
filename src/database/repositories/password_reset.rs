use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{models::PasswordResetToken, utils::sql};

const TOKEN_LIFETIME_HOURS: i64 = 1;

/// Generate a cryptographically secure random token
fn generate_secure_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                abcdefghijklmnopqrstuvwxyz\
                                0123456789";
    const TOKEN_LEN: usize = 64;
    let mut rng = rand::rng();

    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            char::from(CHARSET[idx])
        })
        .collect()
}

#[derive(Clone)]
pub struct PasswordResetTokenRepository {
    pool: PgPool,
}

impl PasswordResetTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_token(&self, user_id: Uuid) -> Result<PasswordResetToken, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, PasswordResetToken>(&sql(r#"
            INSERT INTO
                password_reset_tokens (id, user_id, token, expires_at, created_at)
            VALUES
                (?, ?, ?, ?, ?)
            RETURNING
                id,
                user_id,
                token,
                expires_at,
                used_at,
                created_at
        "#))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(generate_secure_token())
        .bind(now + Duration::hours(TOKEN_LIFETIME_HOURS))
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a valid (unused and not expired) token
    pub async fn find_valid_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, sqlx::Error> {
        sqlx::query_as::<_, PasswordResetToken>(&sql(r#"
            SELECT
                id,
                user_id,
                token,
                expires_at,
                used_at,
                created_at
            FROM
                password_reset_tokens
            WHERE
                token = ?
                AND used_at IS NULL
                AND expires_at > ?
        "#))
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    /// Marks every outstanding token of the user as used, including the one just redeemed.
    pub async fn invalidate_user_tokens(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&sql(r#"
            UPDATE password_reset_tokens
            SET
                used_at = ?
            WHERE
                user_id = ?
                AND used_at IS NULL
        "#))
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_alphanumeric_and_unique() {
        let first = generate_secure_token();
        let second = generate_secure_token();

        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
