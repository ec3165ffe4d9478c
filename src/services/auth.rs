use std::{
    future::{Ready, ready},
    sync::LazyLock,
};

use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    database::{
        models::{
            AuthResponse, CreateUserInput, DEFAULT_ROLE, LoginInput, PasswordResetToken, Role,
            User,
        },
        repositories::{PasswordResetTokenRepository, RoleRepository, UserRepository},
    },
    error::AppError,
};

const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub role: Option<String>, // informational only; permissions are resolved per request
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )?;

    Ok(token_data.claims)
}

impl FromRequest for Claims {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(token) = bearer_token(req) else {
            return ready(Err(AppError::Unauthorized));
        };

        let Some(config) = req.app_data::<Data<Config>>() else {
            log::error!("Config missing from app data; cannot verify tokens");
            return ready(Err(AppError::internal_server_error()));
        };

        ready(decode_token(token, &config.jwt_secret))
    }
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid email address".to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    user_repository: UserRepository,
    role_repository: RoleRepository,
    password_reset_repository: PasswordResetTokenRepository,
    config: Config,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        user_repository: UserRepository,
        role_repository: RoleRepository,
        password_reset_repository: PasswordResetTokenRepository,
        config: Config,
    ) -> Self {
        Self {
            pool,
            user_repository,
            role_repository,
            password_reset_repository,
            config,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        Ok(hash(password, self.config.bcrypt_cost)?)
    }

    /// Self-registration. New accounts get the default `employee` role.
    pub async fn register(&self, input: CreateUserInput) -> Result<AuthResponse, AppError> {
        let email = input.email.trim().to_lowercase();
        let name = input.name.trim().to_string();

        validate_email(&email)?;
        validate_password(&input.password)?;
        if name.is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }

        if self.user_repository.email_exists(&email).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let role = self.role_repository.find_by_name(DEFAULT_ROLE).await?;
        if role.is_none() {
            log::warn!("Default role '{}' is missing; registering without a role", DEFAULT_ROLE);
        }

        let password_hash = self.hash_password(&input.password)?;
        let user = User::new(email, password_hash, name, role.as_ref().map(|r| r.id));

        let mut tx = self.pool.begin().await?;
        let user = self.user_repository.create_user(&mut tx, &user).await?;
        tx.commit().await?;

        log::info!("Registered user {} ({})", user.email, user.id);

        let token = self.generate_token(&user, role.as_ref())?;

        Ok(AuthResponse {
            token,
            user: user.into(),
            role: role.map(|r| r.name),
        })
    }

    pub async fn login(&self, input: LoginInput) -> Result<(AuthResponse, User), AppError> {
        let user = self
            .user_repository
            .find_by_email(input.email.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }

        let role = match user.role_id {
            Some(role_id) => self.role_repository.find_by_id(role_id).await?,
            None => None,
        };

        self.user_repository.touch_last_login(user.id).await?;

        let token = self.generate_token(&user, role.as_ref())?;

        Ok((
            AuthResponse {
                token,
                user: user.clone().into(),
                role: role.map(|r| r.name),
            },
            user,
        ))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode_token(token, &self.config.jwt_secret)
    }

    pub fn generate_token(&self, user: &User, role: Option<&Role>) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::days(self.config.jwt_expiration_days))
            .ok_or_else(|| AppError::internal_server_error_message("Invalid token expiration"))?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: role.map(|r| r.name.clone()),
            exp: expiration,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?;

        Ok(token)
    }

    /// Issues a reset token. Unknown emails yield `None` so callers can answer
    /// identically either way.
    pub async fn forgot_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, PasswordResetToken)>, AppError> {
        let Some(user) = self.user_repository.find_by_email(email.trim()).await? else {
            log::info!("Password reset requested for unknown email");
            return Ok(None);
        };

        let reset_token = self.password_reset_repository.create_token(user.id).await?;

        // Delivery is out of band; the link is logged for operators.
        log::info!(
            "Password reset link for {}: {}/auth/reset-password?token={}",
            user.email,
            self.config.client_base_url,
            reset_token.token
        );

        Ok(Some((user, reset_token)))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User, AppError> {
        validate_password(new_password)?;

        let reset_token = self
            .password_reset_repository
            .find_valid_token(token)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

        let user = self
            .user_repository
            .find_by_id(reset_token.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let password_hash = self.hash_password(new_password)?;

        let mut tx = self.pool.begin().await?;
        self.user_repository
            .update_password(&mut tx, user.id, &password_hash)
            .await?;
        self.password_reset_repository
            .invalidate_user_tokens(&mut tx, user.id)
            .await?;
        tx.commit().await?;

        Ok(user)
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if !verify(current_password, &user.password_hash)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(new_password)?;
        if current_password == new_password {
            return Err(AppError::BadRequest(
                "New password must differ from the current password".to_string(),
            ));
        }

        let password_hash = self.hash_password(new_password)?;

        let mut tx = self.pool.begin().await?;
        self.user_repository
            .update_password(&mut tx, user.id, &password_hash)
            .await?;
        self.password_reset_repository
            .invalidate_user_tokens(&mut tx, user.id)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        let config = Config::test_config();
        let pool = PgPool::connect_lazy(&config.database_url).unwrap();
        AuthService::new(
            pool.clone(),
            UserRepository::new(pool.clone()),
            RoleRepository::new(pool.clone()),
            PasswordResetTokenRepository::new(pool),
            config,
        )
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("  ada@example.com ").is_ok());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("ada example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("correct horse").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let service = service();
        let user = User::new(
            "ada@example.com".to_string(),
            "hash".to_string(),
            "Ada".to_string(),
            None,
        );

        let token = service.generate_token(&user, None).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.user_id(), user.id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, None);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let service = service();
        let user = User::new(
            "ada@example.com".to_string(),
            "hash".to_string(),
            "Ada".to_string(),
            None,
        );
        let token = service.generate_token(&user, None).unwrap();

        let result = decode_token(&token, "a-completely-different-secret");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_hash_password_uses_configured_cost() {
        let service = service();
        let hashed = service.hash_password("correct horse").unwrap();

        assert!(hashed.starts_with("$2b$04$"));
        assert!(verify("correct horse", &hashed).unwrap());
    }
}
