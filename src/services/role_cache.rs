use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use crate::{
    database::{models::Role, repositories::RoleRepository},
    error::AppError,
};

const MAX_CACHED_ROLES: u64 = 1_000;

/// Read-through cache in front of the roles table.
///
/// Entries expire after the configured TTL; handlers that change a role call
/// [`RoleCache::invalidate`] so the next request sees the new permissions.
#[derive(Clone)]
pub struct RoleCache {
    repository: RoleRepository,
    roles: Cache<Uuid, Role>,
}

impl RoleCache {
    pub fn new(repository: RoleRepository, ttl_seconds: u64) -> Self {
        let roles = Cache::builder()
            .max_capacity(MAX_CACHED_ROLES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();

        Self { repository, roles }
    }

    /// Concurrent misses for the same role share a single load.
    pub async fn get(&self, role_id: Uuid) -> Result<Option<Role>, AppError> {
        let loaded = self
            .roles
            .try_get_with(role_id, async {
                log::debug!("Loading role {} into cache", role_id);
                self.repository
                    .find_by_id(role_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)
            })
            .await;

        match loaded {
            Ok(role) => Ok(Some(role)),
            Err(error) if matches!(*error, sqlx::Error::RowNotFound) => Ok(None),
            Err(error) => {
                log::error!("Failed to load role {}: {}", role_id, error);
                Err(AppError::internal_server_error())
            }
        }
    }

    pub async fn invalidate(&self, role_id: Uuid) {
        self.roles.invalidate(&role_id).await;
    }
}
