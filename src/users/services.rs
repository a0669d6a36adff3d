use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    password::PasswordHasher,
    services::{is_valid_email, normalize_email},
};
use crate::errors::ServiceError;

use super::model::{NewUser, PasswordDigest, Roles, User, UserPatch};
use super::repo::UserStore;

/// Registration fields as received; any of them may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub dni: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Changes accepted by [`UserService::update`]. A new password is hashed
/// before it reaches the store.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub roles: Option<Roles>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ServiceError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ServiceError::MissingField(field)),
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    async fn hash_blocking(&self, plain: String) -> Result<PasswordDigest, ServiceError> {
        let hasher = self.hasher.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("hash task panicked")??;
        Ok(digest)
    }

    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<User, ServiceError> {
        let email = required(input.email, "email")?;
        let password = required(input.password, "password")?;

        let email = normalize_email(&email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(ServiceError::InvalidEmail);
        }

        if self.store.get_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(ServiceError::DuplicateEmail);
        }

        let digest = self.hash_blocking(password).await?;

        let new = NewUser {
            email,
            username: input.username.map(|u| u.trim().to_string()).unwrap_or_default(),
            dni: input
                .dni
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            password: digest,
        };
        let user = self.store.create(new).await.map_err(|e| {
            let err = ServiceError::from(e);
            warn!(error = %err, "user insert rejected");
            err
        })?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Registers a user and grants the staff and admin roles.
    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn register_superuser(&self, input: RegisterInput) -> Result<User, ServiceError> {
        let user = self.register(input).await?;
        let patch = UserPatch {
            roles: Some(Roles::SUPERUSER),
            ..Default::default()
        };
        let user = self
            .store
            .update(user.id, patch)
            .await?
            .ok_or(ServiceError::NotFound)?;
        info!(user_id = %user.id, "superuser created");
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.store.get_by_email(&normalize_email(email)).await?)
    }

    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.list().await?)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<Option<User>, ServiceError> {
        let password = match changes.password {
            Some(plain) if !plain.is_empty() => Some(self.hash_blocking(plain).await?),
            Some(_) => return Err(ServiceError::MissingField("password")),
            None => None,
        };
        let patch = UserPatch {
            username: changes.username,
            password,
            is_active: changes.is_active,
            roles: changes.roles,
        };
        let user = self.store.update(id, patch).await?;
        if let Some(u) = &user {
            info!(user_id = %u.id, "user updated");
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let removed = self.store.delete(id).await?;
        if removed {
            info!(user_id = %id, "user deleted");
        }
        Ok(removed)
    }
}
