use std::sync::Arc;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{jwt::TokenIssuer, password::PasswordHasher};
use crate::errors::ServiceError;
use crate::users::{model::PasswordDigest, repo::UserStore};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Runs the hasher's verify on the blocking pool.
pub(crate) async fn verify_blocking(
    hasher: &PasswordHasher,
    plain: String,
    digest: PasswordDigest,
) -> anyhow::Result<bool> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.verify(&plain, &digest))
        .await
        .context("verify task panicked")
}

/// Successful login result.
#[derive(Debug, Clone, Serialize)]
pub struct AuthBundle {
    pub user_id: Uuid,
    pub access: String,
    pub refresh: String,
    pub username: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Unknown email, wrong password and inactive account all fail with
    /// `InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthBundle, ServiceError> {
        let email = normalize_email(email);

        let Some(user) = self.store.get_by_email(&email).await? else {
            // same cost as a real check
            verify_blocking(&self.hasher, password.to_owned(), self.hasher.dummy_digest().clone())
                .await?;
            warn!(email = %email, "login unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        let ok = verify_blocking(&self.hasher, password.to_owned(), user.password.clone()).await?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login on inactive account");
            return Err(ServiceError::InvalidCredentials);
        }

        let pair = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthBundle {
            user_id: user.id,
            access: pair.access,
            refresh: pair.refresh,
            username: user.first_name().to_string(),
        })
    }
}
