use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{NewUser, User, UserPatch};
use super::repo::{StoreError, UniqueField, UserStore};

/// Process-local store. Uniqueness checks and inserts happen under one
/// write lock, so concurrent creates cannot both pass the check.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().await.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::UniquenessViolation(UniqueField::Email));
        }
        if new.dni.is_some() && users.iter().any(|u| u.dni == new.dni) {
            return Err(StoreError::UniquenessViolation(UniqueField::Dni));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            username: new.username,
            dni: new.dni,
            password: new.password,
            is_active: true,
            roles: Default::default(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(password) = patch.password {
            user.password = password;
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        if let Some(roles) = patch.roles {
            user.roles = roles;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::users::model::{PasswordDigest, Roles};

    fn digest() -> PasswordDigest {
        PasswordDigest::from_phc("$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".into())
    }

    fn new_user(email: &str, dni: Option<&str>) -> NewUser {
        NewUser {
            email: email.into(),
            username: "User One".into(),
            dni: dni.map(Into::into),
            password: digest(),
        }
    }

    #[tokio::test]
    async fn create_list_and_get() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("user1@example.com", Some("11111111A"))).await.unwrap();
        store.create(new_user("user2@example.com", Some("22222222B"))).await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 2);
        let found = store.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(found.email, "user1@example.com");
        assert!(found.is_active);
        assert_eq!(found.roles, Roles::default());
        assert!(store.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_duplicate_email_and_dni() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com", Some("123"))).await.unwrap();

        let err = store.create(new_user("a@x.com", Some("999"))).await.unwrap_err();
        assert!(matches!(err, StoreError::UniquenessViolation(UniqueField::Email)));

        let err = store.create(new_user("b@x.com", Some("123"))).await.unwrap_err();
        assert!(matches!(err, StoreError::UniquenessViolation(UniqueField::Dni)));

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn absent_dni_never_collides() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com", None)).await.unwrap();
        store.create(new_user("b@x.com", None)).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_is_partial() {
        let store = MemoryUserStore::new();
        let u = store.create(new_user("a@x.com", Some("123"))).await.unwrap();

        let patch = UserPatch {
            username: Some("User One Updated".into()),
            ..Default::default()
        };
        let updated = store.update(u.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.username, "User One Updated");
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.password, u.password);

        let missing = store.update(Uuid::new_v4(), UserPatch::default()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryUserStore::new();
        let u = store.create(new_user("a@x.com", None)).await.unwrap();
        assert!(store.delete(u.id).await.unwrap());
        assert!(store.get_by_id(u.id).await.unwrap().is_none());
        assert!(!store.delete(u.id).await.unwrap());
        assert!(!store.delete(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_email_admit_one() {
        let store = Arc::new(MemoryUserStore::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create(new_user("race@x.com", Some(&format!("dni-{i}"))))
                    .await
            }));
        }
        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, StoreError::UniquenessViolation(UniqueField::Email))),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
