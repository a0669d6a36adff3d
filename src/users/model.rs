use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Argon2 PHC string stored in place of a password.
///
/// Only the password hasher and the stores (reading persisted rows) build
/// one, so a plaintext password cannot end up in a `NewUser` or `UserPatch`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub(crate) fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// Role flags carried on a user record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roles {
    pub staff: bool,
    pub admin: bool,
}

impl Roles {
    pub const SUPERUSER: Roles = Roles {
        staff: true,
        admin: true,
    };
}

/// User record as persisted. Deliberately not `Serialize`: see [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub dni: Option<String>,
    pub password: PasswordDigest,
    pub is_active: bool,
    pub roles: Roles,
    pub created_at: OffsetDateTime,
}

impl User {
    /// First word of the display name, or empty.
    pub fn first_name(&self) -> &str {
        self.username.split(' ').next().unwrap_or("")
    }
}

/// Row shape of the `users` table.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub dni: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            username: r.username,
            dni: r.dni,
            password: PasswordDigest::from_phc(r.password_hash),
            is_active: r.is_active,
            roles: Roles {
                staff: r.is_staff,
                admin: r.is_admin,
            },
            created_at: r.created_at,
        }
    }
}

/// Fields for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub dni: Option<String>,
    pub password: PasswordDigest,
}

/// Partial update. Email, dni and id are immutable and have no field here.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<PasswordDigest>,
    pub is_active: Option<bool>,
    pub roles: Option<Roles>,
}

/// Allow-list of user fields that may leave the service.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub dni: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            dni: u.dni.clone(),
        }
    }
}
