use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::services::AuthBundle;

/// Request body for login. Missing fields are treated as bad credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user_id: Uuid,
    pub username: String,
}

impl From<AuthBundle> for LoginResponse {
    fn from(b: AuthBundle) -> Self {
        Self {
            access: b.access,
            refresh: b.refresh,
            user_id: b.user_id,
            username: b.username,
        }
    }
}
