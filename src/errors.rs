use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::users::repo::{StoreError, UniqueField};

pub const INVALID_CREDENTIALS: &str = "Credenciales inválidas.";

/// Failures raised by the authentication and registration services.
///
/// `Display` is the message shown to the client, so variants never carry
/// storage or framework detail except `Internal`, whose text is only logged.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{}", missing_field_message(.0))]
    MissingField(&'static str),
    #[error("El email no es válido.")]
    InvalidEmail,
    #[error("El email ya está registrado.")]
    DuplicateEmail,
    #[error("El DNI ya está registrado.")]
    DuplicateDni,
    #[error("Credenciales inválidas.")]
    InvalidCredentials,
    #[error("Usuario no encontrado.")]
    NotFound,
    #[error("Cuerpo de la petición inválido.")]
    InvalidBody,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn missing_field_message(field: &str) -> String {
    match field {
        "email" => "El email es obligatorio.".into(),
        "password" => "La contraseña es obligatoria.".into(),
        other => format!("El campo '{other}' es obligatorio."),
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniquenessViolation(UniqueField::Email) => ServiceError::DuplicateEmail,
            StoreError::UniquenessViolation(UniqueField::Dni) => ServiceError::DuplicateDni,
            StoreError::Database(e) => ServiceError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingField(_)
            | ServiceError::InvalidEmail
            | ServiceError::DuplicateEmail
            | ServiceError::DuplicateDni
            | ServiceError::InvalidBody => StatusCode::BAD_REQUEST,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServiceError::Internal(err) => {
                error!(error = ?err, "internal error");
                "Error interno del servidor.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
