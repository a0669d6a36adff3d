use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{instrument, warn};

use crate::{
    auth::dto::{LoginRequest, LoginResponse},
    errors::ServiceError,
    state::AppState,
    users::{services::RegisterInput, PublicUser},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login).fallback(method_not_allowed))
        .route("/register", post(register).fallback(method_not_allowed))
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({ "error": "Método no permitido." })),
    )
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        ServiceError::InvalidBody
    })
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let req = parse_body(payload)?;
    let (Some(email), Some(password)) = (req.email, req.password) else {
        warn!("login without email or password");
        return Err(ServiceError::InvalidCredentials);
    };

    let bundle = state.auth.authenticate(&email, &password).await?;
    Ok(Json(bundle.into()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), ServiceError> {
    let input = parse_body(payload)?;
    let user = state.users.register(input).await?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        auth_routes().with_state(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_then_login_scenario() {
        let app = app(AppState::fake());

        let res = send(
            &app,
            Method::POST,
            "/register",
            Some(json!({"email": "a@x.com", "username": "Ana", "dni": "123", "password": "secret"})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = json_body(res).await;
        assert_eq!(created["email"], "a@x.com");
        assert_eq!(created["username"], "Ana");
        assert_eq!(created["dni"], "123");
        assert!(created.get("password").is_none());
        let id = created["id"].as_str().unwrap().to_string();

        let res = send(
            &app,
            Method::POST,
            "/login",
            Some(json!({"email": "a@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await, json!({"error": "Credenciales inválidas."}));

        let res = send(
            &app,
            Method::POST,
            "/login",
            Some(json!({"email": "a@x.com", "password": "secret"})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert!(body["access"].as_str().is_some_and(|t| !t.is_empty()));
        assert!(body["refresh"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user_id"], id.as_str());
        assert_eq!(body["username"], "Ana");
    }

    #[tokio::test]
    async fn unknown_email_gets_same_401_body() {
        let app = app(AppState::fake());
        let res = send(
            &app,
            Method::POST,
            "/login",
            Some(json!({"email": "noexiste@example.com", "password": "password123"})),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await, json!({"error": "Credenciales inválidas."}));
    }

    #[tokio::test]
    async fn login_without_fields_is_401() {
        let app = app(AppState::fake());
        let res = send(&app, Method::POST, "/login", Some(json!({}))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["error"], "Credenciales inválidas.");
    }

    #[tokio::test]
    async fn register_never_echoes_password() {
        let app = app(AppState::fake());
        let res = send(
            &app,
            Method::POST,
            "/register",
            Some(json!({
                "email": "checkpass@example.com",
                "username": "Check Pass",
                "dni": "14141414N",
                "password": "mypassword123",
                "password_hash": "sneaky",
                "is_admin": true
            })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = json_body(res).await;
        let obj = body.as_object().unwrap();
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!body.to_string().contains("mypassword123"));
    }

    #[tokio::test]
    async fn register_failures_are_400_with_error() {
        let app = app(AppState::fake());
        let first = json!({"email": "duplicate@example.com", "username": "User", "dni": "10101010J", "password": "password123"});
        assert_eq!(
            send(&app, Method::POST, "/register", Some(first)).await.status(),
            StatusCode::CREATED
        );

        let cases = [
            json!({"email": "duplicate@example.com", "username": "Another", "dni": "11111112K", "password": "password456"}),
            json!({"email": "other@example.com", "username": "Same Dni", "dni": "10101010J", "password": "password456"}),
            json!({"username": "No Email", "dni": "12121212L", "password": "password123"}),
            json!({"email": "nopass@example.com", "username": "No Password", "dni": "13131313M"}),
        ];
        for case in cases {
            let res = send(&app, Method::POST, "/register", Some(case)).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            assert!(json_body(res).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = app(AppState::fake());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_post_methods_are_405() {
        let app = app(AppState::fake());
        for uri in ["/login", "/register"] {
            for method in [Method::GET, Method::PUT, Method::DELETE] {
                let res = send(&app, method, uri, None).await;
                assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(res.headers()[header::ALLOW], "POST");
            }
        }
    }
}
