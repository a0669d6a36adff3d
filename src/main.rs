use tracing::{info, warn};

use usuarios::{
    app::{build_app, serve},
    config::AppConfig,
    errors::ServiceError,
    state::AppState,
    users::services::RegisterInput,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "usuarios=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let admin = config.admin.clone();
    let app_state = AppState::init(config).await?;

    if let Some(admin) = admin {
        if app_state.users.get_by_email(&admin.email).await?.is_some() {
            info!(email = %admin.email, "admin user already present");
        } else {
            let input = RegisterInput {
                email: Some(admin.email),
                username: Some(admin.username),
                dni: admin.dni,
                password: Some(admin.password),
            };
            match app_state.users.register_superuser(input).await {
                Ok(user) => info!(user_id = %user.id, "admin user created"),
                Err(ServiceError::Internal(e)) => return Err(e),
                Err(e) => warn!(error = %e, "admin bootstrap skipped"),
            }
        }
    }

    serve(build_app(app_state)).await
}
