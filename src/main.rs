mod app;
mod auth;
mod bookings;
mod config;
mod error;
mod secrets;
mod slots;
mod state;

use anyhow::Context;

use crate::config::AppConfig;
use crate::secrets::SecretsManagerResolver;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "slotbook=debug,axum=info,tower_http=info".to_string());
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

    // Secrets are resolved exactly once, before anything serves traffic.
    let resolver = SecretsManagerResolver::new().await;
    let config = AppConfig::load(&resolver)
        .await
        .context("load configuration")?;

    let state = AppState::init(config).await?;

    sqlx::migrate!("./migrations")
        .run(&state.db)
        .await
        .context("run database migrations")?;

    let app = app::build_app(state);
    app::serve(app).await
}
