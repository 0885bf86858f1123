mod app;
mod auth;
mod catalog;
mod config;
mod error;
mod state;

use anyhow::Context;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "card_catalog=debug,axum=info,tower_http=info".to_string());
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

    // Refuse to start without a signing secret.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid configuration; refusing to start");
            return Err(e);
        }
    };
    tracing::info!(environment = %config.environment, token_lifetime = %config.jwt.expires_in, "configuration loaded");

    let (host, port) = (config.host.clone(), config.port);
    let app_state = AppState::init(config).await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("run database migrations")?;
    tracing::info!("database migrations applied");

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}
