use courtmatch::{app, config::AppConfig, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loads the dotenv file too, so RUST_LOG / LOG_FORMAT may come from it.
    let config = AppConfig::from_env()?;

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "courtmatch=debug,axum=info,tower_http=info".to_string());
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

    tracing::info!(env = %config.env, "configuration loaded");
    let addr = config.bind_addr();

    let app_state = AppState::init(config).await?;
    db::migrate(&app_state.db).await?;

    app::serve(app::build_app(app_state), &addr).await
}
