use clap::Parser;

mod app;
mod auth;
mod chirps;
mod config;
mod error;
mod state;
mod store;
mod users;

use crate::{config::AppConfig, state::AppState};

#[derive(Debug, Parser)]
#[command(name = "chirpy", about = "Chirpy microblogging server")]
struct Cli {
    /// Wipe the JSON database before serving.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "chirpy=debug,axum=info,tower_http=info".to_string());
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
    let state = AppState::init(config).await?;

    if cli.debug {
        tracing::warn!(path = %state.store.path().display(), "debug mode: resetting database");
        state.store.reset().await?;
    }

    let config = state.config.clone();
    app::serve(app::build_app(state), &config).await
}
