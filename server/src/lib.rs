//! REST API for "resources" and the feedback attached to them.
//!
//! Both collections are plain JSON arrays on disk. Every request reloads the
//! relevant file, mutates it in memory and writes the whole array back.
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod server;
pub mod state;
pub mod validation;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = config::Config::load()?;

    info!(
        "Using stores {} and {}",
        config.resources_file.display(),
        config.feedback_file.display()
    );
    let app_state = state::AppState::from_config(&config)?;

    server::start_server(&config, app_state).await
}
