mod api;
mod app;
mod application;
mod config;
mod domain;
mod settings;
mod ui;
mod utils;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{ApiError, PostboxClient};
use crate::config::{AppConfig, ConfigError};

#[derive(Debug, Error)]
enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to set up HTTP client: {0}")]
    Client(#[from] ApiError),

    #[error("Window failed: {0}")]
    Ui(#[from] iced::Error),
}

fn main() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ing_postbox_downloader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        download_dir = %config.client.download_dir.display(),
        settings = %config.settings_file.display(),
        "Starting postbox downloader"
    );

    let client = PostboxClient::new(config.client.clone())?;

    iced::application(
        move || app::PostboxApp::new(&config, client.clone()),
        app::update,
        app::view,
    )
    .title("ING Postfach Downloader")
    .run()?;

    Ok(())
}
