//! HTTP backend for the VideITO location-aware video browser.
//!
//! Searches are proxied to the YouTube Data API with coordinates taken from a
//! small place-name table. When the API is unusable the configured
//! [`FallbackPolicy`](server::youtube::FallbackPolicy) decides what the caller
//! gets instead. Sessions and comments live in swappable stores.

pub mod config;
pub mod error;
pub mod server;

use tracing_subscriber::EnvFilter;

use config::Config;
use error::ServerError;
use server::AppState;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run() -> Result<(), ServerError> {
    init_tracing();

    let config = Config::from_env()?;
    let state = AppState::new(config)?;
    server::start_server(state).await
}
