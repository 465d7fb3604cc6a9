//! Assistant widget server
//!
//! Entry point: loads configuration and serves the host page plus the
//! widget API.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use assistant_widget::config::AppConfig;
use assistant_widget::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let config = Arc::new(AppConfig::load()?);

    server::start_server(config).await
}
