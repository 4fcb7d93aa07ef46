//! librenms-mcp - bridge between MCP tool-calling clients and LibreNMS.
//!
//! Startup resolves credentials, connects to the LibreNMS API and verifies
//! it is reachable. Logs go to stderr; stdout belongs to the stdio transport.

use std::io;

use anyhow::{Context, Result};
use librenms_core::{ApiClient, Settings};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at the configured level.
/// `RUST_LOG` takes precedence when set.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env();
    init_tracing(settings.log_filter());
    info!(transport = %settings.transport, "librenms-mcp starting");

    let creds = settings.load_credentials();
    let url = creds.url.unwrap_or_default();
    let token = creds.token.unwrap_or_default();

    let client = ApiClient::connect(&url, &token)
        .await
        .with_context(|| format!("Failed to connect to LibreNMS at {:?}", url))?;

    info!(url = %client.base_url(), version = %client.version(), "LibreNMS API ready");

    client.close();
    info!("librenms-mcp shutting down");
    Ok(())
}
