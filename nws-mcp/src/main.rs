//! Binary crate for the `nws-mcp` server.
//!
//! This crate focuses on:
//! - Declaring the five weather tools and their argument schemas
//! - Serving them over the MCP stdio transport
//! - Mapping lookup failures to tool-level errors

use rmcp::ServiceExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout belongs to the transport.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        tracing::error!("fatal: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    tracing::info!("starting weather.gov MCP server on stdio");

    let service = server::WeatherServer::new()
        .serve(rmcp::transport::stdio())
        .await?;
    service.waiting().await?;

    tracing::info!("server stopped");
    Ok(())
}
