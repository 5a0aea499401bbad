// Resource Allocation - Web Server
// REST API with Axum over the allocation database

use anyhow::{Context, Result};
use resource_allocation::api::{router, AppState};
use resource_allocation::{logging, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    logging::init(&config.log_level);

    println!("🌐 Resource Allocation - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = resource_allocation::open(&config.db_path)?;
    println!("✓ Database opened: {:?}", config.db_path);

    let app = router(AppState::new(conn));

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server listening");
    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/resources/available", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
