use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use paperloop_jobs::JobService;

use crate::api;

pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub retention: Duration,
    pub cors_origins: Vec<String>,
}

pub async fn handle_serve_command(service: JobService, options: ServeOptions) -> Result<()> {
    use colored::Colorize;

    let service = Arc::new(service);
    let eviction = service.spawn_eviction(options.retention);
    let router = api::create_router(service.clone(), &options.cors_origins);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;

    info!(address = %addr, "API server listening");
    eprintln!();
    eprintln!(
        "  {} {}",
        "->".bright_green(),
        format!("Listening on http://{}", addr).bold()
    );
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    eviction.abort();
    result.context("API server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
