use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod config;
mod error;
mod handlers;
mod models;
mod provider;
mod resolver;

use cache::ShortcutCache;
use provider::SheetsProvider;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    /// Shortcut table, refreshed from the sheet at most once per TTL.
    pub cache: ShortcutCache,
}

/// Every path and method goes to the redirect handler.
fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(handlers::redirect::redirect)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the variables may come from the environment.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetlinks=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env()?;
    if config.sheet_id.is_none() || config.sheet_name.is_none() {
        tracing::warn!("GOOGLE_SHEET_ID or SHEET_NAME not set; every request will fail until configured");
    }
    tracing::info!(
        "Shortcut cache TTL {:?}, provider timeout {:?}",
        config.cache_ttl,
        config.provider_timeout
    );

    let provider = SheetsProvider::new(
        config.sheets_api_base.clone(),
        config.sheet_id.clone(),
        config.sheet_name.clone(),
        config.auth.clone(),
        config.provider_timeout,
    )?;

    // Empty until the first request triggers a refresh.
    let cache = ShortcutCache::new(
        Arc::new(provider),
        config.cache_ttl,
        config.provider_timeout,
    );

    let state = Arc::new(AppState { cache });

    // ── Serve ──────────────────────────────────────────────────────────────
    let bind_addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Starting server at {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C so in-flight redirects can finish.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
