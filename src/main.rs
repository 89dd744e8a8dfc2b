use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vibedeck::api::{create_router, AppState};
use vibedeck::backend::{HttpBackend, VoiceBackend};
use vibedeck::config::Config;
use vibedeck::services::catalog::load_catalog;
use vibedeck::services::session::build_session;
use vibedeck::storage::LocalStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // Hydrate local state and wire the backend client
    let (store, _store_writer) = LocalStore::open(&config.data_dir).await?;
    let backend: Arc<dyn VoiceBackend> = Arc::new(HttpBackend::new(
        config.backend_url.clone(),
        config.backend_anon_key.clone(),
    ));

    let session = build_session(store, Arc::clone(&backend));
    let state = AppState::new(session, Arc::clone(&backend));

    // Load the catalog in the background; the deck reports Loading until
    // the fetch (or its sample fallback) resolves
    {
        let session = Arc::clone(&state.session);
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            let catalog = load_catalog(backend.as_ref()).await;
            session.write().await.install_catalog(catalog);
        });
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "vibedeck listening");
    axum::serve(listener, app).await?;

    Ok(())
}
