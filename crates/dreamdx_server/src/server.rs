//! Wiring the service from configuration and running the listener.

use crate::{DreamConfig, StorageBackend, create_router};
use axum::Router;
use dreamdx_error::{DreamResult, ServerError, ServerErrorKind};
use dreamdx_interface::{NarrativeDriver, NarrativeStore};
use dreamdx_models::OpenAICompatibleClient;
use dreamdx_narrative::{GenerationSettings, NarrativeService};
use dreamdx_storage::{InMemoryNarrativeStore, JsonFileNarrativeStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Store selected by the `[storage]` section.
///
/// # Errors
///
/// Returns an error if the JSON file cannot be opened.
pub async fn build_store(config: &DreamConfig) -> DreamResult<Arc<dyn NarrativeStore>> {
    Ok(match config.storage().backend() {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; narratives are lost on exit");
            Arc::new(InMemoryNarrativeStore::new())
        }
        StorageBackend::File => {
            Arc::new(JsonFileNarrativeStore::open(config.storage().resolve_path()).await?)
        }
    })
}

/// Generator client described by the `[generator]` section.
///
/// # Errors
///
/// Returns an error when no API key is available.
pub fn build_driver(config: &DreamConfig) -> DreamResult<Arc<dyn NarrativeDriver>> {
    let generator = config.generator();
    let client = OpenAICompatibleClient::new(
        generator.resolve_api_key()?,
        generator.model().clone(),
        generator.url().clone(),
        "openai",
        generator.timeout(),
    )?;
    Ok(Arc::new(client))
}

/// Service assembled from configuration.
///
/// # Errors
///
/// Propagates failures from [`build_driver`] and [`build_store`].
pub async fn build_service(config: &DreamConfig) -> DreamResult<NarrativeService> {
    let driver = build_driver(config)?;
    let store = build_store(config).await?;

    let mut settings = GenerationSettings::default();
    if let Some(max_tokens) = config.generator().max_tokens() {
        settings = settings.with_max_tokens(*max_tokens);
    }
    if let Some(temperature) = config.generator().temperature() {
        settings = settings.with_temperature(*temperature);
    }

    Ok(NarrativeService::new(driver, store)
        .with_settings(settings)
        .with_delete_mode(*config.storage().delete_mode()))
}

/// Serve `router` on `bind` until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
#[instrument(skip(router))]
pub async fn serve(bind: &str, router: Router) -> Result<(), ServerError> {
    let listener = TcpListener::bind(bind).await.map_err(|e| {
        ServerError::new(ServerErrorKind::Bind {
            address: bind.to_string(),
            message: e.to_string(),
        })
    })?;

    match listener.local_addr() {
        Ok(addr) => info!(address = %addr, "Narrative endpoint listening"),
        Err(e) => warn!(error = %e, "Listening on unknown address"),
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
        .map_err(|e| ServerError::new(ServerErrorKind::Serve(e.to_string())))?;

    info!("Narrative endpoint stopped");
    Ok(())
}

/// Build everything from configuration and serve.
///
/// # Errors
///
/// Returns configuration, storage and server failures.
pub async fn run(config: &DreamConfig) -> DreamResult<()> {
    let service = Arc::new(build_service(config).await?);
    info!(service = ?service, stage = %config.server().stage(), "Narrative service ready");

    let router = create_router(service, config.server().stage());
    serve(config.server().bind(), router).await?;
    Ok(())
}

/// Resolves once `signal` fires. A signal that cannot be installed never
/// resolves, so the server keeps running.
async fn shutdown_on(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        warn!(error = %e, "Failed to listen for Ctrl+C; serving until the process is killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_fires_shutdown() {
        let fired = tokio::time::timeout(Duration::from_millis(100), shutdown_on(async { Ok(()) }));
        assert!(fired.await.is_ok());
    }

    #[tokio::test]
    async fn test_broken_signal_keeps_serving() {
        let broken = async { Err(std::io::Error::other("no signal handler")) };
        let waited = tokio::time::timeout(Duration::from_millis(100), shutdown_on(broken));
        assert!(waited.await.is_err());
    }
}
