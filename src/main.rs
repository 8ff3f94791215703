use std::sync::Arc;

use shoploop::{
    catalog::ProductCatalog,
    config::{AppConfig, StorageKind},
    server::{self, ServerSettings},
    storage::{InMemoryStorage, LocalFileStorage, Storage},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let storage: Arc<dyn Storage> = match &config.storage {
        StorageKind::Memory => Arc::new(InMemoryStorage::new()),
        StorageKind::Local(path) => Arc::new(LocalFileStorage::new(path.clone())?),
    };

    let app = server::router(storage, ProductCatalog::new(), ServerSettings::from(&config));

    let addr = config.socket_addr()?;
    tracing::info!("Server running on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
