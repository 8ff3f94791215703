use axum::{
    Json,
    extract::{Extension, Path},
};
use tracing::info;

use crate::catalog::{Product, ProductCatalog, ProductDraft, ProductId};
use crate::errors::ApiError;
use crate::wire::Envelope;

pub(super) async fn list(Extension(catalog): Extension<ProductCatalog>) -> Json<Envelope<Vec<Product>>> {
    Json(Envelope::ok(catalog.list().await))
}

pub(super) async fn create(
    Extension(catalog): Extension<ProductCatalog>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Envelope<Product>>, ApiError> {
    let product = catalog.create(draft).await?;
    info!(id = %product.id, title = %product.title, "product created");
    Ok(Json(Envelope::ok(product)))
}

pub(super) async fn update(
    Path(id): Path<ProductId>,
    Extension(catalog): Extension<ProductCatalog>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Envelope<Product>>, ApiError> {
    let product = catalog.update(id, draft).await?;
    info!(%id, "product updated");
    Ok(Json(Envelope::ok(product)))
}

pub(super) async fn remove(
    Path(id): Path<ProductId>,
    Extension(catalog): Extension<ProductCatalog>,
) -> Result<Json<Envelope<()>>, ApiError> {
    catalog.delete(id).await?;
    info!(%id, "product deleted");
    Ok(Json(Envelope::done()))
}
