//! HTTP surface: the asset store and the admin product routes.

mod assets;
mod products;

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::catalog::ProductCatalog;
use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub auth_token: String,
    pub public_url: String,
    pub upload_body_limit: usize,
}

impl ServerSettings {
    fn file_url(&self, file_id: &str) -> String {
        format!("{}/file/{file_id}", self.public_url)
    }
}

impl From<&AppConfig> for ServerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            auth_token: config.auth_token.clone(),
            public_url: config.public_url.clone(),
            upload_body_limit: config.upload_body_limit,
        }
    }
}

pub fn router(storage: Arc<dyn Storage>, catalog: ProductCatalog, settings: ServerSettings) -> Router {
    let auth_token = settings.auth_token.clone();

    let admin = Router::new()
        .route(
            "/api/admin/products/upload-images",
            post(assets::upload_images).layer(DefaultBodyLimit::max(settings.upload_body_limit)),
        )
        .route("/files", get(assets::list_files))
        .route("/files/{file_id}", delete(assets::delete_file))
        .route("/api/admin/products/get", get(products::list))
        .route("/api/admin/products/add", post(products::create))
        .route("/api/admin/products/edit/{id}", put(products::update))
        .route("/api/admin/products/delete/{id}", delete(products::remove))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            let token = auth_token.clone();
            async move {
                let bearer = req.headers().typed_get::<Authorization<Bearer>>();

                match bearer {
                    Some(auth) if auth.token() == token => next.run(req).await,
                    _ => {
                        tracing::debug!(path = %req.uri().path(), "rejected request without valid bearer token");
                        ApiError::Unauthorized.into_response()
                    }
                }
            }
        }));

    Router::new()
        .route("/", get(health))
        .route("/file/{file_id}", get(assets::get_file))
        .merge(admin)
        .layer(Extension(storage))
        .layer(Extension(catalog))
        .layer(Extension(Arc::new(settings)))
}

async fn health() -> &'static str {
    "OK\nAPI Version: 1.0"
}
