//! Product records and the in-memory catalog served by the admin API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::upload::AuthToken;

pub type ProductId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub image: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    pub sale_price: f64,
    pub total_stock: i64,
}

/// Body of a create or update request. On update, a missing image keeps the
/// product's current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    pub sale_price: f64,
    pub total_stock: i64,
}

#[derive(Clone, Default)]
pub struct ProductCatalog {
    products: Arc<RwLock<Vec<Product>>>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    pub async fn create(&self, draft: ProductDraft) -> Result<Product, ApiError> {
        let image = draft
            .image
            .ok_or_else(|| ApiError::BadRequest("product image is required".into()))?;

        let product = Product {
            id: Uuid::new_v4(),
            image,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            brand: draft.brand,
            price: draft.price,
            sale_price: draft.sale_price,
            total_stock: draft.total_stock,
        };
        self.products.write().await.push(product.clone());
        Ok(product)
    }

    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, ApiError> {
        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ApiError::NotFound)?;

        if let Some(image) = draft.image {
            product.image = image;
        }
        product.title = draft.title;
        product.description = draft.description;
        product.category = draft.category;
        product.brand = draft.brand;
        product.price = draft.price;
        product.sale_price = draft.sale_price;
        product.total_stock = draft.total_stock;

        Ok(product.clone())
    }

    pub async fn delete(&self, id: ProductId) -> Result<(), ApiError> {
        let mut products = self.products.write().await;
        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or(ApiError::NotFound)?;
        products.remove(index);
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("product API answered with status {0}")]
    Status(u16),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Client side of the admin product routes.
#[async_trait]
pub trait ProductApi: Send + Sync + 'static {
    async fn list(&self, token: &AuthToken) -> Result<Vec<Product>, ProductApiError>;
    async fn create(&self, draft: &ProductDraft, token: &AuthToken) -> Result<Product, ProductApiError>;
    async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
        token: &AuthToken,
    ) -> Result<Product, ProductApiError>;
    async fn delete(&self, id: ProductId, token: &AuthToken) -> Result<(), ProductApiError>;
}
