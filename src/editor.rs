//! The admin "add / edit product" dialog: form fields, the image upload
//! workflow, and the calls that persist the result.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::{Product, ProductApi, ProductApiError, ProductId};
use crate::form::{self, FormError, ProductForm};
use crate::upload::{
    AssetStore, Credentials, Notification, NotificationSink, UploadSession, UploadedAsset,
};

pub const PRODUCT_ADDED_MESSAGE: &str = "Product added successfully!";
pub const PRODUCT_UPDATED_MESSAGE: &str = "Product updated successfully!";
pub const PRODUCT_DELETED_MESSAGE: &str = "Product deleted successfully!";
pub const PRODUCT_ADD_FAILED_MESSAGE: &str = "Error adding a product";
pub const PRODUCT_UPDATE_FAILED_MESSAGE: &str = "Error updating product";
pub const PRODUCT_DELETE_FAILED_MESSAGE: &str = "Error deleting product";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("the product dialog is not open")]
    NotOpen,
    #[error("the product form cannot be submitted yet")]
    NotSubmittable,
    #[error("no credentials available")]
    MissingCredentials,
    #[error(transparent)]
    InvalidForm(#[from] FormError),
    #[error(transparent)]
    Api(#[from] ProductApiError),
}

#[derive(Debug, Default)]
struct DialogState {
    open: bool,
    editing: Option<ProductId>,
    form: ProductForm,
}

pub struct ProductEditor {
    uploads: UploadSession,
    api: Arc<dyn ProductApi>,
    sink: Arc<dyn NotificationSink>,
    credentials: Arc<dyn Credentials>,
    dialog: Mutex<DialogState>,
}

impl ProductEditor {
    pub fn new(
        store: Arc<dyn AssetStore>,
        api: Arc<dyn ProductApi>,
        sink: Arc<dyn NotificationSink>,
        credentials: Arc<dyn Credentials>,
    ) -> Self {
        Self {
            uploads: UploadSession::new(store, Arc::clone(&sink), Arc::clone(&credentials)),
            api,
            sink,
            credentials,
            dialog: Mutex::new(DialogState::default()),
        }
    }

    /// The image upload workflow behind the dialog.
    pub fn uploads(&self) -> &UploadSession {
        &self.uploads
    }

    pub async fn is_open(&self) -> bool {
        self.dialog.lock().await.open
    }

    pub async fn editing(&self) -> Option<ProductId> {
        self.dialog.lock().await.editing
    }

    pub async fn form(&self) -> ProductForm {
        self.dialog.lock().await.form.clone()
    }

    pub async fn update_form<F>(&self, edit: F)
    where
        F: FnOnce(&mut ProductForm),
    {
        let mut dialog = self.dialog.lock().await;
        edit(&mut dialog.form);
    }

    pub async fn open_create(&self) {
        *self.dialog.lock().await = DialogState {
            open: true,
            ..DialogState::default()
        };
        self.uploads.begin_create().await;
    }

    /// Opens the dialog on an existing product. Its hosted image counts as
    /// already uploaded, so the form can be saved without a new one.
    pub async fn open_edit(&self, product: &Product) {
        *self.dialog.lock().await = DialogState {
            open: true,
            editing: Some(product.id),
            form: ProductForm::from_product(product),
        };
        self.uploads
            .begin_edit(Some(UploadedAsset::new(product.image.clone())))
            .await;
    }

    pub async fn close(&self) {
        *self.dialog.lock().await = DialogState::default();
        self.uploads.begin_create().await;
    }

    /// Whether the submit button is enabled. Disabled while an upload runs.
    pub async fn can_submit(&self) -> bool {
        let dialog = self.dialog.lock().await;
        if !dialog.open {
            return false;
        }
        let uploads = self.uploads.snapshot().await;
        !uploads.loading && form::can_submit(&dialog.form, &uploads.uploaded, uploads.edit_mode)
    }

    /// Creates or updates the product. On success the dialog is closed and
    /// reset; on failure everything is left as it was.
    pub async fn submit(&self) -> Result<Product, EditorError> {
        let (form, editing) = {
            let dialog = self.dialog.lock().await;
            if !dialog.open {
                return Err(EditorError::NotOpen);
            }
            (dialog.form.clone(), dialog.editing)
        };

        let uploads = self.uploads.snapshot().await;
        if uploads.loading || !form::can_submit(&form, &uploads.uploaded, uploads.edit_mode) {
            return Err(EditorError::NotSubmittable);
        }

        let token = self.credentials.bearer().ok_or(EditorError::MissingCredentials)?;
        let draft = form.to_draft(uploads.uploaded.first())?;

        let (result, done, failed) = match editing {
            Some(id) => (
                self.api.update(id, &draft, &token).await,
                PRODUCT_UPDATED_MESSAGE,
                PRODUCT_UPDATE_FAILED_MESSAGE,
            ),
            None => (
                self.api.create(&draft, &token).await,
                PRODUCT_ADDED_MESSAGE,
                PRODUCT_ADD_FAILED_MESSAGE,
            ),
        };

        match result {
            Ok(product) => {
                info!(id = %product.id, updated = editing.is_some(), "product saved");
                self.sink.notify(Notification::success(done));
                self.close().await;
                Ok(product)
            }
            Err(err) => {
                warn!(error = %err, "saving product failed");
                self.sink.notify(Notification::error(failed));
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, id: ProductId) -> Result<(), EditorError> {
        let token = self.credentials.bearer().ok_or(EditorError::MissingCredentials)?;

        match self.api.delete(id, &token).await {
            Ok(()) => {
                info!(%id, "product deleted");
                self.sink.notify(Notification::success(PRODUCT_DELETED_MESSAGE));
                Ok(())
            }
            Err(err) => {
                warn!(%id, error = %err, "deleting product failed");
                self.sink.notify(Notification::error(PRODUCT_DELETE_FAILED_MESSAGE));
                Err(err.into())
            }
        }
    }

    pub async fn refresh(&self) -> Result<Vec<Product>, EditorError> {
        let token = self.credentials.bearer().ok_or(EditorError::MissingCredentials)?;
        Ok(self.api.list(&token).await?)
    }
}

impl std::fmt::Debug for ProductEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductEditor")
            .field("uploads", &self.uploads)
            .finish_non_exhaustive()
    }
}
