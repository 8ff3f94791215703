//! Client-side product image upload: intake, validation, automatic upload
//! and the state the product form gates on.

mod file;
mod notify;
mod preview;
mod session;
pub mod validation;
mod workflow;

pub use file::{SelectedFile, UploadedAsset};
pub use notify::{ChannelSink, Notification, NotificationSink, Severity};
pub use preview::{PreviewHandle, PreviewPool};
pub use session::{PendingUpload, SessionIntake, UploadSession, UploadSnapshot};
pub use validation::Rejection;
pub use workflow::{
    FileInput, IntakeOutcome, IntakeReport, IntakeSource, UploadOutcome, UploadTicket,
    UploadWorkflow, WorkflowError,
};

use async_trait::async_trait;
use thiserror::Error;

pub const UPLOAD_SUCCESS_MESSAGE: &str = "Image(s) loaded successfully";
pub const UPLOAD_FAILURE_MESSAGE: &str = "Error uploading image";

/// Failure of a single upload attempt. Every variant is handled the same way:
/// the attempt is reported and abandoned, earlier uploads are kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("asset store answered with status {0}")]
    Status(u16),
    #[error("malformed asset store response: {0}")]
    MalformedResponse(String),
    #[error("no credentials available for upload")]
    MissingCredentials,
}

/// Bearer credential for the admin API.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Supplies the current session's credential. The workflow never reads it
/// from ambient storage itself.
pub trait Credentials: Send + Sync {
    fn bearer(&self) -> Option<AuthToken>;
}

impl Credentials for AuthToken {
    fn bearer(&self) -> Option<AuthToken> {
        Some(self.clone())
    }
}

/// Remote service that hosts uploaded images.
#[async_trait]
pub trait AssetStore: Send + Sync + 'static {
    /// Uploads the whole batch in one request and returns one hosted
    /// reference per file.
    async fn upload(
        &self,
        files: &[SelectedFile],
        token: &AuthToken,
    ) -> Result<Vec<UploadedAsset>, UploadError>;
}
