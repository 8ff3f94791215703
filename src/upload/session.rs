use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::error;

use super::file::{SelectedFile, UploadedAsset};
use super::notify::NotificationSink;
use super::validation::Rejection;
use super::workflow::{IntakeOutcome, UploadOutcome, UploadTicket, UploadWorkflow, WorkflowError};
use super::{AssetStore, Credentials, UploadError};

/// An upload running in the background.
#[derive(Debug)]
pub struct PendingUpload(JoinHandle<UploadOutcome>);

impl PendingUpload {
    /// Waits until the result has been applied (or discarded).
    pub async fn finished(self) -> UploadOutcome {
        match self.0.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "upload task did not complete");
                UploadOutcome::Failed
            }
        }
    }
}

#[derive(Debug)]
pub struct SessionIntake {
    pub outcome: IntakeOutcome,
    pub rejections: Vec<Rejection>,
    pub upload: Option<PendingUpload>,
}

/// Read-only view of the workflow for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub file_names: Vec<String>,
    pub preview_urls: Vec<String>,
    pub uploaded: Vec<UploadedAsset>,
    pub loading: bool,
    pub error: bool,
    pub edit_mode: bool,
    pub picker_enabled: bool,
    pub input_resets: u64,
}

/// Shared handle to one form's upload workflow. Intake returns as soon as the
/// selection is committed; a triggered upload runs on its own task and
/// applies its result when the asset store answers.
#[derive(Clone)]
pub struct UploadSession {
    workflow: Arc<Mutex<UploadWorkflow>>,
    store: Arc<dyn AssetStore>,
    sink: Arc<dyn NotificationSink>,
    credentials: Arc<dyn Credentials>,
}

impl UploadSession {
    pub fn new(
        store: Arc<dyn AssetStore>,
        sink: Arc<dyn NotificationSink>,
        credentials: Arc<dyn Credentials>,
    ) -> Self {
        Self::with_workflow(UploadWorkflow::default(), store, sink, credentials)
    }

    pub fn with_workflow(
        workflow: UploadWorkflow,
        store: Arc<dyn AssetStore>,
        sink: Arc<dyn NotificationSink>,
        credentials: Arc<dyn Credentials>,
    ) -> Self {
        Self {
            workflow: Arc::new(Mutex::new(workflow)),
            store,
            sink,
            credentials,
        }
    }

    pub async fn pick(&self, files: Vec<SelectedFile>) -> SessionIntake {
        let report = self.workflow.lock().await.pick(files, self.sink.as_ref());
        SessionIntake {
            outcome: report.outcome,
            rejections: report.rejections,
            upload: report.upload.map(|ticket| self.spawn(ticket)),
        }
    }

    pub async fn drop_files(&self, files: Vec<SelectedFile>) -> SessionIntake {
        let report = self.workflow.lock().await.drop_files(files, self.sink.as_ref());
        SessionIntake {
            outcome: report.outcome,
            rejections: report.rejections,
            upload: report.upload.map(|ticket| self.spawn(ticket)),
        }
    }

    pub async fn remove_at(&self, index: usize) -> Result<Option<PendingUpload>, WorkflowError> {
        let ticket = self.workflow.lock().await.remove_at(index)?;
        Ok(ticket.map(|ticket| self.spawn(ticket)))
    }

    pub async fn reset(&self) {
        self.workflow.lock().await.reset();
    }

    pub async fn begin_create(&self) {
        self.workflow.lock().await.begin_create();
    }

    pub async fn begin_edit(&self, existing: Option<UploadedAsset>) {
        self.workflow.lock().await.begin_edit(existing);
    }

    pub async fn snapshot(&self) -> UploadSnapshot {
        let wf = self.workflow.lock().await;
        UploadSnapshot {
            file_names: wf.files().map(|f| f.name().to_string()).collect(),
            preview_urls: wf.previews().map(|p| p.url()).collect(),
            uploaded: wf.uploaded().to_vec(),
            loading: wf.is_loading(),
            error: wf.has_error(),
            edit_mode: wf.is_edit_mode(),
            picker_enabled: wf.picker_enabled(),
            input_resets: wf.input().reset_count(),
        }
    }

    /// Number of preview handles currently alive for this form.
    pub async fn live_previews(&self) -> usize {
        self.workflow.lock().await.pool().live_count()
    }

    fn spawn(&self, ticket: UploadTicket) -> PendingUpload {
        let session = self.clone();
        PendingUpload(tokio::spawn(async move { session.run(ticket).await }))
    }

    /// The store call runs on its own task so that a panic inside it still
    /// reaches `finish_upload` as a failed attempt.
    async fn run(&self, ticket: UploadTicket) -> UploadOutcome {
        let result = match self.credentials.bearer() {
            Some(token) => {
                let store = Arc::clone(&self.store);
                let files = ticket.files().to_vec();
                tokio::spawn(async move { store.upload(&files, &token).await })
                    .await
                    .unwrap_or_else(|err| {
                        error!(error = %err, "asset store task did not complete");
                        Err(UploadError::Transport(err.to_string()))
                    })
            }
            None => Err(UploadError::MissingCredentials),
        };

        self.workflow
            .lock()
            .await
            .finish_upload(ticket, result, self.sink.as_ref())
    }
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use crate::upload::{AuthToken, UPLOAD_FAILURE_MESSAGE, UPLOAD_SUCCESS_MESSAGE};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetStore for CountingStore {
        async fn upload(
            &self,
            files: &[SelectedFile],
            token: &AuthToken,
        ) -> Result<Vec<UploadedAsset>, UploadError> {
            assert_eq!(token.as_str(), "secret");
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(files
                .iter()
                .map(|f| UploadedAsset::new(format!("https://cdn/{}", f.name())))
                .collect())
        }
    }

    struct PanickingStore;

    #[async_trait]
    impl AssetStore for PanickingStore {
        async fn upload(
            &self,
            _files: &[SelectedFile],
            _token: &AuthToken,
        ) -> Result<Vec<UploadedAsset>, UploadError> {
            panic!("asset store blew up");
        }
    }

    struct NoCredentials;

    impl Credentials for NoCredentials {
        fn bearer(&self) -> Option<AuthToken> {
            None
        }
    }

    fn png(name: &str) -> SelectedFile {
        SelectedFile::new(name, "image/png", vec![7u8; 32])
    }

    #[tokio::test]
    async fn pick_uploads_in_background_and_applies_result() {
        let store = Arc::new(CountingStore::default());
        let sink = Arc::new(RecordingSink::default());
        let session = UploadSession::new(store.clone(), sink.clone(), Arc::new(AuthToken::new("secret")));

        let intake = session.pick(vec![png("a.png")]).await;
        let outcome = intake.upload.expect("upload started").finished().await;

        assert_eq!(outcome, UploadOutcome::Applied { assets: 1 });
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        let snap = session.snapshot().await;
        assert_eq!(snap.uploaded, vec![UploadedAsset::new("https://cdn/a.png")]);
        assert!(!snap.loading);
        assert_eq!(snap.file_names.len(), snap.preview_urls.len());
        assert_eq!(sink.messages(), [UPLOAD_SUCCESS_MESSAGE]);
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_attempt() {
        let store = Arc::new(CountingStore::default());
        let sink = Arc::new(RecordingSink::default());
        let session = UploadSession::new(store.clone(), sink.clone(), Arc::new(NoCredentials));

        let outcome = session.pick(vec![png("a.png")]).await.upload.unwrap().finished().await;

        assert_eq!(outcome, UploadOutcome::Failed);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert!(session.snapshot().await.error);
        assert_eq!(sink.messages(), [UPLOAD_FAILURE_MESSAGE]);
    }

    #[tokio::test]
    async fn crashed_store_call_clears_loading_and_notifies() {
        let sink = Arc::new(RecordingSink::default());
        let session = UploadSession::new(
            Arc::new(PanickingStore),
            sink.clone(),
            Arc::new(AuthToken::new("secret")),
        );

        let outcome = session.pick(vec![png("a.png")]).await.upload.unwrap().finished().await;

        assert_eq!(outcome, UploadOutcome::Failed);
        let snap = session.snapshot().await;
        assert!(!snap.loading);
        assert!(snap.picker_enabled);
        assert!(snap.error);
        assert_eq!(snap.file_names, ["a.png"]);
        assert_eq!(sink.messages(), [UPLOAD_FAILURE_MESSAGE]);

        let retry = session.pick(vec![png("b.png")]).await;
        assert_eq!(retry.outcome, IntakeOutcome::Replaced { accepted: 1 });
        assert!(retry.upload.is_some());
    }

    #[tokio::test]
    async fn reset_and_edit_release_previews() {
        let store = Arc::new(CountingStore::default());
        let sink = Arc::new(RecordingSink::default());
        let session = UploadSession::new(store, sink, Arc::new(AuthToken::new("secret")));

        session.pick(vec![png("a.png"), png("b.png")]).await.upload.unwrap().finished().await;
        assert_eq!(session.live_previews().await, 2);

        session.begin_edit(Some(UploadedAsset::new("https://cdn/old.png"))).await;
        let snap = session.snapshot().await;
        assert_eq!(session.live_previews().await, 0);
        assert!(snap.edit_mode);
        assert!(!snap.picker_enabled);
        assert_eq!(snap.uploaded, vec![UploadedAsset::new("https://cdn/old.png")]);
    }
}
