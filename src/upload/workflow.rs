//! The upload state machine for one product form.
//!
//! Everything here is synchronous. Intake and removal commit a new selection
//! and then run the upload watcher, which may hand back an [`UploadTicket`].
//! The caller performs the network call and feeds the result back through
//! [`UploadWorkflow::finish_upload`]; a ticket issued before the last reset is
//! recognised and its result dropped.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::file::{SelectedFile, UploadedAsset};
use super::notify::{Notification, NotificationSink};
use super::preview::{PreviewHandle, PreviewPool};
use super::validation::{self, Rejection};
use super::{UPLOAD_FAILURE_MESSAGE, UPLOAD_SUCCESS_MESSAGE, UploadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeSource {
    Picker,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// The picker is disabled while editing or uploading; nothing was read.
    Ignored,
    /// The accepted files replaced the previous selection.
    Replaced { accepted: usize },
    /// A pick produced no acceptable file, so the selection was cleared.
    Cleared,
    /// A drop produced no acceptable file; the previous selection stays.
    Unchanged,
}

#[derive(Debug)]
pub struct IntakeReport {
    pub outcome: IntakeOutcome,
    pub rejections: Vec<Rejection>,
    pub upload: Option<UploadTicket>,
}

/// Permission to run one upload. Must be handed back to the workflow it came
/// from once the asset store has answered.
#[derive(Debug)]
pub struct UploadTicket {
    generation: u64,
    // Selection revision the files were taken from.
    revision: u64,
    files: Vec<SelectedFile>,
}

impl UploadTicket {
    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Applied { assets: usize },
    Failed,
    /// The form was reset while the request was in flight.
    Discarded,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no pending file at index {index} (selection holds {len})")]
    NoSuchFile { index: usize, len: usize },
}

/// The hidden `<input type=file>` behind the picker. Resetting it lets the
/// same file be chosen twice in a row.
#[derive(Debug, Default)]
pub struct FileInput {
    resets: u64,
}

impl FileInput {
    pub fn reset(&mut self) {
        self.resets += 1;
    }

    pub fn reset_count(&self) -> u64 {
        self.resets
    }
}

/// A selected file together with its thumbnail. Keeping them in one entry
/// means the two can never get out of step.
#[derive(Debug)]
struct PendingImage {
    file: SelectedFile,
    preview: PreviewHandle,
}

#[derive(Debug)]
pub struct UploadWorkflow {
    pool: PreviewPool,
    pending: Vec<PendingImage>,
    uploaded: Vec<UploadedAsset>,
    loading: bool,
    error: bool,
    edit_mode: bool,
    input: FileInput,
    // Bumped by every reset; tickets from older generations are stale.
    generation: u64,
    // Bumped on every committed selection change.
    revision: u64,
    // Last revision the upload watcher looked at.
    observed: u64,
}

impl Default for UploadWorkflow {
    fn default() -> Self {
        Self::new(PreviewPool::new())
    }
}

impl UploadWorkflow {
    pub fn new(pool: PreviewPool) -> Self {
        Self {
            pool,
            pending: Vec::new(),
            uploaded: Vec::new(),
            loading: false,
            error: false,
            edit_mode: false,
            input: FileInput::default(),
            generation: 0,
            revision: 0,
            observed: 0,
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &SelectedFile> {
        self.pending.iter().map(|p| &p.file)
    }

    pub fn previews(&self) -> impl Iterator<Item = &PreviewHandle> {
        self.pending.iter().map(|p| &p.preview)
    }

    pub fn file_count(&self) -> usize {
        self.pending.len()
    }

    pub fn uploaded(&self) -> &[UploadedAsset] {
        &self.uploaded
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn input(&self) -> &FileInput {
        &self.input
    }

    pub fn pool(&self) -> &PreviewPool {
        &self.pool
    }

    /// The picker is disabled while editing an existing product and while an
    /// upload is in flight.
    pub fn picker_enabled(&self) -> bool {
        !self.edit_mode && !self.loading
    }

    pub fn intake(
        &mut self,
        source: IntakeSource,
        candidates: Vec<SelectedFile>,
        sink: &dyn NotificationSink,
    ) -> IntakeReport {
        match source {
            IntakeSource::Picker => self.pick(candidates, sink),
            IntakeSource::Drop => self.drop_files(candidates, sink),
        }
    }

    /// Files chosen through the file picker.
    pub fn pick(&mut self, candidates: Vec<SelectedFile>, sink: &dyn NotificationSink) -> IntakeReport {
        if !self.picker_enabled() {
            debug!(edit_mode = self.edit_mode, loading = self.loading, "picker disabled, ignoring selection");
            return IntakeReport {
                outcome: IntakeOutcome::Ignored,
                rejections: Vec::new(),
                upload: None,
            };
        }

        let (accepted, rejections) = screen(candidates, sink);
        let outcome = if accepted.is_empty() {
            self.clear_selection();
            self.error = true;
            IntakeOutcome::Cleared
        } else {
            self.replace_selection(accepted)
        };
        self.input.reset();

        IntakeReport {
            outcome,
            rejections,
            upload: self.watch(),
        }
    }

    /// Files dropped onto the drop zone. Unlike a pick, a drop with nothing
    /// acceptable in it leaves the current selection alone.
    pub fn drop_files(
        &mut self,
        candidates: Vec<SelectedFile>,
        sink: &dyn NotificationSink,
    ) -> IntakeReport {
        let (accepted, rejections) = screen(candidates, sink);
        let outcome = if accepted.is_empty() {
            debug!(rejected = rejections.len(), "drop had no acceptable files, keeping selection");
            IntakeOutcome::Unchanged
        } else {
            self.replace_selection(accepted)
        };

        IntakeReport {
            outcome,
            rejections,
            upload: self.watch(),
        }
    }

    /// Removes one pending file and its preview. A non-empty remainder is a
    /// new selection and is uploaded again.
    pub fn remove_at(&mut self, index: usize) -> Result<Option<UploadTicket>, WorkflowError> {
        if index >= self.pending.len() {
            return Err(WorkflowError::NoSuchFile {
                index,
                len: self.pending.len(),
            });
        }

        let removed = self.pending.remove(index);
        debug!(file = removed.file.name(), index, "removed pending file");
        drop(removed);
        self.revision += 1;

        if self.pending.is_empty() {
            self.uploaded.clear();
            self.input.reset();
        }

        Ok(self.watch())
    }

    /// Clears files, previews, uploads and the loading flag. Any upload still
    /// in flight will have its result discarded.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.uploaded.clear();
        self.loading = false;
        self.error = false;
        self.generation += 1;
        self.observed = self.revision;
        self.input.reset();
        debug!(generation = self.generation, "upload workflow reset");
    }

    /// Resets into create mode.
    pub fn begin_create(&mut self) {
        self.reset();
        self.edit_mode = false;
    }

    /// Resets into edit mode, holding the product's already-hosted image as
    /// the uploaded asset. Nothing is uploaded.
    pub fn begin_edit(&mut self, existing: Option<UploadedAsset>) {
        self.reset();
        self.edit_mode = true;
        self.uploaded.extend(existing);
    }

    /// Applies the asset store's answer for `ticket`.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<Vec<UploadedAsset>, UploadError>,
        sink: &dyn NotificationSink,
    ) -> UploadOutcome {
        if ticket.generation != self.generation {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding upload result for a form that was reset"
            );
            return UploadOutcome::Discarded;
        }

        self.loading = false;
        match result {
            Ok(assets) => {
                let count = assets.len();
                info!(assets = count, "images uploaded");
                if ticket.revision != self.revision {
                    debug!(
                        assets = count,
                        pending = self.pending.len(),
                        "applied upload belongs to an earlier selection"
                    );
                }
                self.uploaded = assets;
                self.error = false;
                sink.notify(Notification::success(UPLOAD_SUCCESS_MESSAGE));
                UploadOutcome::Applied { assets: count }
            }
            Err(err) => {
                warn!(error = %err, "image upload failed");
                self.error = true;
                sink.notify(Notification::error(UPLOAD_FAILURE_MESSAGE));
                UploadOutcome::Failed
            }
        }
    }

    fn replace_selection(&mut self, accepted: Vec<SelectedFile>) -> IntakeOutcome {
        // Old previews are revoked before any new one is created.
        self.pending.clear();
        self.pending.extend(accepted.into_iter().map(|file| PendingImage {
            preview: self.pool.acquire(&file),
            file,
        }));
        self.error = false;
        self.revision += 1;

        IntakeOutcome::Replaced {
            accepted: self.pending.len(),
        }
    }

    fn clear_selection(&mut self) {
        self.pending.clear();
        self.uploaded.clear();
        self.revision += 1;
    }

    /// Runs after every committed selection change and starts an upload when
    /// the new selection is non-empty, the form creates a new product and no
    /// upload is already running.
    fn watch(&mut self) -> Option<UploadTicket> {
        if self.revision == self.observed {
            return None;
        }
        self.observed = self.revision;

        if self.pending.is_empty() || self.edit_mode {
            return None;
        }
        if self.loading {
            debug!("upload already in flight, not starting another");
            return None;
        }

        self.loading = true;
        Some(UploadTicket {
            generation: self.generation,
            revision: self.revision,
            files: self.files().cloned().collect(),
        })
    }
}

fn screen(
    candidates: Vec<SelectedFile>,
    sink: &dyn NotificationSink,
) -> (Vec<SelectedFile>, Vec<Rejection>) {
    validation::partition(candidates, |rejection| {
        warn!(%rejection, "file rejected");
        sink.notify(Notification::error(rejection.user_message()));
    })
}
