//! Type and size rules for product images.
//!
//! The same rules guard both the client-side intake and the server's upload
//! route, so a file the form accepts is never refused by the store for being
//! the wrong kind or too large.

use thiserror::Error;

use super::file::SelectedFile;

/// Reported MIME types accepted for product images. Matching is exact and
/// case-sensitive; `image/jpg` is kept alongside `image/jpeg` because some
/// environments report it.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// Largest accepted file, in bytes. A file of exactly this size is accepted.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

pub const INVALID_TYPE_MESSAGE: &str = "Invalid file type, only jpg, png & jpeg are allowed.";
pub const OVERSIZED_MESSAGE: &str = "File exceeds 5 MB limit.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("{name}: unsupported file type {mime}")]
    InvalidFileType { name: String, mime: String },
    #[error("{name}: {size} bytes exceeds the {max} byte limit", max = MAX_FILE_SIZE)]
    OversizedFile { name: String, size: u64 },
}

impl Rejection {
    /// Text shown to the user for this kind of violation.
    pub fn user_message(&self) -> &'static str {
        match self {
            Rejection::InvalidFileType { .. } => INVALID_TYPE_MESSAGE,
            Rejection::OversizedFile { .. } => OVERSIZED_MESSAGE,
        }
    }
}

pub fn is_allowed_type(mime: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&mime)
}

pub fn is_within_size_limit(size: u64) -> bool {
    size <= MAX_FILE_SIZE
}

/// Checks a single file's metadata. Type is checked first, so a file that
/// breaks both rules is reported as the wrong type.
pub fn check(name: &str, mime: &str, size: u64) -> Result<(), Rejection> {
    if !is_allowed_type(mime) {
        return Err(Rejection::InvalidFileType {
            name: name.to_string(),
            mime: mime.to_string(),
        });
    }
    if !is_within_size_limit(size) {
        return Err(Rejection::OversizedFile {
            name: name.to_string(),
            size,
        });
    }
    Ok(())
}

pub fn validate_file(file: &SelectedFile) -> Result<(), Rejection> {
    check(file.name(), file.mime(), file.size())
}

/// Splits a batch into the accepted files, in their original order, and one
/// rejection per refused file. `on_reject` runs as soon as each rejection is
/// found, before later files are looked at.
pub fn partition<F>(
    candidates: Vec<SelectedFile>,
    mut on_reject: F,
) -> (Vec<SelectedFile>, Vec<Rejection>)
where
    F: FnMut(&Rejection),
{
    let mut accepted = Vec::with_capacity(candidates.len());
    let mut rejections = Vec::new();

    for file in candidates {
        match validate_file(&file) {
            Ok(()) => accepted.push(file),
            Err(rejection) => {
                on_reject(&rejection);
                rejections.push(rejection);
            }
        }
    }

    (accepted, rejections)
}
