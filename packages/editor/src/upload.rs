//! # Image Upload Hook
//!
//! Dropping or pasting an image hands the bytes to a host-supplied
//! [`Uploader`]. The editor never waits for it: it remembers where the image
//! should land, keeps that spot up to date through every later transaction,
//! and inserts the image in a fresh transaction once the host reports the
//! URL.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::step::{Assoc, Mapping};

/// MIME types accepted unless configured otherwise
pub const DEFAULT_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("No uploader is configured")]
    NoUploader,

    #[error("Unsupported image type '{0}'")]
    UnsupportedType(String),

    #[error("Upload failed: {0}")]
    Failed(String),

    #[error("No pending upload with id {0}")]
    UnknownUpload(u64),
}

/// Binary image data from a drop or paste
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

pub type UploadFuture = Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send>>;

/// Host transport that stores an image and resolves to its URL
pub trait Uploader: Send + Sync {
    fn upload(&self, file: ImageFile) -> UploadFuture;
}

impl<F, Fut> Uploader for F
where
    F: Fn(ImageFile) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, UploadError>> + Send + 'static,
{
    fn upload(&self, file: ImageFile) -> UploadFuture {
        Box::pin(self(file))
    }
}

/// Handed to the host: await `future`, then report back with `id`
pub struct UploadTicket {
    pub id: u64,
    pub future: UploadFuture,
}

impl std::fmt::Debug for UploadTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTicket").field("id", &self.id).finish()
    }
}

/// An upload whose image has not been inserted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub id: u64,
    /// Where the image goes, in the current document
    pub anchor: usize,
    /// Used as the image's alt text
    pub file_name: String,
}

/// Uploads in flight for one editor
#[derive(Debug, Default)]
pub struct PendingUploads {
    next_id: u64,
    pending: HashMap<u64, PendingUpload>,
}

impl PendingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, anchor: usize, file_name: impl Into<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.pending.insert(
            id,
            PendingUpload {
                id,
                anchor,
                file_name: file_name.into(),
            },
        );
        id
    }

    /// Move every anchor through an applied transaction
    ///
    /// An anchor inside deleted content collapses to where the deletion was.
    pub fn map(&mut self, mapping: &Mapping) {
        for upload in self.pending.values_mut() {
            upload.anchor = mapping.map(upload.anchor, Assoc::Left);
        }
    }

    pub fn get(&self, id: u64) -> Option<&PendingUpload> {
        self.pending.get(&id)
    }

    pub fn take(&mut self, id: u64) -> Result<PendingUpload, UploadError> {
        self.pending.remove(&id).ok_or(UploadError::UnknownUpload(id))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Whether `mime_type` is in the allowed list
pub fn is_allowed_type(allowed: &[String], mime_type: &str) -> bool {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    allowed.iter().any(|t| t.eq_ignore_ascii_case(&mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepMap;

    #[test]
    fn test_anchor_follows_edits_before_it() {
        let mut uploads = PendingUploads::new();
        let id = uploads.register(5, "cat.png");

        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(1, 0, 3));
        uploads.map(&mapping);
        assert_eq!(uploads.get(id).map(|u| u.anchor), Some(8));

        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(20, 0, 3));
        uploads.map(&mapping);
        assert_eq!(uploads.get(id).map(|u| u.anchor), Some(8));
    }

    #[test]
    fn test_anchor_collapses_into_deleted_range() {
        let mut uploads = PendingUploads::new();
        let id = uploads.register(5, "cat.png");
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(2, 6, 0));
        uploads.map(&mapping);
        assert_eq!(uploads.take(id).unwrap().anchor, 2);
        assert_eq!(uploads.take(id), Err(UploadError::UnknownUpload(id)));
    }

    #[test]
    fn test_allowed_types() {
        let allowed: Vec<String> = DEFAULT_IMAGE_TYPES.iter().map(|s| s.to_string()).collect();
        assert!(is_allowed_type(&allowed, "image/PNG"));
        assert!(!is_allowed_type(&allowed, "image/svg+xml"));
    }

    #[tokio::test]
    async fn test_closure_uploader() {
        let uploader = |file: ImageFile| async move { Ok::<_, UploadError>(format!("https://cdn.example.com/{}", file.name)) };
        let url = uploader
            .upload(ImageFile::new("a.png", "image/png", vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/a.png");
    }
}
