//! Nullable media host. Records uploads instead of sending them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use terra_external::{EvidenceUploader, UploadError};
use terra_types::PhotoUrl;

pub struct NullUploader {
    uploaded: Mutex<Vec<Vec<u8>>>,
    failing: AtomicBool,
}

impl NullUploader {
    pub fn new() -> Self {
        Self {
            uploaded: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// While set, every upload fails with [`UploadError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All images "uploaded" so far (for assertions).
    pub fn uploads(&self) -> Vec<Vec<u8>> {
        self.uploaded.lock().unwrap().clone()
    }
}

impl Default for NullUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceUploader for NullUploader {
    fn upload(&self, image: &[u8]) -> Result<PhotoUrl, UploadError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(UploadError::Unavailable("null media host offline".into()));
        }
        if image.is_empty() {
            return Err(UploadError::EmptyImage);
        }
        let mut uploaded = self.uploaded.lock().unwrap();
        uploaded.push(image.to_vec());
        PhotoUrl::new(format!("null://media/{}", uploaded.len()))
            .map_err(|e| UploadError::Rejected(e.to_string()))
    }
}
