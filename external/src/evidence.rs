//! Evidence upload interface (media host).

use terra_types::PhotoUrl;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("image is empty")]
    EmptyImage,

    #[error("media host rejected upload: {0}")]
    Rejected(String),

    #[error("media host unavailable: {0}")]
    Unavailable(String),
}

/// Uploads raw proof images and returns where they can be viewed.
pub trait EvidenceUploader: Send + Sync {
    fn upload(&self, image: &[u8]) -> Result<PhotoUrl, UploadError>;
}
