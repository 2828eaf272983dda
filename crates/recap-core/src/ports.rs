//! Contracts for the collaborators the capture workflow drives.

use async_trait::async_trait;

use crate::error::{AcquisitionError, PersistenceError};
use crate::models::receipt::{
    FinishedReceipt, ImageRef, ImageSource, ReceiptId, RecognitionResult, VendorRef,
};

/// Durable storage for raw receipt images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and return a stable reference to it.
    async fn store(&self, source: &ImageSource) -> Result<ImageRef, AcquisitionError>;

    /// Delete a stored image. Idempotent and best-effort.
    fn release(&self, image: &ImageRef);
}

/// Opaque text recognition capability.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in a stored image. Failure is encoded in the result.
    async fn recognize(&self, image: &ImageRef) -> RecognitionResult;
}

#[async_trait]
impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    async fn recognize(&self, image: &ImageRef) -> RecognitionResult {
        (**self).recognize(image).await
    }
}

/// Receives finished records.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Look up a vendor by exact, case-sensitive name, creating it if absent.
    async fn find_or_create_vendor(&self, name: &str) -> Result<VendorRef, PersistenceError>;

    /// Store a finished receipt.
    async fn insert_receipt(&self, receipt: FinishedReceipt) -> Result<ReceiptId, PersistenceError>;
}
