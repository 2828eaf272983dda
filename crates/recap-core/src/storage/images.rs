//! Image store keeping receipt photos as files in one directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::AcquisitionError;
use crate::models::receipt::{ImageRef, ImageSource};
use crate::ports::ImageStore;

/// Stores images as `receipt_<timestamp>_<seq>.<ext>` under a directory.
#[derive(Debug)]
pub struct FsImageStore {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self, extension: &str) -> PathBuf {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        self.dir
            .join(format!("receipt_{}_{}.{}", stamp, seq, extension.to_lowercase()))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store(&self, source: &ImageSource) -> Result<ImageRef, AcquisitionError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AcquisitionError::StoreFailed(format!("{}: {}", self.dir.display(), e)))?;

        let destination = match source {
            ImageSource::File(path) => {
                if !path.is_file() {
                    return Err(AcquisitionError::Unreadable(path.display().to_string()));
                }
                let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
                let destination = self.next_path(extension);
                fs::copy(path, &destination)
                    .map_err(|e| AcquisitionError::StoreFailed(e.to_string()))?;
                destination
            }
            ImageSource::Bytes { data, extension } => {
                if data.is_empty() {
                    return Err(AcquisitionError::Unreadable("empty image data".to_string()));
                }
                let destination = self.next_path(extension);
                fs::write(&destination, data)
                    .map_err(|e| AcquisitionError::StoreFailed(e.to_string()))?;
                destination
            }
        };

        debug!("Stored image at {}", destination.display());
        Ok(ImageRef::from(destination))
    }

    fn release(&self, image: &ImageRef) {
        let path = image.as_path();
        if !path.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not delete image {}: {}", image, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("IMG_0001.JPG");
        fs::write(&source, b"jpeg bytes").unwrap();

        let store = FsImageStore::new(dir.path().join("receipts"));
        let image = store.store(&ImageSource::File(source.clone())).await.unwrap();

        assert!(image.as_path().starts_with(store.dir()));
        assert!(image.as_str().ends_with(".jpg"));
        assert_eq!(fs::read(image.as_path()).unwrap(), b"jpeg bytes");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());
        let source = ImageSource::Bytes {
            data: vec![1, 2, 3],
            extension: "png".to_string(),
        };

        let a = store.store(&source).await.unwrap();
        let b = store.store(&source).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_missing_source_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());

        let err = store
            .store(&ImageSource::File(dir.path().join("nope.jpg")))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::Unreadable(_)));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());
        let image = store
            .store(&ImageSource::Bytes {
                data: vec![0xff],
                extension: "jpg".to_string(),
            })
            .await
            .unwrap();

        store.release(&image);
        assert!(!image.as_path().exists());
        store.release(&image);
    }
}
