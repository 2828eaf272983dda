//! Configuration structures for the capture pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::RecapError;

/// Main configuration for the recap pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecapConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Image and ledger storage configuration.
    pub storage: StorageConfig,
}

/// OCR model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Whether the detection and recognition models are present on disk.
    pub fn models_present(&self) -> bool {
        self.model_dir.join(&self.detection_model).exists()
            && self.model_dir.join(&self.recognition_model).exists()
            && self.model_dir.join(&self.dictionary).exists()
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum number of characters kept from the inferred vendor line.
    pub vendor_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            vendor_max_chars: 50,
        }
    }
}

/// Where images and records are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root data directory.
    pub data_dir: PathBuf,

    /// Subdirectory of `data_dir` holding stored receipt images.
    pub images_subdir: String,

    /// File name of the JSON ledger inside `data_dir`.
    pub ledger_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("recap-data"),
            images_subdir: "receipts".to_string(),
            ledger_file: "ledger.json".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join(&self.images_subdir)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }
}

impl RecapConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, RecapError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| RecapError::Config(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), RecapError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| RecapError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.ocr.model_dir.join(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RecapConfig =
            serde_json::from_str(r#"{"extraction": {"vendor_max_chars": 20}}"#).unwrap();

        assert_eq!(config.extraction.vendor_max_chars, 20);
        assert_eq!(config.ocr.detection_model, "det.onnx");
        assert_eq!(config.storage.images_subdir, "receipts");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RecapConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config.save(&path).unwrap();

        let loaded = RecapConfig::from_file(&path).unwrap();
        assert_eq!(loaded.storage.ledger_path(), dir.path().join("ledger.json"));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            RecapConfig::from_file(&path),
            Err(RecapError::Config(_))
        ));
    }
}
