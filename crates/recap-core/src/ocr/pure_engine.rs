//! Text recognizer backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use image::GenericImageView;
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::receipt::{ImageRef, RecognitionResult};
use crate::ports::TextRecognizer;

use super::{TextBox, reading_order_text};

/// Runs PaddleOCR detection and recognition models on stored receipt images.
///
/// Clones share one loaded engine.
#[derive(Clone)]
pub struct PureOcrRecognizer {
    engine: Arc<Mutex<pure_onnx_ocr::engine::OcrEngine>>,
    config: OcrConfig,
}

impl PureOcrRecognizer {
    /// Load the models named in the configuration from its model directory.
    pub fn from_config(config: OcrConfig) -> Result<Self, OcrError> {
        let det_path = config.model_dir.join(&config.detection_model);
        let rec_path = config.model_dir.join(&config.recognition_model);
        let dict_path = config.model_dir.join(&config.dictionary);

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            config,
        })
    }

    /// Decode the stored image and return its text in reading order.
    pub fn recognize_text(&self, image: &ImageRef) -> Result<String, OcrError> {
        let start = Instant::now();

        let decoded = image::open(image.as_path())
            .map_err(|e| OcrError::InvalidImage(format!("{}: {}", image, e)))?;
        let (width, height) = decoded.dimensions();

        info!("Processing image: {}x{}", width, height);

        let results = self
            .engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .run_from_image(&decoded)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
            })
            .collect();

        let count = boxes.len();
        let text = reading_order_text(boxes);

        info!(
            "OCR complete: {} text boxes in {}ms",
            count,
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

#[async_trait]
impl TextRecognizer for PureOcrRecognizer {
    async fn recognize(&self, image: &ImageRef) -> RecognitionResult {
        let engine = self.clone();
        let target = image.clone();
        run_blocking(image, move || engine.recognize_text(&target)).await
    }
}

/// Run a CPU-bound recognition job on the blocking pool.
async fn run_blocking<F>(image: &ImageRef, job: F) -> RecognitionResult
where
    F: FnOnce() -> Result<String, OcrError> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(text)) => RecognitionResult::success(text),
        Ok(Err(e)) => {
            warn!("OCR failed for {}: {}", image, e);
            RecognitionResult::failure(e.to_string())
        }
        Err(e) => {
            warn!("OCR task for {} did not finish: {}", image, e);
            RecognitionResult::failure(format!("recognition task failed: {}", e))
        }
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
///
/// Extracts the first 4 exterior points (quadrilateral) as
/// `[x1, y1, x2, y2, x3, y3, x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
