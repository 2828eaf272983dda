//! Text recognizers.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrRecognizer;

use async_trait::async_trait;

use crate::models::receipt::{ImageRef, RecognitionResult};
use crate::ports::TextRecognizer;

/// A recognized text fragment with its quadrilateral bounding box.
#[derive(Debug, Clone)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],
    /// Recognized text content.
    pub text: String,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Sort boxes top-to-bottom, then left-to-right within a row, and join
/// their text with newlines.
pub fn reading_order_text(mut boxes: Vec<TextBox>) -> String {
    boxes.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();

        // Group by approximate vertical position (within 20 pixels)
        let row_a = (ay / 20.0) as i32;
        let row_b = (by / 20.0) as i32;

        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    boxes
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recognizer used when no OCR engine is available. Every attempt fails,
/// which sends the workflow to manual entry.
#[derive(Debug, Clone)]
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for UnavailableRecognizer {
    async fn recognize(&self, _image: &ImageRef) -> RecognitionResult {
        RecognitionResult::failure(self.reason.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
        }
    }

    #[test]
    fn test_reading_order() {
        let boxes = vec![
            text_box(10.0, 45.0, "Total: $45.67"),
            text_box(120.0, 2.0, "#0042"),
            text_box(10.0, 5.0, "Walmart"),
            text_box(10.0, 25.0, "03/15/2024"),
        ];

        assert_eq!(
            reading_order_text(boxes),
            "Walmart\n#0042\n03/15/2024\nTotal: $45.67"
        );
    }

    #[tokio::test]
    async fn test_unavailable_recognizer_fails() {
        let result = UnavailableRecognizer::new("OCR models not found")
            .recognize(&ImageRef::new("a.jpg"))
            .await;

        assert!(!result.succeeded);
        assert_eq!(result.failure_reason.as_deref(), Some("OCR models not found"));
    }
}
