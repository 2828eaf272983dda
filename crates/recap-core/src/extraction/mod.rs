//! Receipt field extraction module.

mod parser;
pub mod rules;

pub use parser::{ExtractionResult, ReceiptParser};

use crate::models::receipt::ExtractedFields;

/// Extract candidate fields from raw text with default settings.
pub fn extract(raw_text: &str) -> ExtractedFields {
    ReceiptParser::new().extract(raw_text)
}
