//! Receipt parser combining the rule-based field extractors.

use std::time::Instant;

use tracing::{debug, info};

use crate::models::config::ExtractionConfig;
use crate::models::receipt::ExtractedFields;

use super::rules::{
    AmountExtractor, CardExtractor, DateExtractor, FieldExtractor, VendorExtractor,
    DEFAULT_VENDOR_MAX_CHARS,
};

/// Result of one extraction pass with diagnostics.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted candidate fields.
    pub fields: ExtractedFields,
    /// One entry per field that could not be found.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Turns recognized receipt text into candidate fields.
///
/// Never fails: every field is best-effort and absence is represented as
/// `None`.
#[derive(Debug, Clone)]
pub struct ReceiptParser {
    vendor_max_chars: usize,
}

impl ReceiptParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self {
            vendor_max_chars: DEFAULT_VENDOR_MAX_CHARS,
        }
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new().with_vendor_max_chars(config.vendor_max_chars)
    }

    /// Set how many characters of the vendor line are kept.
    pub fn with_vendor_max_chars(mut self, max_chars: usize) -> Self {
        self.vendor_max_chars = max_chars;
        self
    }

    /// Extract candidate fields from raw recognized text.
    pub fn extract(&self, raw_text: &str) -> ExtractedFields {
        let vendor = VendorExtractor::new()
            .with_max_chars(self.vendor_max_chars)
            .extract(raw_text);
        let date = DateExtractor::new().extract(raw_text);
        let amount = AmountExtractor::new().extract(raw_text);
        let card = CardExtractor::new().extract(raw_text);

        if let Some(m) = &date {
            debug!("Date {} from rule {} ({:?})", m.value, m.rule, m.source);
        }
        if let Some(m) = &amount {
            debug!("Amount {} from rule {} ({:?})", m.value, m.rule, m.source);
        }

        ExtractedFields {
            vendor_name: vendor.map(|m| m.value),
            transaction_date: date.map(|m| m.value),
            total_amount: amount.map(|m| m.value),
            card_last_four: card.map(|m| m.value),
            source_text: raw_text.to_string(),
        }
    }

    /// Extract fields and report which ones are missing.
    pub fn parse(&self, raw_text: &str) -> ExtractionResult {
        let start = Instant::now();

        info!("Parsing receipt from {} characters of text", raw_text.len());

        let fields = self.extract(raw_text);

        let mut warnings = Vec::new();
        if fields.vendor_name.is_none() {
            warnings.push("Could not extract vendor name".to_string());
        }
        if fields.transaction_date.is_none() {
            warnings.push("Could not extract transaction date".to_string());
        }
        if fields.total_amount.is_none() {
            warnings.push("Could not extract total amount".to_string());
        }
        if fields.card_last_four.is_none() {
            warnings.push("Could not extract card last four digits".to_string());
        }

        ExtractionResult {
            fields,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for ReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_full_receipt() {
        let text = "Walmart\n03/15/2024\nTotal: $45.67\nCard ending in 1234";
        let fields = ReceiptParser::new().extract(text);

        assert_eq!(
            fields,
            ExtractedFields {
                vendor_name: Some("Walmart".to_string()),
                transaction_date: NaiveDate::from_ymd_opt(2024, 3, 15),
                total_amount: Some(Decimal::from_str("45.67").unwrap()),
                card_last_four: Some("1234".to_string()),
                source_text: text.to_string(),
            }
        );
    }

    #[test]
    fn test_date_first_receipt() {
        let text = "14-02-2024\nMy Store\nAmount $9.00";
        let fields = ReceiptParser::new().extract(text);

        assert_eq!(
            fields,
            ExtractedFields {
                vendor_name: Some("My Store".to_string()),
                transaction_date: NaiveDate::from_ymd_opt(2024, 2, 14),
                total_amount: Some(Decimal::from_str("9.00").unwrap()),
                card_last_four: None,
                source_text: text.to_string(),
            }
        );
    }

    #[test]
    fn test_empty_text() {
        let fields = ReceiptParser::new().extract("");
        assert!(fields.is_empty());
        assert_eq!(fields.source_text, "");
    }

    #[test]
    fn test_parse_reports_missing_fields() {
        let result = ReceiptParser::new().parse("Corner Shop\n$3.50");

        assert_eq!(result.fields.vendor_name.as_deref(), Some("Corner Shop"));
        assert_eq!(
            result.warnings,
            vec![
                "Could not extract transaction date".to_string(),
                "Could not extract card last four digits".to_string(),
            ]
        );
    }

    #[test]
    fn test_vendor_length_from_config() {
        let config = ExtractionConfig { vendor_max_chars: 4 };
        let fields = ReceiptParser::from_config(&config).extract("Supermarket");
        assert_eq!(fields.vendor_name.as_deref(), Some("Supe"));
    }
}
