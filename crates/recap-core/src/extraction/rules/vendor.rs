//! Vendor name inference.

use super::patterns::DATE_SHAPED;
use super::{ExtractionMatch, FieldExtractor};

/// Default number of characters kept from the vendor line.
pub const DEFAULT_VENDOR_MAX_CHARS: usize = 50;

/// Takes the first non-blank line that does not look like a date.
///
/// Lines are not trimmed; the result is the line as recognized, cut to
/// `max_chars` characters.
#[derive(Debug)]
pub struct VendorExtractor {
    max_chars: usize,
}

impl VendorExtractor {
    pub fn new() -> Self {
        Self {
            max_chars: DEFAULT_VENDOR_MAX_CHARS,
        }
    }

    /// Set the truncation length.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    fn candidates<'t>(&self, text: &'t str) -> impl Iterator<Item = ExtractionMatch<String>> + 't {
        let max_chars = self.max_chars;
        let base = text.as_ptr() as usize;

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !DATE_SHAPED.is_match(line))
            .map(move |line| {
                let start = line.as_ptr() as usize - base;
                let name: String = line.chars().take(max_chars).collect();
                ExtractionMatch::new(name, 0, line).with_position(start, start + line.len())
            })
    }
}

impl Default for VendorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VendorExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.candidates(text).next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.candidates(text).collect()
    }
}
