//! Rule-based field extractors for receipts.
//!
//! Each extractor owns an ordered list of patterns. Patterns are tried in
//! priority order and only the first occurrence of each pattern is
//! considered; the first pattern yielding a usable value wins.

pub mod amounts;
pub mod card;
pub mod dates;
pub mod patterns;
pub mod vendor;

pub use amounts::{AmountExtractor, parse_amount};
pub use card::{CardExtractor, is_last_four};
pub use dates::{DateExtractor, parse_date};
pub use patterns::*;
pub use vendor::{DEFAULT_VENDOR_MAX_CHARS, VendorExtractor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the winning candidate, stopping at the first pattern that yields one.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Every pattern's candidate, in priority order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A candidate value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Index of the pattern that produced it (0 = highest priority).
    pub rule: usize,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, rule: usize, source: impl Into<String>) -> Self {
        Self {
            value,
            rule,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
