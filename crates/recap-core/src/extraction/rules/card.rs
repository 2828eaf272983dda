//! Payment card last-four extraction.

use regex::Regex;

use super::patterns::{CARD_ENDING_IN, CARD_MASKED, CARD_XXXX};
use super::{ExtractionMatch, FieldExtractor};

fn rules() -> [&'static Regex; 3] {
    [&*CARD_MASKED, &*CARD_ENDING_IN, &*CARD_XXXX]
}

/// Card last-four extractor.
#[derive(Debug, Default)]
pub struct CardExtractor;

impl CardExtractor {
    pub fn new() -> Self {
        Self
    }

    fn candidates<'t>(&self, text: &'t str) -> impl Iterator<Item = ExtractionMatch<String>> + 't {
        rules()
            .into_iter()
            .enumerate()
            .filter_map(move |(rule, pattern)| {
                let caps = pattern.captures(text)?;
                let full = caps.get(0)?;
                Some(
                    ExtractionMatch::new(caps[1].to_string(), rule, full.as_str())
                        .with_position(full.start(), full.end()),
                )
            })
    }
}

impl FieldExtractor for CardExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.candidates(text).next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.candidates(text).collect()
    }
}

/// Whether a value is exactly four ASCII digits.
pub fn is_last_four(value: &str) -> bool {
    value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit())
}
