//! Total amount extraction.

use rust_decimal::Decimal;
use std::str::FromStr;

use regex::Regex;

use super::patterns::{AMOUNT_AFTER_AMOUNT, AMOUNT_AFTER_TOTAL, AMOUNT_DOLLAR};
use super::{ExtractionMatch, FieldExtractor};

fn rules() -> [&'static Regex; 3] {
    [&*AMOUNT_AFTER_TOTAL, &*AMOUNT_AFTER_AMOUNT, &*AMOUNT_DOLLAR]
}

/// Amount field extractor.
#[derive(Debug, Default)]
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First match of each rule, in rule order. A match whose digits do not
    /// fit a `Decimal` counts as no match, so a later rule may still apply.
    fn candidates<'t>(
        &self,
        text: &'t str,
    ) -> impl Iterator<Item = ExtractionMatch<Decimal>> + 't {
        rules()
            .into_iter()
            .enumerate()
            .filter_map(move |(rule, pattern)| {
                let caps = pattern.captures(text)?;
                let amount = Decimal::from_str(&caps[1]).ok()?;
                let full = caps.get(0)?;
                Some(
                    ExtractionMatch::new(amount, rule, full.as_str())
                        .with_position(full.start(), full.end()),
                )
            })
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.candidates(text).next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.candidates(text).collect()
    }
}

/// Parse a manually entered amount such as `12.50`, `$ 12.50` or `12`.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let cleaned = input.trim();
    let cleaned = cleaned.strip_prefix('$').unwrap_or(cleaned).trim_start();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    Decimal::from_str(cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_total_keyword_wins_over_bare_dollar_amount() {
        let text = "Coupon $99.99\nTotal: $12.34";
        let result = AmountExtractor::new().extract(text).unwrap();
        assert_eq!(result.value, dec("12.34"));
        assert_eq!(result.rule, 0);
    }

    #[test]
    fn test_amount_keyword() {
        let result = AmountExtractor::new().extract("Amount $9.00").unwrap();
        assert_eq!(result.value, dec("9.00"));
        assert_eq!(result.rule, 1);
    }

    #[test]
    fn test_bare_dollar_amount() {
        let result = AmountExtractor::new().extract("Coffee $ 3.50").unwrap();
        assert_eq!(result.value, dec("3.50"));
        assert_eq!(result.rule, 2);
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let result = AmountExtractor::new().extract("TOTAL 45.67").unwrap();
        assert_eq!(result.value, dec("45.67"));
    }

    #[test]
    fn test_subtotal_matches_total_keyword() {
        // Heuristic: "Subtotal" contains "total" and comes first
        let text = "Subtotal: $40.00\nTax: $5.67\nTotal: $45.67";
        let result = AmountExtractor::new().extract(text).unwrap();
        assert_eq!(result.value, dec("40.00"));
    }

    #[test]
    fn test_thousands_separator_keeps_trailing_group() {
        let result = AmountExtractor::new().extract("Total: 1,234.56").unwrap();
        assert_eq!(result.value, dec("234.56"));
    }

    #[test]
    fn test_date_is_not_an_amount() {
        let text = "03/15/2024\nTotal: $45.67";
        let result = AmountExtractor::new().extract(text).unwrap();
        assert_eq!(result.value, dec("45.67"));

        assert!(AmountExtractor::new().extract("03/15/2024").is_none());
    }

    #[test]
    fn test_overflowing_total_falls_through_to_next_rule() {
        let text = "Total: 99999999999999999999999999999.99\n$5.00";
        let result = AmountExtractor::new().extract(text).unwrap();
        assert_eq!(result.value, dec("5.00"));
        assert_eq!(result.rule, 2);
    }

    #[test]
    fn test_overflowing_amount_alone_is_not_found() {
        assert!(
            AmountExtractor::new()
                .extract("Total: 99999999999999999999999999999.99")
                .is_none()
        );
    }

    #[test]
    fn test_amount_needs_two_decimals() {
        assert!(AmountExtractor::new().extract("Total: 45").is_none());
    }

    #[test]
    fn test_parse_manual_amount() {
        assert_eq!(parse_amount("12.50"), Some(dec("12.50")));
        assert_eq!(parse_amount(" $ 7 "), Some(dec("7")));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("-3.00"), None);
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount("$"), None);
    }
}
