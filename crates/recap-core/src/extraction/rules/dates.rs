//! Transaction date extraction.

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::patterns::{DATE_DMY_DASH, DATE_ISO, DATE_MDY_SLASH};
use super::{ExtractionMatch, FieldExtractor};

/// Order of the captured date components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentOrder {
    MonthDayYear,
    DayMonthYear,
    YearMonthDay,
}

impl ComponentOrder {
    fn to_date(self, caps: &Captures<'_>) -> Option<NaiveDate> {
        let (y, m, d) = match self {
            ComponentOrder::MonthDayYear => (&caps[3], &caps[1], &caps[2]),
            ComponentOrder::DayMonthYear => (&caps[3], &caps[2], &caps[1]),
            ComponentOrder::YearMonthDay => (&caps[1], &caps[2], &caps[3]),
        };
        NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
    }
}

/// The delimiter decides the order: `/` is always month first, `-` with a
/// trailing four-digit year is always day first. No locale guessing.
fn rules() -> [(&'static Regex, ComponentOrder); 3] {
    [
        (&*DATE_MDY_SLASH, ComponentOrder::MonthDayYear),
        (&*DATE_DMY_DASH, ComponentOrder::DayMonthYear),
        (&*DATE_ISO, ComponentOrder::YearMonthDay),
    ]
}

/// Date field extractor.
#[derive(Debug, Default)]
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Candidates lazily in priority order; a pattern whose first match is
    /// not a calendar date yields nothing and the next pattern is tried.
    fn candidates<'t>(
        &self,
        text: &'t str,
    ) -> impl Iterator<Item = ExtractionMatch<NaiveDate>> + 't {
        rules()
            .into_iter()
            .enumerate()
            .filter_map(move |(rule, (pattern, order))| {
                let caps = pattern.captures(text)?;
                let date = order.to_date(&caps)?;
                let full = caps.get(0)?;
                Some(
                    ExtractionMatch::new(date, rule, full.as_str())
                        .with_position(full.start(), full.end()),
                )
            })
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.candidates(text).next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        self.candidates(text).collect()
    }
}

/// Parse a manually entered date.
///
/// Accepts `YYYY-MM-DD` plus the receipt formats, in the same trial order
/// as extraction. The whole input must be the date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }

    DateExtractor::new()
        .candidates(input)
        .find(|m| m.position == Some((0, input.len())))
        .map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_slash_date_is_month_first() {
        let result = DateExtractor::new().extract("03/15/2024").unwrap();
        assert_eq!(result.value, ymd(2024, 3, 15));
        assert_eq!(result.rule, 0);
    }

    #[test]
    fn test_dash_date_is_day_first() {
        let result = DateExtractor::new().extract("13-02-2024").unwrap();
        assert_eq!(result.value, ymd(2024, 2, 13));
        assert_eq!(result.rule, 1);
    }

    #[test]
    fn test_iso_date() {
        let result = DateExtractor::new().extract("Date: 2024-03-15").unwrap();
        assert_eq!(result.value, ymd(2024, 3, 15));
        assert_eq!(result.rule, 2);
    }

    #[test]
    fn test_slash_date_wins_over_dash_date() {
        let text = "01-02-2024\nprinted 05/06/2024";
        let result = DateExtractor::new().extract(text).unwrap();
        assert_eq!(result.value, ymd(2024, 5, 6));
    }

    #[test]
    fn test_invalid_first_pattern_falls_through() {
        // 15/03/2024 is not a month-first date; the dash date is used instead
        let text = "15/03/2024\n10-04-2024";
        let result = DateExtractor::new().extract(text).unwrap();
        assert_eq!(result.value, ymd(2024, 4, 10));
    }

    #[test]
    fn test_only_first_occurrence_of_a_pattern_is_tried() {
        // The later valid slash date is never considered
        let text = "99/99/2024\n03/15/2024";
        assert!(DateExtractor::new().extract(text).is_none());
    }

    #[test]
    fn test_two_digit_year_is_not_a_date() {
        assert!(DateExtractor::new().extract("03/15/24").is_none());
    }

    #[test]
    fn test_extract_all_lists_each_pattern() {
        let text = "03/15/2024 14-02-2024 2023-12-31";
        let all = DateExtractor::new().extract_all(text);
        let values: Vec<_> = all.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![ymd(2024, 3, 15), ymd(2024, 2, 14), ymd(2023, 12, 31)]);
    }

    #[test]
    fn test_parse_manual_date() {
        assert_eq!(parse_date("2024-03-15"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(" 03/15/2024 "), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("15-03-2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("on 03/15/2024"), None);
    }
}
