//! Common regex patterns for receipt field extraction.
//!
//! Digit classes are ASCII-only (`[0-9]`) so matched text always parses.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Any line containing this is assumed to be a date, not a vendor name
    pub static ref DATE_SHAPED: Regex = Regex::new(
        r"[0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4}"
    ).unwrap();

    // Date patterns, in trial order
    pub static ref DATE_MDY_SLASH: Regex = Regex::new(
        r"([0-9]{1,2})/([0-9]{1,2})/([0-9]{4})"
    ).unwrap();

    pub static ref DATE_DMY_DASH: Regex = Regex::new(
        r"([0-9]{1,2})-([0-9]{1,2})-([0-9]{4})"
    ).unwrap();

    pub static ref DATE_ISO: Regex = Regex::new(
        r"([0-9]{4})-([0-9]{2})-([0-9]{2})"
    ).unwrap();

    // Amount patterns, in trial order
    pub static ref AMOUNT_AFTER_TOTAL: Regex = Regex::new(
        r"(?i)total.*?\$?\s*([0-9]+\.[0-9]{2})"
    ).unwrap();

    pub static ref AMOUNT_AFTER_AMOUNT: Regex = Regex::new(
        r"(?i)amount.*?\$?\s*([0-9]+\.[0-9]{2})"
    ).unwrap();

    pub static ref AMOUNT_DOLLAR: Regex = Regex::new(
        r"\$\s*([0-9]+\.[0-9]{2})"
    ).unwrap();

    // Card last-four patterns, in trial order
    pub static ref CARD_MASKED: Regex = Regex::new(
        r"(?i)(?:card|xxxx|\*{4})\s*([0-9]{4})"
    ).unwrap();

    pub static ref CARD_ENDING_IN: Regex = Regex::new(
        r"(?i)ending\s+in\s+([0-9]{4})"
    ).unwrap();

    pub static ref CARD_XXXX: Regex = Regex::new(
        r"(?i)x{4}([0-9]{4})"
    ).unwrap();
}
