//! Review draft: candidate fields merged with user overrides, and
//! save-time validation.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EditError, FieldIssue, FieldProblem, ValidationError};
use crate::extraction::rules::{is_last_four, parse_amount, parse_date};
use crate::models::receipt::{
    BookRef, CategoryRef, ExtractedFields, FinishedReceipt, ImageRef, PaymentMethodRef, VendorRef,
};

/// A field of the review draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    VendorName,
    TransactionDate,
    Amount,
    CardLastFour,
    /// Supplied with the save request; reported by validation only.
    Category,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftField::VendorName => "vendor name",
            DraftField::TransactionDate => "transaction date",
            DraftField::Amount => "amount",
            DraftField::CardLastFour => "card last four",
            DraftField::Category => "category",
        };
        f.write_str(name)
    }
}

/// A user override for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Override<T> {
    /// No override; the extracted candidate applies.
    #[default]
    Inherit,
    /// The user erased the field.
    Cleared,
    /// The user entered a value.
    Set(T),
}

impl<T: Clone> Override<T> {
    fn resolve(&self, candidate: Option<&T>) -> Option<T> {
        match self {
            Override::Inherit => candidate.cloned(),
            Override::Cleared => None,
            Override::Set(value) => Some(value.clone()),
        }
    }
}

/// The draft's current value for every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedFields {
    pub vendor_name: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub card_last_four: Option<String>,
}

/// Candidate fields from the latest extraction plus field-level overrides.
///
/// The extracted fields are never mutated; edits only add overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDraft {
    extracted: Option<ExtractedFields>,
    vendor_name: Override<String>,
    transaction_date: Override<NaiveDate>,
    amount: Override<Decimal>,
    card_last_four: Override<String>,
}

impl ReviewDraft {
    /// A draft with no candidates, for manual entry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A draft seeded from an extraction pass.
    pub fn from_extracted(fields: ExtractedFields) -> Self {
        Self {
            extracted: Some(fields),
            ..Self::default()
        }
    }

    /// The extraction pass this draft was seeded from, if any.
    pub fn extracted(&self) -> Option<&ExtractedFields> {
        self.extracted.as_ref()
    }

    /// Whether the user has overridden the field.
    pub fn is_overridden(&self, field: DraftField) -> bool {
        match field {
            DraftField::VendorName => self.vendor_name != Override::Inherit,
            DraftField::TransactionDate => self.transaction_date != Override::Inherit,
            DraftField::Amount => self.amount != Override::Inherit,
            DraftField::CardLastFour => self.card_last_four != Override::Inherit,
            DraftField::Category => false,
        }
    }

    /// Resolve each field: override, else candidate, else absent.
    pub fn resolve(&self) -> ResolvedFields {
        let ex = self.extracted.as_ref();
        ResolvedFields {
            vendor_name: self
                .vendor_name
                .resolve(ex.and_then(|e| e.vendor_name.as_ref())),
            transaction_date: self
                .transaction_date
                .resolve(ex.and_then(|e| e.transaction_date.as_ref())),
            amount: self.amount.resolve(ex.and_then(|e| e.total_amount.as_ref())),
            card_last_four: self
                .card_last_four
                .resolve(ex.and_then(|e| e.card_last_four.as_ref())),
        }
    }

    /// Apply a user edit given as text.
    ///
    /// Blank input clears the field. Unparseable input is rejected and
    /// leaves the draft unchanged.
    pub fn apply_edit(&mut self, field: DraftField, value: &str) -> Result<(), EditError> {
        let value = value.trim();
        let invalid = || EditError::InvalidFormat {
            field,
            value: value.to_string(),
        };

        match field {
            DraftField::VendorName => {
                self.vendor_name = if value.is_empty() {
                    Override::Cleared
                } else {
                    Override::Set(value.to_string())
                };
            }
            DraftField::TransactionDate => {
                self.transaction_date = if value.is_empty() {
                    Override::Cleared
                } else {
                    Override::Set(parse_date(value).ok_or_else(invalid)?)
                };
            }
            DraftField::Amount => {
                self.amount = if value.is_empty() {
                    Override::Cleared
                } else {
                    Override::Set(parse_amount(value).ok_or_else(invalid)?)
                };
            }
            DraftField::CardLastFour => {
                self.card_last_four = if value.is_empty() {
                    Override::Cleared
                } else if is_last_four(value) {
                    Override::Set(value.to_string())
                } else {
                    return Err(invalid());
                };
            }
            DraftField::Category => return Err(EditError::NotEditable(field)),
        }

        Ok(())
    }

    /// Recognized text to keep on the record; absent when extraction was
    /// skipped or saw no text.
    pub fn raw_text(&self) -> Option<&str> {
        self.extracted
            .as_ref()
            .map(|e| e.source_text.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Check the merged draft against a save request.
    ///
    /// Reports every offending field at once. An unparseable or missing
    /// date is an error; no default date is substituted.
    pub fn validate(&self, request: &SaveRequest) -> Result<ValidatedDraft, ValidationError> {
        let fields = self.resolve();
        let mut issues = Vec::new();
        let mut issue = |field, problem| issues.push(FieldIssue { field, problem });

        match &fields.vendor_name {
            None => issue(DraftField::VendorName, FieldProblem::Missing),
            Some(name) if name.trim().is_empty() => {
                issue(DraftField::VendorName, FieldProblem::Blank)
            }
            Some(_) => {}
        }
        if fields.transaction_date.is_none() {
            issue(DraftField::TransactionDate, FieldProblem::Missing);
        }
        match fields.amount {
            None => issue(DraftField::Amount, FieldProblem::Missing),
            Some(amount) if amount <= Decimal::ZERO => {
                issue(DraftField::Amount, FieldProblem::NotPositive)
            }
            Some(_) => {}
        }
        if request.category.is_none() {
            issue(DraftField::Category, FieldProblem::Missing);
        }

        match (
            fields.vendor_name,
            fields.transaction_date,
            fields.amount,
            request.category,
        ) {
            (Some(vendor_name), Some(transaction_date), Some(amount), Some(category))
                if issues.is_empty() =>
            {
                Ok(ValidatedDraft {
                    vendor_name,
                    transaction_date,
                    amount,
                    category,
                    payment_method: request.payment_method,
                    book: request.book,
                    card_last_four: fields.card_last_four,
                    notes: request
                        .notes
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string),
                    raw_recognized_text: self.raw_text().map(str::to_string),
                })
            }
            _ => Err(ValidationError { issues }),
        }
    }
}

/// Caller-supplied references and notes for `save`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub category: Option<CategoryRef>,
    pub payment_method: Option<PaymentMethodRef>,
    pub book: Option<BookRef>,
    pub notes: Option<String>,
}

impl SaveRequest {
    pub fn new(category: CategoryRef) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn with_payment_method(mut self, payment_method: PaymentMethodRef) -> Self {
        self.payment_method = Some(payment_method);
        self
    }

    pub fn with_book(mut self, book: BookRef) -> Self {
        self.book = Some(book);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A draft that passed validation, waiting for vendor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDraft {
    pub vendor_name: String,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub category: CategoryRef,
    pub payment_method: Option<PaymentMethodRef>,
    pub book: Option<BookRef>,
    pub card_last_four: Option<String>,
    pub notes: Option<String>,
    pub raw_recognized_text: Option<String>,
}

impl ValidatedDraft {
    /// Build the record handed to persistence.
    pub fn into_receipt(self, image_ref: ImageRef, vendor: VendorRef) -> FinishedReceipt {
        FinishedReceipt {
            image_ref,
            vendor_name: self.vendor_name,
            vendor,
            category: self.category,
            payment_method: self.payment_method,
            book: self.book,
            amount: self.amount,
            transaction_date: self.transaction_date,
            card_last_four: self.card_last_four,
            notes: self.notes,
            raw_recognized_text: self.raw_recognized_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn walmart() -> ReviewDraft {
        ReviewDraft::from_extracted(extraction::extract(
            "Walmart\n03/15/2024\nTotal: $45.67\nCard ending in 1234",
        ))
    }

    #[test]
    fn test_candidates_flow_through() {
        let fields = walmart().resolve();
        assert_eq!(fields.vendor_name.as_deref(), Some("Walmart"));
        assert_eq!(fields.amount, Some(dec("45.67")));
        assert_eq!(fields.card_last_four.as_deref(), Some("1234"));
    }

    #[test]
    fn test_override_wins_and_extraction_is_untouched() {
        let mut draft = walmart();
        draft.apply_edit(DraftField::Amount, "$50.00").unwrap();
        draft.apply_edit(DraftField::VendorName, "  Walmart #42 ").unwrap();

        let fields = draft.resolve();
        assert_eq!(fields.amount, Some(dec("50.00")));
        assert_eq!(fields.vendor_name.as_deref(), Some("Walmart #42"));
        assert!(draft.is_overridden(DraftField::Amount));
        assert!(!draft.is_overridden(DraftField::TransactionDate));
        assert_eq!(draft.extracted().unwrap().total_amount, Some(dec("45.67")));
    }

    #[test]
    fn test_blank_edit_clears_candidate() {
        let mut draft = walmart();
        draft.apply_edit(DraftField::CardLastFour, "").unwrap();
        assert_eq!(draft.resolve().card_last_four, None);
    }

    #[test]
    fn test_rejected_edit_keeps_previous_value() {
        let mut draft = walmart();

        let err = draft.apply_edit(DraftField::Amount, "forty").unwrap_err();
        assert_eq!(
            err,
            EditError::InvalidFormat {
                field: DraftField::Amount,
                value: "forty".to_string()
            }
        );
        assert!(draft.apply_edit(DraftField::CardLastFour, "12345").is_err());
        assert!(draft.apply_edit(DraftField::TransactionDate, "2024-13-01").is_err());
        assert_eq!(
            draft.apply_edit(DraftField::Category, "3"),
            Err(EditError::NotEditable(DraftField::Category))
        );

        assert_eq!(draft, walmart());
    }

    #[test]
    fn test_validate_success() {
        let request = SaveRequest::new(CategoryRef(2))
            .with_payment_method(PaymentMethodRef(5))
            .with_notes("  lunch ");
        let validated = walmart().validate(&request).unwrap();

        assert_eq!(validated.vendor_name, "Walmart");
        assert_eq!(validated.amount, dec("45.67"));
        assert_eq!(validated.transaction_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(validated.notes.as_deref(), Some("lunch"));
        assert_eq!(validated.payment_method, Some(PaymentMethodRef(5)));
        assert!(validated.raw_recognized_text.unwrap().starts_with("Walmart"));
    }

    #[test]
    fn test_validate_empty_draft_reports_every_field() {
        let err = ReviewDraft::empty()
            .validate(&SaveRequest::default())
            .unwrap_err();

        assert_eq!(
            err.issues,
            vec![
                FieldIssue { field: DraftField::VendorName, problem: FieldProblem::Missing },
                FieldIssue { field: DraftField::TransactionDate, problem: FieldProblem::Missing },
                FieldIssue { field: DraftField::Amount, problem: FieldProblem::Missing },
                FieldIssue { field: DraftField::Category, problem: FieldProblem::Missing },
            ]
        );
    }

    #[test]
    fn test_zero_amount_is_not_positive() {
        let mut draft = walmart();
        draft.apply_edit(DraftField::Amount, "0.00").unwrap();

        let err = draft.validate(&SaveRequest::new(CategoryRef(1))).unwrap_err();
        assert_eq!(err.problem(DraftField::Amount), Some(FieldProblem::NotPositive));
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn test_whitespace_vendor_candidate_is_blank() {
        let mut fields = extraction::extract("Walmart\n03/15/2024\nTotal: $45.67");
        fields.vendor_name = Some("   ".to_string());
        let draft = ReviewDraft::from_extracted(fields);

        let err = draft.validate(&SaveRequest::new(CategoryRef(1))).unwrap_err();
        assert_eq!(err.problem(DraftField::VendorName), Some(FieldProblem::Blank));
    }

    #[test]
    fn test_unparseable_manual_date_is_not_replaced_with_today() {
        let mut draft = ReviewDraft::empty();
        draft.apply_edit(DraftField::VendorName, "Deli").unwrap();
        draft.apply_edit(DraftField::Amount, "8.25").unwrap();
        assert!(draft.apply_edit(DraftField::TransactionDate, "tomorrow-ish").is_err());

        let err = draft.validate(&SaveRequest::new(CategoryRef(1))).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.problem(DraftField::TransactionDate), Some(FieldProblem::Missing));
    }

    #[test]
    fn test_skipped_extraction_has_no_raw_text() {
        let mut draft = ReviewDraft::empty();
        draft.apply_edit(DraftField::VendorName, "Deli").unwrap();
        draft.apply_edit(DraftField::Amount, "8.25").unwrap();
        draft.apply_edit(DraftField::TransactionDate, "2024-01-05").unwrap();

        let validated = draft.validate(&SaveRequest::new(CategoryRef(1))).unwrap();
        assert_eq!(validated.raw_recognized_text, None);
        assert_eq!(validated.notes, None);
    }

    #[test]
    fn test_into_receipt() {
        let validated = walmart()
            .validate(&SaveRequest::new(CategoryRef(3)).with_book(BookRef(9)))
            .unwrap();
        let receipt = validated.into_receipt(ImageRef::new("/img/a.jpg"), VendorRef(11));

        assert_eq!(receipt.vendor, VendorRef(11));
        assert_eq!(receipt.book, Some(BookRef(9)));
        assert_eq!(receipt.image_ref.as_str(), "/img/a.jpg");
        assert_eq!(receipt.card_last_four.as_deref(), Some("1234"));
    }
}
