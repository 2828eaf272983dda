//! Error types for the recap-core library.

use std::fmt;

use thiserror::Error;

use crate::review::DraftField;

/// Main error type for the recap library.
#[derive(Error, Debug)]
pub enum RecapError {
    /// Image capture or storage failed.
    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// Save-time validation rejected the draft.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A single field edit was rejected.
    #[error("edit error: {0}")]
    Edit(#[from] EditError),

    /// The persistence sink failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// OCR engine setup or execution failed.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// The workflow refused the operation.
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while acquiring and storing a receipt image.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// The source could not be read.
    #[error("source unreadable: {0}")]
    Unreadable(String),

    /// The image store did not complete the write.
    #[error("failed to store image: {0}")]
    StoreFailed(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The stored image could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Detection or recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Reason a recognition attempt produced no usable text.
///
/// Never returned as an `Err` by the workflow; it is recorded on the
/// review state so the user knows fields must be filled manually.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionFailure {
    /// The recognizer reported an error.
    #[error("text recognition failed: {0}")]
    Recognizer(String),

    /// The recognizer succeeded but found no text.
    #[error("no text recognized")]
    EmptyText,
}

/// What is wrong with a single field at save time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProblem {
    /// No value, neither extracted nor entered.
    Missing,
    /// Numeric value must be greater than zero.
    NotPositive,
    /// Text value is empty or whitespace only.
    Blank,
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldProblem::Missing => write!(f, "is required"),
            FieldProblem::NotPositive => write!(f, "must be greater than zero"),
            FieldProblem::Blank => write!(f, "must not be blank"),
        }
    }
}

/// One field that failed save-time validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: DraftField,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.problem)
    }
}

/// Save-time validation failure, listing every offending field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Whether the given field is among the issues.
    pub fn has(&self, field: DraftField) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }

    /// The problem reported for a field, if any.
    pub fn problem(&self, field: DraftField) -> Option<FieldProblem> {
        self.issues.iter().find(|i| i.field == field).map(|i| i.problem)
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A field edit whose value could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The value does not parse for the field's type.
    #[error("invalid {field}: {value:?}")]
    InvalidFormat { field: DraftField, value: String },

    /// The field is not user-editable.
    #[error("{0} cannot be edited")]
    NotEditable(DraftField),
}

/// Errors reported by the persistence sink.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Vendor lookup or creation failed.
    #[error("failed to resolve vendor {name:?}: {reason}")]
    Vendor { name: String, reason: String },

    /// Receipt insert failed.
    #[error("failed to insert receipt: {0}")]
    Insert(String),

    /// Backing store could not be read or written.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

/// Errors raised by the capture state machine itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Another suspending operation is outstanding on this run.
    #[error("another operation is in progress")]
    Busy,

    /// The operation is not valid from the current state.
    #[error("{operation} is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::workflow::StateKind,
    },

    /// The run the caller refers to has been reset or replaced.
    #[error("capture run has been superseded")]
    StaleRun,
}

/// Result type for the recap library.
pub type Result<T> = std::result::Result<T, RecapError>;
