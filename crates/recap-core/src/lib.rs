//! Core library for receipt capture.
//!
//! This crate provides:
//! - Field extraction from recognized receipt text (vendor, date, total, card digits)
//! - Review drafts merging extracted values with user edits, and save-time validation
//! - The capture workflow state machine driving image storage, OCR and persistence
//! - Filesystem adapters and an OCR recognizer using PaddleOCR models

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod ports;
pub mod review;
pub mod storage;
pub mod workflow;

pub use error::{
    AcquisitionError, EditError, FieldIssue, FieldProblem, OcrError, PersistenceError,
    RecapError, RecognitionFailure, Result, ValidationError, WorkflowError,
};
pub use extraction::{ExtractionResult, ReceiptParser, extract};
pub use models::config::RecapConfig;
pub use models::receipt::{
    BookRef, CategoryRef, ExtractedFields, FinishedReceipt, ImageRef, ImageSource,
    PaymentMethodRef, ReceiptId, RecognitionResult, VendorRef,
};
pub use ocr::UnavailableRecognizer;
#[cfg(feature = "native")]
pub use ocr::PureOcrRecognizer;
pub use ports::{ImageStore, PersistenceSink, TextRecognizer};
pub use review::{DraftField, ResolvedFields, ReviewDraft, SaveRequest};
pub use storage::{FsImageStore, JsonLedger};
pub use workflow::{CaptureState, CaptureWorkflow, Review, RunToken, StateKind};
