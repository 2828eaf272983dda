//! Receipt data models: the values flowing through the capture pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque, stable reference to a stored receipt image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the reference as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

/// Where a captured image comes from before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on disk (camera roll, picker result).
    File(PathBuf),
    /// Raw encoded image bytes with a file extension hint.
    Bytes { data: Vec<u8>, extension: String },
}

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a persisted receipt.
    ReceiptId
);
id_newtype!(
    /// Identifier of a vendor known to the persistence layer.
    VendorRef
);
id_newtype!(
    /// Identifier of an expense category.
    CategoryRef
);
id_newtype!(
    /// Identifier of a payment method.
    PaymentMethodRef
);
id_newtype!(
    /// Identifier of the book a receipt is filed in.
    BookRef
);

/// Outcome of one text recognition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Recognized text (empty on failure).
    pub raw_text: String,
    /// Whether the recognizer completed.
    pub succeeded: bool,
    /// Reason reported by the recognizer on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl RecognitionResult {
    pub fn success(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            succeeded: true,
            failure_reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            raw_text: String::new(),
            succeeded: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Candidate fields produced by one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    /// Last four digits of the payment card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last_four: Option<String>,

    /// Text the fields were extracted from.
    pub source_text: String,
}

impl ExtractedFields {
    /// Whether no field was found.
    pub fn is_empty(&self) -> bool {
        self.vendor_name.is_none()
            && self.transaction_date.is_none()
            && self.total_amount.is_none()
            && self.card_last_four.is_none()
    }
}

/// A validated record handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedReceipt {
    pub image_ref: ImageRef,
    pub vendor_name: String,
    pub vendor: VendorRef,
    pub category: CategoryRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethodRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookRef>,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last_four: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_recognized_text: Option<String>,
}
