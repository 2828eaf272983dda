//! Filesystem adapters for the image store and persistence sink.

mod images;
mod ledger;

pub use images::FsImageStore;
pub use ledger::{JsonLedger, Ledger, StoredReceipt, VendorRecord};
