//! JSON file ledger holding vendors and saved receipts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PersistenceError;
use crate::models::receipt::{FinishedReceipt, ReceiptId, VendorRef};
use crate::ports::PersistenceSink;

/// A vendor known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRecord {
    pub id: VendorRef,
    pub name: String,
}

/// A saved receipt with its ledger metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReceipt {
    pub id: ReceiptId,
    pub created_at: DateTime<Utc>,
    pub receipt: FinishedReceipt,
}

/// Full ledger contents as written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub vendors: Vec<VendorRecord>,
    #[serde(default)]
    pub receipts: Vec<StoredReceipt>,
}

impl Ledger {
    fn next_vendor_id(&self) -> VendorRef {
        VendorRef(self.vendors.iter().map(|v| v.id.0).max().unwrap_or(0) + 1)
    }

    fn next_receipt_id(&self) -> ReceiptId {
        ReceiptId(self.receipts.iter().map(|r| r.id.0).max().unwrap_or(0) + 1)
    }
}

/// Persistence sink writing every change through to a JSON file.
#[derive(Debug)]
pub struct JsonLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current ledger. A missing file reads as an empty ledger.
    pub fn load(&self) -> Result<Ledger, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read()
    }

    fn read(&self) -> Result<Ledger, PersistenceError> {
        if !self.path.exists() {
            return Ok(Ledger::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| storage(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| storage(&self.path, e))
    }

    fn write(&self, ledger: &Ledger) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage(parent, e))?;
        }
        let content = serde_json::to_string_pretty(ledger).map_err(|e| storage(&self.path, e))?;
        fs::write(&self.path, content).map_err(|e| storage(&self.path, e))
    }

    fn update<T>(&self, change: impl FnOnce(&mut Ledger) -> T) -> Result<T, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ledger = self.read()?;
        let value = change(&mut ledger);
        self.write(&ledger)?;
        Ok(value)
    }
}

fn storage(path: &Path, e: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Storage(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl PersistenceSink for JsonLedger {
    async fn find_or_create_vendor(&self, name: &str) -> Result<VendorRef, PersistenceError> {
        {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let ledger = self.read().map_err(|e| PersistenceError::Vendor {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            if let Some(existing) = ledger.vendors.iter().find(|v| v.name == name) {
                debug!("Reusing vendor {} ({})", existing.name, existing.id);
                return Ok(existing.id);
            }
        }

        let id = self
            .update(|ledger| {
                // Re-check under the write lock
                if let Some(existing) = ledger.vendors.iter().find(|v| v.name == name) {
                    return existing.id;
                }
                let id = ledger.next_vendor_id();
                ledger.vendors.push(VendorRecord {
                    id,
                    name: name.to_string(),
                });
                id
            })
            .map_err(|e| PersistenceError::Vendor {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        info!("Created vendor {} ({})", name, id);
        Ok(id)
    }

    async fn insert_receipt(&self, receipt: FinishedReceipt) -> Result<ReceiptId, PersistenceError> {
        let id = self
            .update(|ledger| {
                let id = ledger.next_receipt_id();
                ledger.receipts.push(StoredReceipt {
                    id,
                    created_at: Utc::now(),
                    receipt,
                });
                id
            })
            .map_err(|e| PersistenceError::Insert(e.to_string()))?;

        info!("Saved receipt {} to {}", id, self.path.display());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::{CategoryRef, ImageRef};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn receipt(vendor: VendorRef) -> FinishedReceipt {
        FinishedReceipt {
            image_ref: ImageRef::new("receipts/receipt_1.jpg"),
            vendor_name: "Walmart".to_string(),
            vendor,
            category: CategoryRef(3),
            payment_method: None,
            book: None,
            amount: Decimal::new(4567, 2),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            card_last_four: Some("1234".to_string()),
            notes: None,
            raw_recognized_text: Some("Walmart\nTotal: $45.67".to_string()),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonLedger::new(dir.path().join("ledger.json"));
        assert_eq!(ledger.load().unwrap(), Ledger::default());
    }

    #[tokio::test]
    async fn test_vendor_get_or_create() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonLedger::new(dir.path().join("data/ledger.json"));

        let a = ledger.find_or_create_vendor("Walmart").await.unwrap();
        let b = ledger.find_or_create_vendor("Walmart").await.unwrap();
        let c = ledger.find_or_create_vendor("walmart").await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ledger.load().unwrap().vendors.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_receipt_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let ledger = JsonLedger::new(&path);

        let vendor = ledger.find_or_create_vendor("Walmart").await.unwrap();
        let first = ledger.insert_receipt(receipt(vendor)).await.unwrap();
        let second = ledger.insert_receipt(receipt(vendor)).await.unwrap();
        assert_eq!(first, ReceiptId(1));
        assert_eq!(second, ReceiptId(2));

        let reopened = JsonLedger::new(&path).load().unwrap();
        assert_eq!(reopened.receipts.len(), 2);
        assert_eq!(reopened.receipts[0].receipt, receipt(vendor));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "not json").unwrap();
        let ledger = JsonLedger::new(&path);

        assert!(matches!(ledger.load(), Err(PersistenceError::Storage(_))));
        assert!(matches!(
            ledger.insert_receipt(receipt(VendorRef(1))).await,
            Err(PersistenceError::Insert(_))
        ));
        assert!(matches!(
            ledger.find_or_create_vendor("Walmart").await,
            Err(PersistenceError::Vendor { .. })
        ));
    }
}
