//! In-memory implementation of the store trait.
//!
//! Primarily for tests and the demo CLI. Same semantics as the real
//! application server, no persistence. Thread-safe via RwLock.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use cop_core::envelope::{Addendum, Envelope};
use cop_core::share::ShareRecord;
use cop_core::types::TxId;

use crate::error::{Result, StoreError};
use crate::traits::{EnvelopeStore, PutResult};

/// In-memory envelope store.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    envelopes: HashMap<TxId, Envelope>,
    records: HashMap<TxId, Vec<ShareRecord>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnvelopeStore for MemoryStore {
    async fn put_envelope(&self, envelope: &Envelope) -> Result<PutResult> {
        let mut inner = self.inner.write().unwrap();
        if inner.envelopes.contains_key(&envelope.tx_id) {
            return Ok(PutResult::AlreadyExists);
        }
        inner.envelopes.insert(envelope.tx_id, envelope.clone());
        debug!(tx_id = %envelope.tx_id, "stored envelope");
        Ok(PutResult::Stored)
    }

    async fn get_envelope(&self, tx_id: &TxId) -> Result<Option<Envelope>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.envelopes.get(tx_id).cloned())
    }

    async fn append_addendum(&self, tx_id: &TxId, addendum: Addendum) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let envelope = inner
            .envelopes
            .get_mut(tx_id)
            .ok_or_else(|| StoreError::NotFound(tx_id.to_hex()))?;

        if addendum.share_record.tx_id != *tx_id {
            return Err(StoreError::Rejected(
                "share record is for a different transaction".into(),
            ));
        }

        let record = addendum.share_record.clone();
        envelope.addenda.push(addendum);
        inner.records.entry(*tx_id).or_default().push(record);
        debug!(tx_id = %tx_id, "appended addendum");
        Ok(())
    }

    async fn share_records(&self, tx_id: &TxId) -> Result<Vec<ShareRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.records.get(tx_id).cloned().unwrap_or_default())
    }
}
