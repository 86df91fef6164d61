//! The application-server interface consumed by the core.
//!
//! The real application server fronts a relational database behind
//! HTTP; the core only ever sees this trait. It shuttles opaque
//! envelopes and share records and never holds plaintext or keys.

use async_trait::async_trait;

use cop_core::envelope::{Addendum, Envelope};
use cop_core::share::ShareRecord;
use cop_core::types::TxId;

use crate::error::Result;

/// Result of storing an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    /// Envelope was stored.
    Stored,
    /// An envelope with this transaction id already exists (idempotent,
    /// not an error).
    AlreadyExists,
}

/// Async interface for envelope persistence.
#[async_trait]
pub trait EnvelopeStore: Send + Sync {
    /// Store an envelope under its transaction id.
    async fn put_envelope(&self, envelope: &Envelope) -> Result<PutResult>;

    /// Retrieve an envelope by transaction id.
    async fn get_envelope(&self, tx_id: &TxId) -> Result<Option<Envelope>>;

    /// Append a disclosure addendum to a stored envelope. The share
    /// record is retained for later seller audit. This is the only way
    /// a stored envelope ever grows.
    async fn append_addendum(&self, tx_id: &TxId, addendum: Addendum) -> Result<()>;

    /// All share records submitted for a transaction, in submission
    /// order.
    async fn share_records(&self, tx_id: &TxId) -> Result<Vec<ShareRecord>>;
}
