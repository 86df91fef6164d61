//! # ChainOfProduct Store
//!
//! The application-server interface the core consumes: store and
//! retrieve opaque envelopes, append disclosure addenda, and hand the
//! seller its share records for audit. The server never sees plaintext
//! or key material.
//!
//! The in-memory implementation serves tests and the demo CLI; the
//! production deployment fronts a relational database and is an
//! external collaborator.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{EnvelopeStore, PutResult};
