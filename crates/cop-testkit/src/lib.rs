//! # ChainOfProduct Testkit
//!
//! Testing utilities shared across the workspace:
//!
//! - [`TestWorld`] - a throwaway deployment (keystore, directory,
//!   groups) for pipeline and integration tests
//! - [`generators`] - proptest strategies for codec properties

pub mod fixtures;
pub mod generators;

pub use fixtures::TestWorld;
pub use generators::{arb_envelope, arb_name, arb_wrapped_key};
