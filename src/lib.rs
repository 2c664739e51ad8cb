//! Keystash - pluggable `(service, username) -> password` storage
//!
//! The [`traits::CredentialBackend`] contract is implemented by in-memory,
//! JSON-file, SQLite and platform-keyring stores. The [`conformance`] harness
//! proves any store honors the contract.

pub mod config;
pub mod conformance;
pub mod logging;
pub mod mocks;
pub mod production;
pub mod traits;

pub use config::HarnessConfig;
pub use traits::{Credential, CredentialBackend, CredentialError};
