//! Trait definitions for dependency injection
//!
//! Every credential store sits behind [`CredentialBackend`]; the conformance
//! harness receives stores only through [`BackendFactory`].

mod backend_factory;
mod credential_backend;

pub use backend_factory::BackendFactory;
#[cfg(test)]
pub use backend_factory::MockBackendFactory;
pub use credential_backend::{is_ascii_printable, Credential, CredentialBackend, CredentialError};
