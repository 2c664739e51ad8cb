//! Backend construction seam for the conformance harness

use crate::traits::{CredentialBackend, CredentialError};

/// Builds a fresh backend handle for each conformance case
#[cfg_attr(test, mockall::automock)]
pub trait BackendFactory {
    fn create(&self) -> Result<Box<dyn CredentialBackend>, CredentialError>;
}

impl<F, B> BackendFactory for F
where
    F: Fn() -> Result<B, CredentialError>,
    B: CredentialBackend + 'static,
{
    fn create(&self) -> Result<Box<dyn CredentialBackend>, CredentialError> {
        Ok(Box::new(self()?))
    }
}
