//! Scoped ownership of the credentials a conformance case creates

use std::collections::BTreeSet;

use super::report::CleanupFailure;
use crate::traits::{CredentialBackend, CredentialError};

/// Backend handle plus the set of `(service, username)` pairs written
/// through it.
///
/// Every tracked pair is deleted exactly once, either by [`TestScope::release`]
/// or, if the case unwinds before reaching it, when the scope is dropped.
pub struct TestScope {
    backend: Box<dyn CredentialBackend>,
    created: BTreeSet<(String, String)>,
    released: bool,
}

impl TestScope {
    pub fn new(backend: Box<dyn CredentialBackend>) -> Self {
        Self {
            backend,
            created: BTreeSet::new(),
            released: false,
        }
    }

    pub fn backend(&self) -> &dyn CredentialBackend {
        self.backend.as_ref()
    }

    /// Write through the backend and track the pair for cleanup
    pub fn set_password(&mut self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        self.backend.set_password(service, username, password)?;
        self.created.insert((service.to_string(), username.to_string()));
        Ok(())
    }

    /// Delete through the backend and stop tracking the pair
    pub fn delete_password(&mut self, service: &str, username: &str) -> Result<(), CredentialError> {
        self.backend.delete_password(service, username)?;
        self.created.remove(&(service.to_string(), username.to_string()));
        Ok(())
    }

    pub fn is_tracked(&self, service: &str, username: &str) -> bool {
        self.created.contains(&(service.to_string(), username.to_string()))
    }

    pub fn tracked_len(&self) -> usize {
        self.created.len()
    }

    /// Delete every tracked pair and return the deletions that failed
    pub fn release(mut self) -> Vec<CleanupFailure> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> Vec<CleanupFailure> {
        self.released = true;
        let created = std::mem::take(&mut self.created);
        let mut failures = Vec::new();
        for (service, username) in created {
            match self.backend.delete_password(&service, &username) {
                Ok(()) => {
                    tracing::debug!(service = %service, username = %username, "Cleaned up credential");
                }
                Err(error) => {
                    tracing::warn!(service = %service, username = %username, error = %error, "Cleanup failed");
                    failures.push(CleanupFailure {
                        service,
                        username,
                        error,
                    });
                }
            }
        }
        failures
    }
}

impl Drop for TestScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for failure in self.cleanup() {
            tracing::error!(backend = %self.backend.name(), "{failure}");
        }
    }
}
