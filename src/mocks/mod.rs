//! Test doubles for dependency injection
//!
//! Provides an in-memory reference backend, plus a backend that breaks one
//! part of the contract on purpose so the conformance harness can be shown to
//! catch it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::{Credential, CredentialBackend, CredentialError};

type EntryMap = BTreeMap<(String, String), String>;

// ============================================================================
// InMemoryBackend
// ============================================================================

/// In-memory credential backend for testing
///
/// Thread-safe storage backed by an ordered map. Clones share the same store.
/// Resolves a service-only credential lookup when exactly one username is
/// stored under that service.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    entries: Arc<Mutex<EntryMap>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create backend with pre-populated `(service, username, password)` entries
    pub fn with_entries(entries: Vec<(&str, &str, &str)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(service, username, password)| {
                ((service.to_string(), username.to_string()), password.to_string())
            })
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
        }
    }

    /// All stored `(service, username)` keys (for assertions)
    pub fn keys(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries
    pub fn clear(&self) {
        if let Ok(mut map) = self.entries.lock() {
            map.clear();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, EntryMap>, CredentialError> {
        self.entries
            .lock()
            .map_err(|_| CredentialError::StorageError("in-memory store poisoned".to_string()))
    }
}

impl CredentialBackend for InMemoryBackend {
    fn name(&self) -> String {
        "In-memory backend".to_string()
    }

    fn set_password(&self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        self.lock()?
            .insert((service.to_string(), username.to_string()), password.to_string());
        Ok(())
    }

    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError> {
        Ok(self
            .lock()?
            .get(&(service.to_string(), username.to_string()))
            .cloned())
    }

    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError> {
        match self.lock()?.remove(&(service.to_string(), username.to_string())) {
            Some(_) => Ok(()),
            None => Err(CredentialError::PasswordDelete(format!(
                "no entry for {service:?}/{username:?}"
            ))),
        }
    }

    fn get_credential(
        &self,
        service: &str,
        username: Option<&str>,
    ) -> Result<Option<Credential>, CredentialError> {
        if let Some(username) = username {
            return Ok(self
                .get_password(service, username)?
                .map(|password| Credential::new(username, password)));
        }

        let map = self.lock()?;
        let mut matches = map
            .iter()
            .filter(|((svc, _), _)| svc == service)
            .map(|((_, user), password)| Credential::new(user.as_str(), password.as_str()));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Ok(Some(only)),
            _ => Ok(None),
        }
    }
}

// ============================================================================
// FaultyBackend
// ============================================================================

/// A single deliberate contract violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// One password slot per service; the username is ignored
    SharedSlotPerService,
    /// Deleting an absent entry succeeds instead of failing
    SilentDeleteOfAbsent,
    /// Delete reports success but the entry survives
    DeleteLeaksEntry,
    /// An empty password reads back as absent
    EmptyPasswordAsAbsent,
    /// Non-ASCII characters are dropped from stored passwords
    AsciiOnlyPasswords,
    /// `get_credential` invents a pair that was never stored
    FabricatedCredential,
    /// The backend name contains a control character
    NonPrintableName,
    /// Every operation fails as if the store were unreachable
    Unavailable,
}

/// In-memory backend with one configurable contract violation
#[derive(Clone)]
pub struct FaultyBackend {
    inner: InMemoryBackend,
    fault: Fault,
}

impl FaultyBackend {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: InMemoryBackend::new(),
            fault,
        }
    }

    pub fn fault(&self) -> Fault {
        self.fault
    }

    fn slot<'a>(&self, username: &'a str) -> &'a str {
        if self.fault == Fault::SharedSlotPerService {
            ""
        } else {
            username
        }
    }

    fn check_available(&self) -> Result<(), CredentialError> {
        if self.fault == Fault::Unavailable {
            Err(CredentialError::StorageError("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CredentialBackend for FaultyBackend {
    fn name(&self) -> String {
        match self.fault {
            Fault::NonPrintableName => "faulty\tbackend".to_string(),
            fault => format!("Faulty backend ({fault:?})"),
        }
    }

    fn set_password(&self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        self.check_available()?;
        let stored: String = if self.fault == Fault::AsciiOnlyPasswords {
            password.chars().filter(char::is_ascii).collect()
        } else {
            password.to_string()
        };
        self.inner.set_password(service, self.slot(username), &stored)
    }

    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError> {
        self.check_available()?;
        let value = self.inner.get_password(service, self.slot(username))?;
        if self.fault == Fault::EmptyPasswordAsAbsent {
            return Ok(value.filter(|password| !password.is_empty()));
        }
        Ok(value)
    }

    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError> {
        self.check_available()?;
        match self.fault {
            Fault::DeleteLeaksEntry => Ok(()),
            Fault::SilentDeleteOfAbsent => {
                match self.inner.delete_password(service, username) {
                    Err(e) if e.is_delete_error() => Ok(()),
                    other => other,
                }
            }
            _ => self.inner.delete_password(service, self.slot(username)),
        }
    }

    fn get_credential(
        &self,
        service: &str,
        username: Option<&str>,
    ) -> Result<Option<Credential>, CredentialError> {
        self.check_available()?;
        if self.fault == Fault::FabricatedCredential {
            return Ok(Some(Credential::new(username.unwrap_or("admin"), "admin")));
        }
        let Some(username) = username else {
            return Ok(None);
        };
        Ok(self
            .get_password(service, username)?
            .map(|password| Credential::new(username, password)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_backend() {
        let backend = InMemoryBackend::new();

        // Absent
        assert_eq!(backend.get_password("svc", "alice").unwrap(), None);

        // Store and retrieve
        backend.set_password("svc", "alice", "pw1").unwrap();
        assert_eq!(backend.get_password("svc", "alice").unwrap(), Some("pw1".to_string()));

        // Overwrite
        backend.set_password("svc", "alice", "pw2").unwrap();
        assert_eq!(backend.get_password("svc", "alice").unwrap(), Some("pw2".to_string()));
        assert_eq!(backend.len(), 1);

        // Delete
        backend.delete_password("svc", "alice").unwrap();
        assert_eq!(backend.get_password("svc", "alice").unwrap(), None);
        assert!(backend.is_empty());
    }

    #[test]
    fn test_in_memory_delete_absent_fails() {
        let backend = InMemoryBackend::new();
        let err = backend.delete_password("svc", "ghost").unwrap_err();
        assert!(err.is_delete_error());
    }

    #[test]
    fn test_in_memory_empty_password_is_not_absent() {
        let backend = InMemoryBackend::new();
        backend.set_password("svc", "alice", "").unwrap();
        assert_eq!(backend.get_password("svc", "alice").unwrap(), Some(String::new()));
    }

    #[test]
    fn test_in_memory_with_entries() {
        let backend = InMemoryBackend::with_entries(vec![
            ("svc", "alice", "pw1"),
            ("svc", "bob", "pw2"),
        ]);

        assert_eq!(backend.keys().len(), 2);
        assert_eq!(backend.get_password("svc", "bob").unwrap(), Some("pw2".to_string()));

        backend.clear();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_in_memory_credential_resolution() {
        let backend = InMemoryBackend::with_entries(vec![("svc", "alice", "pw1")]);

        // Single candidate resolves
        assert_eq!(
            backend.get_credential("svc", None).unwrap(),
            Some(Credential::new("alice", "pw1"))
        );

        // Two candidates decline
        backend.set_password("svc", "bob", "pw2").unwrap();
        assert_eq!(backend.get_credential("svc", None).unwrap(), None);

        // Explicit username
        assert_eq!(
            backend.get_credential("svc", Some("bob")).unwrap(),
            Some(Credential::new("bob", "pw2"))
        );
        assert_eq!(backend.get_credential("other", None).unwrap(), None);
    }

    #[test]
    fn test_clones_share_store() {
        let backend = InMemoryBackend::new();
        let clone = backend.clone();
        backend.set_password("svc", "alice", "pw1").unwrap();
        assert_eq!(clone.get_password("svc", "alice").unwrap(), Some("pw1".to_string()));
    }

    #[test]
    fn test_faulty_shared_slot_overwrites_other_user() {
        let backend = FaultyBackend::new(Fault::SharedSlotPerService);
        backend.set_password("svc", "alice", "pw1").unwrap();
        backend.set_password("svc", "bob", "pw2").unwrap();
        assert_eq!(backend.get_password("svc", "alice").unwrap(), Some("pw2".to_string()));
    }

    #[test]
    fn test_faulty_silent_delete() {
        let backend = FaultyBackend::new(Fault::SilentDeleteOfAbsent);
        assert!(backend.delete_password("svc", "ghost").is_ok());
    }

    #[test]
    fn test_faulty_unavailable() {
        let backend = FaultyBackend::new(Fault::Unavailable);
        match backend.get_password("svc", "alice") {
            Err(CredentialError::StorageError(_)) => {}
            other => panic!("Expected storage error, got {:?}", other),
        }
    }

    #[test]
    fn test_faulty_ascii_only() {
        let backend = FaultyBackend::new(Fault::AsciiOnlyPasswords);
        backend.set_password("svc", "alice", "pwключ").unwrap();
        assert_eq!(backend.get_password("svc", "alice").unwrap(), Some("pw".to_string()));
    }
}
