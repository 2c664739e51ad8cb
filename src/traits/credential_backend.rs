//! Credential backend contract
//!
//! A backend persists `(service, username) -> password` entries. Absence of an
//! entry is a normal outcome (`Ok(None)`), never an error; the only error the
//! contract itself mandates is [`CredentialError::PasswordDelete`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Delete targeted a `(service, username)` pair with no stored entry.
    #[error("Password delete error: {0}")]
    PasswordDelete(String),
    #[error("Password set error: {0}")]
    PasswordSet(String),
    #[error("Credential store is locked")]
    Locked,
    #[error("Access denied")]
    AccessDenied,
    #[error("Backend initialization failed: {0}")]
    Init(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl CredentialError {
    pub fn is_delete_error(&self) -> bool {
        matches!(self, Self::PasswordDelete(_))
    }
}

/// A resolved `(username, password)` pair returned by a service lookup
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Trait for `(service, username) -> password` storage
///
/// Production: platform keyring, JSON file, SQLite
/// Testing: in-memory map
pub trait CredentialBackend: Send + Sync {
    /// Human-readable label; must be printable ASCII
    fn name(&self) -> String;

    /// Store or overwrite the password for a pair
    fn set_password(&self, service: &str, username: &str, password: &str)
        -> Result<(), CredentialError>;

    /// Retrieve the password for a pair, `None` if no entry exists
    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError>;

    /// Remove the entry for a pair. Fails with `PasswordDelete` when absent.
    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError>;

    /// Resolve a credential for a service.
    ///
    /// With a username this is a lookup restricted to that user. Without one,
    /// a backend may pick a single stored pair or decline with `None`; this
    /// default always declines.
    fn get_credential(
        &self,
        service: &str,
        username: Option<&str>,
    ) -> Result<Option<Credential>, CredentialError> {
        let Some(username) = username else {
            return Ok(None);
        };
        Ok(self
            .get_password(service, username)?
            .map(|password| Credential::new(username, password)))
    }
}

impl<B: CredentialBackend + ?Sized> CredentialBackend for Box<B> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn set_password(&self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        (**self).set_password(service, username, password)
    }

    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError> {
        (**self).get_password(service, username)
    }

    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError> {
        (**self).delete_password(service, username)
    }

    fn get_credential(
        &self,
        service: &str,
        username: Option<&str>,
    ) -> Result<Option<Credential>, CredentialError> {
        (**self).get_credential(service, username)
    }
}

impl<B: CredentialBackend + ?Sized> CredentialBackend for Arc<B> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn set_password(&self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        (**self).set_password(service, username, password)
    }

    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError> {
        (**self).get_password(service, username)
    }

    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError> {
        (**self).delete_password(service, username)
    }

    fn get_credential(
        &self,
        service: &str,
        username: Option<&str>,
    ) -> Result<Option<Credential>, CredentialError> {
        (**self).get_credential(service, username)
    }
}

/// True when every char is in the printable ASCII range (32..=126)
pub fn is_ascii_printable(s: &str) -> bool {
    s.chars().all(|c| (' '..='~').contains(&c))
}
