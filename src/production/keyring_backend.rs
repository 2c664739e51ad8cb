//! Platform secret store via the `keyring` crate.
//!
//! Each `(service, username)` pair maps to one native entry. Native stores
//! are enabled for the macOS Keychain and the Windows Credential Manager.
//! Elsewhere `keyring` only has its in-process mock, which forgets every
//! write, so `KeyringBackend::new` refuses to build there. The native stores
//! cannot list entries, so a service-only credential lookup always declines.

use keyring::credential::CredentialPersistence;
use keyring::Entry;

use crate::traits::{CredentialBackend, CredentialError};

#[derive(Debug)]
pub struct KeyringBackend(());

impl KeyringBackend {
    /// Connect to the platform store, failing when it does not persist entries
    pub fn new() -> Result<Self, CredentialError> {
        require_persistent(keyring::default::default_credential_builder().persistence())?;
        Ok(Self(()))
    }

    fn entry(&self, service: &str, username: &str) -> Result<Entry, CredentialError> {
        Entry::new(service, username).map_err(|e| map_error(e, ErrorContext::Access))
    }
}

fn require_persistent(persistence: CredentialPersistence) -> Result<(), CredentialError> {
    match persistence {
        CredentialPersistence::UntilDelete => Ok(()),
        _ => Err(CredentialError::Init(
            "no persistent platform keyring on this target".to_string(),
        )),
    }
}

#[derive(Clone, Copy)]
enum ErrorContext {
    Access,
    Set,
    Delete,
}

fn map_error(err: keyring::Error, context: ErrorContext) -> CredentialError {
    match err {
        keyring::Error::NoStorageAccess(_) => CredentialError::AccessDenied,
        keyring::Error::NoEntry if matches!(context, ErrorContext::Delete) => {
            CredentialError::PasswordDelete("no matching keyring entry".to_string())
        }
        e if matches!(context, ErrorContext::Set) => CredentialError::PasswordSet(e.to_string()),
        e => CredentialError::StorageError(e.to_string()),
    }
}

impl CredentialBackend for KeyringBackend {
    fn name(&self) -> String {
        "Platform keyring".to_string()
    }

    fn set_password(&self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        self.entry(service, username)?
            .set_password(password)
            .map_err(|e| map_error(e, ErrorContext::Set))?;
        tracing::debug!(service = %service, username = %username, "Stored keyring entry");
        Ok(())
    }

    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(service, username)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => {
                tracing::debug!(service = %service, username = %username, "No keyring entry");
                Ok(None)
            }
            Err(e) => Err(map_error(e, ErrorContext::Access)),
        }
    }

    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError> {
        self.entry(service, username)?
            .delete_credential()
            .map_err(|e| map_error(e, ErrorContext::Delete))?;
        tracing::debug!(service = %service, username = %username, "Deleted keyring entry");
        Ok(())
    }
}
