//! JSON-file credential backend
//!
//! Stores every entry in a single plain JSON document shaped as
//! `{ service: { username: password } }`. The file is rewritten atomically on
//! each change.
//!
//! WARNING: Not encrypted. Intended for development machines and CI.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::traits::{CredentialBackend, CredentialError};

type Vault = BTreeMap<String, BTreeMap<String, String>>;

pub struct FileBackend {
    path: PathBuf,
    cache: Mutex<Vault>,
}

impl FileBackend {
    /// Open the vault at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let cache = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| CredentialError::Init(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&content)
                .map_err(|e| CredentialError::Init(format!("parse {}: {e}", path.display())))?
        } else {
            Vault::new()
        };
        tracing::debug!(path = %path.display(), services = cache.len(), "Opened file credential vault");
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vault>, CredentialError> {
        self.cache
            .lock()
            .map_err(|_| CredentialError::StorageError("file vault cache poisoned".to_string()))
    }

    fn flush(&self, vault: &Vault) -> Result<(), CredentialError> {
        let content = serde_json::to_string_pretty(vault)
            .map_err(|e| CredentialError::StorageError(e.to_string()))?;
        write_atomic(&self.path, content.as_bytes())
    }
}

impl CredentialBackend for FileBackend {
    fn name(&self) -> String {
        "JSON file backend".to_string()
    }

    fn set_password(&self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        let mut vault = self.lock()?;
        let mut updated = vault.clone();
        updated
            .entry(service.to_string())
            .or_default()
            .insert(username.to_string(), password.to_string());
        self.flush(&updated)
            .map_err(|e| CredentialError::PasswordSet(e.to_string()))?;
        *vault = updated;
        tracing::debug!(service = %service, username = %username, "Stored file credential");
        Ok(())
    }

    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError> {
        Ok(self
            .lock()?
            .get(service)
            .and_then(|users| users.get(username))
            .cloned())
    }

    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError> {
        let mut vault = self.lock()?;
        let mut updated = vault.clone();
        let Some(users) = updated.get_mut(service) else {
            return Err(CredentialError::PasswordDelete(format!("no entries for service {service:?}")));
        };
        if users.remove(username).is_none() {
            return Err(CredentialError::PasswordDelete(format!(
                "no entry for {service:?}/{username:?}"
            )));
        }
        if users.is_empty() {
            updated.remove(service);
        }
        self.flush(&updated)?;
        *vault = updated;
        tracing::debug!(service = %service, username = %username, "Deleted file credential");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CredentialError> {
    let tmp = path.with_extension("tmp");
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&tmp)
        .map_err(|e| CredentialError::StorageError(format!("create tmp error: {e}")))?;
    #[cfg(unix)]
    {
        // mode() only applies when the file is created; a stale tmp keeps its bits
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|e| CredentialError::StorageError(format!("chmod tmp error: {e}")))?;
    }
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| CredentialError::StorageError(format!("write tmp error: {e}")))?;
    drop(file);
    std::fs::rename(&tmp, path)
        .map_err(|e| CredentialError::StorageError(format!("rename tmp error: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let backend = FileBackend::open(&path).unwrap();
        backend.set_password("svc", "alice", "pw1").unwrap();
        backend.set_password("svc", "bob", "").unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.get_password("svc", "alice").unwrap(), Some("pw1".to_string()));
        assert_eq!(reopened.get_password("svc", "bob").unwrap(), Some(String::new()));
        assert_eq!(reopened.get_password("svc", "carol").unwrap(), None);
    }

    #[test]
    fn test_delete_prunes_empty_service() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let backend = FileBackend::open(&path).unwrap();

        backend.set_password("svc", "alice", "pw1").unwrap();
        backend.delete_password("svc", "alice").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let vault: Vault = serde_json::from_str(&content).unwrap();
        assert!(vault.is_empty());
        assert!(backend.delete_password("svc", "alice").unwrap_err().is_delete_error());
    }

    #[test]
    fn test_corrupt_file_is_init_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        match FileBackend::open(&path) {
            Err(CredentialError::Init(_)) => {}
            Err(e) => panic!("Expected init error, got {e}"),
            Ok(_) => panic!("Expected init error"),
        }
    }

    #[test]
    fn test_control_characters_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let backend = FileBackend::open(&path).unwrap();

        backend.set_password("\t\n", "\u{b}\u{c}", "\"\\\r").unwrap();
        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(
            reopened.get_password("\t\n", "\u{b}\u{c}").unwrap(),
            Some("\"\\\r".to_string())
        );
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("missing").join("credentials.json")).unwrap();

        let err = backend.set_password("svc", "alice", "pw1").unwrap_err();
        assert!(matches!(err, CredentialError::PasswordSet(_)));
        assert_eq!(backend.get_password("svc", "alice").unwrap(), None);
    }

    #[test]
    fn test_failed_delete_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        let vault_dir = dir.path().join("vault");
        std::fs::create_dir(&vault_dir).unwrap();
        let backend = FileBackend::open(vault_dir.join("credentials.json")).unwrap();
        backend.set_password("svc", "alice", "pw1").unwrap();

        // With the directory gone the rewrite cannot land
        std::fs::remove_dir_all(&vault_dir).unwrap();
        let err = backend.delete_password("svc", "alice").unwrap_err();
        assert!(!err.is_delete_error());
        assert_eq!(backend.get_password("svc", "alice").unwrap(), Some("pw1".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_vault_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        // A leftover tmp file with loose bits must not leak them into the vault
        std::fs::write(path.with_extension("tmp"), "").unwrap();
        std::fs::set_permissions(path.with_extension("tmp"), std::fs::Permissions::from_mode(0o644)).unwrap();

        let backend = FileBackend::open(&path).unwrap();
        backend.set_password("svc", "alice", "pw1").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
