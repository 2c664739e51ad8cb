//! SQLite-based credential backend

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::traits::{Credential, CredentialBackend, CredentialError};

fn db_error(e: rusqlite::Error) -> CredentialError {
    CredentialError::StorageError(e.to_string())
}

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Create the credentials table in an existing database connection
    pub fn init_table(conn: &Connection) -> Result<(), CredentialError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                service TEXT NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (service, username)
            );"
        ).map_err(db_error)
    }

    /// Open or create a credentials database
    pub fn open(path: &Path) -> Result<Self, CredentialError> {
        let conn = Connection::open(path)
            .map_err(|e| CredentialError::Init(e.to_string()))?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .map_err(|e| CredentialError::Init(e.to_string()))?;
        Self::init_table(&conn)?;
        tracing::debug!(path = %path.display(), "Opened SQLite credential store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, CredentialError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CredentialError::Init(e.to_string()))?;
        Self::init_table(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Wrap an existing connection (credentials table must already be initialized)
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CredentialError> {
        self.conn
            .lock()
            .map_err(|_| CredentialError::StorageError("sqlite connection poisoned".to_string()))
    }
}

impl CredentialBackend for SqliteBackend {
    fn name(&self) -> String {
        "SQLite backend".to_string()
    }

    fn set_password(&self, service: &str, username: &str, password: &str) -> Result<(), CredentialError> {
        tracing::debug!(service = %service, username = %username, "Credential set");
        let now = chrono::Utc::now().timestamp();
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO credentials (service, username, password, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![service, username, password, now],
            )
            .map_err(|e| CredentialError::PasswordSet(e.to_string()))?;
        Ok(())
    }

    fn get_password(&self, service: &str, username: &str) -> Result<Option<String>, CredentialError> {
        let conn = self.lock()?;
        let result: Result<Option<String>, CredentialError> = conn
            .query_row(
                "SELECT password FROM credentials WHERE service = ?1 AND username = ?2",
                params![service, username],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error);
        tracing::debug!(
            service = %service,
            username = %username,
            found = result.as_ref().ok().and_then(|v| v.as_ref()).is_some(),
            "Credential get"
        );
        result
    }

    fn delete_password(&self, service: &str, username: &str) -> Result<(), CredentialError> {
        tracing::debug!(service = %service, username = %username, "Credential delete");
        let removed = self
            .lock()?
            .execute(
                "DELETE FROM credentials WHERE service = ?1 AND username = ?2",
                params![service, username],
            )
            .map_err(db_error)?;
        if removed == 0 {
            return Err(CredentialError::PasswordDelete(format!(
                "no entry for {service:?}/{username:?}"
            )));
        }
        Ok(())
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

        // Resolve only when exactly one username is stored for the service
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT username, password FROM credentials WHERE service = ?1 LIMIT 2")
            .map_err(db_error)?;
        let candidates = stmt
            .query_map(params![service], |row| {
                Ok(Credential::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;

        let mut candidates = candidates.into_iter();
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Ok(Some(only)),
            _ => Ok(None),
        }
    }
}
